use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

const PANTRY_COLUMNS: &str = r#"
    id, user_id, name, quantity, unit, category, location, expiry_date,
    created_at, updated_at
"#;

// ============================================================================
// Pantry Item Repository
// ============================================================================

pub struct PantryItemRepository;

impl PantryItemRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        create: CreatePantryItem,
    ) -> AppResult<PantryItem> {
        let mut conn = pool.acquire().await.map_err(AppError::Database)?;
        Self::insert_one(&mut conn, user_id, create).await
    }

    /// Insert every item in one transaction: all are stored or none are.
    pub async fn create_many(
        pool: &SqlitePool,
        user_id: &str,
        items: Vec<CreatePantryItem>,
    ) -> AppResult<Vec<PantryItem>> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            created.push(Self::insert_one(&mut tx, user_id, item).await?);
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn insert_one(
        conn: &mut SqliteConnection,
        user_id: &str,
        create: CreatePantryItem,
    ) -> AppResult<PantryItem> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO pantry_items (
                id, user_id, name, quantity, unit, category, location, expiry_date,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&create.name)
        .bind(create.quantity)
        .bind(&create.unit)
        .bind(&create.category)
        .bind(create.location.as_str())
        .bind(create.expiry_date)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;

        Ok(PantryItem {
            id,
            user_id: user_id.to_string(),
            name: create.name,
            quantity: create.quantity,
            unit: create.unit,
            category: create.category,
            location: create.location,
            expiry_date: create.expiry_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<PantryItem>> {
        let mut conn = pool.acquire().await.map_err(AppError::Database)?;
        Self::find_one(&mut conn, user_id, id).await
    }

    async fn find_one(
        conn: &mut SqliteConnection,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<PantryItem>> {
        let sql = format!(
            "SELECT {} FROM pantry_items WHERE id = ? AND user_id = ?",
            PANTRY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_pantry_row))
    }

    pub async fn list(
        pool: &SqlitePool,
        user_id: &str,
        filters: &PantryFilters,
    ) -> AppResult<Vec<PantryItem>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(PANTRY_COLUMNS);
        qb.push(" FROM pantry_items WHERE user_id = ");
        qb.push_bind(user_id);

        if let Some(location) = filters.location {
            qb.push(" AND location = ");
            qb.push_bind(location.as_str());
        }
        if let Some(category) = &filters.category {
            qb.push(" AND category = ");
            qb.push_bind(category);
        }
        if let Some(search) = &filters.search {
            qb.push(" AND name LIKE ");
            qb.push_bind(format!("%{}%", search));
        }
        if let Some(before) = filters.expiring_before {
            qb.push(" AND expiry_date IS NOT NULL AND expiry_date <= ");
            qb.push_bind(before);
        }

        qb.push(" ORDER BY name COLLATE NOCASE ASC");

        let rows = qb
            .build()
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows.iter().map(map_pantry_row).collect())
    }

    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        update: UpdatePantryItem,
    ) -> AppResult<Option<PantryItem>> {
        let mut conn = pool.acquire().await.map_err(AppError::Database)?;
        Self::update_one(&mut conn, user_id, id, update).await
    }

    /// Apply every update in one transaction. Returns `Ok(None)` and stores
    /// nothing when any id is not one of the user's items.
    pub async fn update_many(
        pool: &SqlitePool,
        user_id: &str,
        updates: Vec<(String, UpdatePantryItem)>,
    ) -> AppResult<Option<Vec<PantryItem>>> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;
        let mut updated = Vec::with_capacity(updates.len());
        for (id, update) in updates {
            match Self::update_one(&mut tx, user_id, &id, update).await? {
                Some(item) => updated.push(item),
                None => return Ok(None),
            }
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(updated))
    }

    async fn update_one(
        conn: &mut SqliteConnection,
        user_id: &str,
        id: &str,
        update: UpdatePantryItem,
    ) -> AppResult<Option<PantryItem>> {
        let Some(current) = Self::find_one(conn, user_id, id).await? else {
            return Ok(None);
        };
        let now = Utc::now().naive_utc();

        let merged = PantryItem {
            name: update.name.unwrap_or(current.name),
            quantity: update.quantity.unwrap_or(current.quantity),
            unit: update.unit.unwrap_or(current.unit),
            category: update.category.or(current.category),
            location: update.location.unwrap_or(current.location),
            expiry_date: update.expiry_date.or(current.expiry_date),
            updated_at: now,
            ..current
        };

        sqlx::query(
            r#"
            UPDATE pantry_items
            SET name = ?, quantity = ?, unit = ?, category = ?, location = ?,
                expiry_date = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&merged.name)
        .bind(merged.quantity)
        .bind(&merged.unit)
        .bind(&merged.category)
        .bind(merged.location.as_str())
        .bind(merged.expiry_date)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;

        Ok(Some(merged))
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM pantry_items WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the given items; ids belonging to other users are ignored.
    /// Returns the number of rows removed.
    pub async fn delete_many(pool: &SqlitePool, user_id: &str, ids: &[String]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM pantry_items WHERE user_id = ");
        qb.push_bind(user_id);
        qb.push(" AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let result = qb
            .build()
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}

fn map_pantry_row(r: &SqliteRow) -> PantryItem {
    let location: String = r.get("location");

    PantryItem {
        id: r.get("id"),
        user_id: r.get("user_id"),
        name: r.get("name"),
        quantity: r.get("quantity"),
        unit: r.get("unit"),
        category: r.get("category"),
        location: StorageLocation::from_str(&location).unwrap_or_default(),
        expiry_date: r.get("expiry_date"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::init::init_test_db;
    use chrono::NaiveDate;

    fn item(name: &str, location: StorageLocation, expiry: Option<&str>) -> CreatePantryItem {
        CreatePantryItem {
            name: name.to_string(),
            quantity: 1.0,
            unit: "pcs".to_string(),
            category: Some("produce".to_string()),
            location,
            expiry_date: expiry.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
        }
    }

    #[tokio::test]
    async fn filters_by_location_search_and_expiry() {
        let pool = init_test_db().await;
        for create in [
            item("Milk", StorageLocation::Fridge, Some("2024-06-12")),
            item("Frozen peas", StorageLocation::Freezer, Some("2024-09-01")),
            item("Rice", StorageLocation::Pantry, None),
        ] {
            PantryItemRepository::create(&pool, "user-1", create)
                .await
                .unwrap();
        }

        let fridge = PantryItemRepository::list(
            &pool,
            "user-1",
            &PantryFilters {
                location: Some(StorageLocation::Fridge),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(fridge.len(), 1);
        assert_eq!(fridge[0].name, "Milk");

        let peas = PantryItemRepository::list(
            &pool,
            "user-1",
            &PantryFilters {
                search: Some("pea".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(peas.len(), 1);

        let expiring = PantryItemRepository::list(
            &pool,
            "user-1",
            &PantryFilters {
                expiring_before: NaiveDate::from_ymd_opt(2024, 6, 30),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].name, "Milk");
    }

    #[tokio::test]
    async fn delete_many_ignores_foreign_ids() {
        let pool = init_test_db().await;
        let mine = PantryItemRepository::create(&pool, "user-1", item("Eggs", StorageLocation::Fridge, None))
            .await
            .unwrap();
        let theirs = PantryItemRepository::create(&pool, "user-2", item("Eggs", StorageLocation::Fridge, None))
            .await
            .unwrap();

        let removed =
            PantryItemRepository::delete_many(&pool, "user-1", &[mine.id.clone(), theirs.id.clone()])
                .await
                .unwrap();
        assert_eq!(removed, 1);
        assert!(PantryItemRepository::find_by_id(&pool, "user-2", &theirs.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn update_many_is_all_or_nothing() {
        let pool = init_test_db().await;
        let milk = PantryItemRepository::create(&pool, "user-1", item("Milk", StorageLocation::Fridge, None))
            .await
            .unwrap();
        let foreign = PantryItemRepository::create(&pool, "user-2", item("Jam", StorageLocation::Pantry, None))
            .await
            .unwrap();
        let half = UpdatePantryItem {
            quantity: Some(0.5),
            ..Default::default()
        };

        let result = PantryItemRepository::update_many(
            &pool,
            "user-1",
            vec![(milk.id.clone(), half.clone()), (foreign.id.clone(), half.clone())],
        )
        .await
        .unwrap();
        assert!(result.is_none());
        let stored = PantryItemRepository::find_by_id(&pool, "user-1", &milk.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 1.0);

        let updated = PantryItemRepository::update_many(&pool, "user-1", vec![(milk.id.clone(), half)])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].quantity, 0.5);
    }

    #[tokio::test]
    async fn create_many_rolls_back_on_failure() {
        let pool = init_test_db().await;
        sqlx::query(
            r#"
            CREATE TRIGGER reject_poison BEFORE INSERT ON pantry_items
            WHEN NEW.name = 'poison'
            BEGIN
                SELECT RAISE(ABORT, 'rejected');
            END
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = PantryItemRepository::create_many(
            &pool,
            "user-1",
            vec![
                item("Flour", StorageLocation::Pantry, None),
                item("poison", StorageLocation::Pantry, None),
            ],
        )
        .await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(PantryItemRepository::list(&pool, "user-1", &PantryFilters::default())
            .await
            .unwrap()
            .is_empty());

        let created = PantryItemRepository::create_many(
            &pool,
            "user-1",
            vec![
                item("Flour", StorageLocation::Pantry, None),
                item("Sugar", StorageLocation::Pantry, None),
            ],
        )
        .await
        .unwrap();
        assert_eq!(created.len(), 2);
    }
}
