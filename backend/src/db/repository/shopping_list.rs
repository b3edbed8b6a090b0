use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

const SHOPPING_COLUMNS: &str = r#"
    id, user_id, name, quantity, unit, category, completed,
    recipe_ids, recipe_names, created_at, updated_at
"#;

// ============================================================================
// Shopping List Repository
// ============================================================================

pub struct ShoppingListRepository;

impl ShoppingListRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        create: CreateShoppingListItem,
    ) -> AppResult<ShoppingListItem> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let recipe_ids =
            serde_json::to_string(&create.recipe_ids).map_err(|e| AppError::Internal(e.into()))?;
        let recipe_names = serde_json::to_string(&create.recipe_names)
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO shopping_list_items (
                id, user_id, name, quantity, unit, category, completed,
                recipe_ids, recipe_names, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&create.name)
        .bind(create.quantity)
        .bind(&create.unit)
        .bind(&create.category)
        .bind(create.completed)
        .bind(recipe_ids)
        .bind(recipe_names)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(ShoppingListItem {
            id,
            user_id: user_id.to_string(),
            name: create.name,
            quantity: create.quantity,
            unit: create.unit,
            category: create.category,
            completed: create.completed,
            recipe_ids: create.recipe_ids,
            recipe_names: create.recipe_names,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<ShoppingListItem>> {
        let sql = format!(
            "SELECT {} FROM shopping_list_items WHERE id = ? AND user_id = ?",
            SHOPPING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_shopping_row))
    }

    /// Open items first, then newest first.
    pub async fn list(
        pool: &SqlitePool,
        user_id: &str,
        completed: Option<bool>,
    ) -> AppResult<Vec<ShoppingListItem>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(SHOPPING_COLUMNS);
        qb.push(" FROM shopping_list_items WHERE user_id = ");
        qb.push_bind(user_id);

        if let Some(completed) = completed {
            qb.push(" AND completed = ");
            qb.push_bind(completed);
        }

        qb.push(" ORDER BY completed ASC, created_at DESC");

        let rows = qb
            .build()
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows.iter().map(map_shopping_row).collect())
    }

    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        update: UpdateShoppingListItem,
    ) -> AppResult<Option<ShoppingListItem>> {
        let Some(current) = Self::find_by_id(pool, user_id, id).await? else {
            return Ok(None);
        };
        let now = Utc::now().naive_utc();

        let merged = ShoppingListItem {
            name: update.name.unwrap_or(current.name),
            quantity: update.quantity.or(current.quantity),
            unit: update.unit.or(current.unit),
            category: update.category.or(current.category),
            completed: update.completed.unwrap_or(current.completed),
            recipe_ids: update.recipe_ids.unwrap_or(current.recipe_ids),
            recipe_names: update.recipe_names.unwrap_or(current.recipe_names),
            updated_at: now,
            ..current
        };
        let recipe_ids =
            serde_json::to_string(&merged.recipe_ids).map_err(|e| AppError::Internal(e.into()))?;
        let recipe_names = serde_json::to_string(&merged.recipe_names)
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            UPDATE shopping_list_items
            SET name = ?, quantity = ?, unit = ?, category = ?, completed = ?,
                recipe_ids = ?, recipe_names = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&merged.name)
        .bind(merged.quantity)
        .bind(&merged.unit)
        .bind(&merged.category)
        .bind(merged.completed)
        .bind(recipe_ids)
        .bind(recipe_names)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Some(merged))
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM shopping_list_items WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_completed(pool: &SqlitePool, user_id: &str) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM shopping_list_items WHERE user_id = ? AND completed = 1")
                .bind(user_id)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}

fn map_shopping_row(r: &SqliteRow) -> ShoppingListItem {
    let recipe_ids: String = r.get("recipe_ids");
    let recipe_names: String = r.get("recipe_names");

    ShoppingListItem {
        id: r.get("id"),
        user_id: r.get("user_id"),
        name: r.get("name"),
        quantity: r.get("quantity"),
        unit: r.get("unit"),
        category: r.get("category"),
        completed: r.get("completed"),
        recipe_ids: serde_json::from_str(&recipe_ids).unwrap_or_default(),
        recipe_names: serde_json::from_str(&recipe_names).unwrap_or_default(),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}
