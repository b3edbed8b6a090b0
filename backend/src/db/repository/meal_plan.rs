use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::recipe::map_recipe_row;
use crate::db::models::*;
use crate::error::{AppError, AppResult};

const JOINED_SELECT: &str = r#"
    SELECT
        mp.id, mp.user_id, mp.date, mp.meal_type, mp.recipe_id,
        mp.calendar_event_id, mp.sync_with_calendar, mp.created_at, mp.updated_at,
        r.id AS r_id, r.user_id AS r_user_id, r.title AS r_title,
        r.description AS r_description, r.cooking_time AS r_cooking_time,
        r.servings AS r_servings, r.difficulty AS r_difficulty,
        r.ingredients AS r_ingredients, r.instructions AS r_instructions,
        r.genre AS r_genre, r.image_url AS r_image_url,
        r.child_friendly AS r_child_friendly,
        r.created_at AS r_created_at, r.updated_at AS r_updated_at
    FROM meal_plans mp
    LEFT JOIN recipes r ON r.id = mp.recipe_id AND r.user_id = mp.user_id
"#;

// ============================================================================
// Meal Plan Repository
// ============================================================================

pub struct MealPlanRepository;

impl MealPlanRepository {
    /// Insert every row in a single transaction: either all rows are stored
    /// or none are.
    pub async fn insert_batch(
        pool: &SqlitePool,
        user_id: &str,
        plans: Vec<NewMealPlan>,
    ) -> AppResult<Vec<MealPlan>> {
        let now = Utc::now().naive_utc();
        let mut tx = pool.begin().await.map_err(AppError::Database)?;
        let mut inserted = Vec::with_capacity(plans.len());

        for plan in plans {
            let id = Uuid::new_v4().to_string();

            sqlx::query(
                r#"
                INSERT INTO meal_plans (
                    id, user_id, date, meal_type, recipe_id,
                    calendar_event_id, sync_with_calendar, created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(user_id)
            .bind(plan.date)
            .bind(plan.meal_type.as_str())
            .bind(&plan.recipe_id)
            .bind(&plan.calendar_event_id)
            .bind(plan.sync_with_calendar)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

            inserted.push(MealPlan {
                id,
                user_id: user_id.to_string(),
                date: plan.date,
                meal_type: plan.meal_type,
                recipe_id: plan.recipe_id,
                calendar_event_id: plan.calendar_event_id,
                sync_with_calendar: plan.sync_with_calendar,
                created_at: now,
                updated_at: now,
            });
        }

        tx.commit().await.map_err(AppError::Database)?;

        Ok(inserted)
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<MealPlanWithRecipe>> {
        let sql = format!("{} WHERE mp.id = ? AND mp.user_id = ?", JOINED_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        row.as_ref().map(map_joined_row).transpose()
    }

    /// Plans for a user, optionally bounded by an inclusive date range,
    /// ordered by date.
    pub async fn list(
        pool: &SqlitePool,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<MealPlanWithRecipe>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(JOINED_SELECT);
        qb.push(" WHERE mp.user_id = ");
        qb.push_bind(user_id);

        if let Some(start) = start {
            qb.push(" AND mp.date >= ");
            qb.push_bind(start);
        }
        if let Some(end) = end {
            qb.push(" AND mp.date <= ");
            qb.push_bind(end);
        }

        qb.push(" ORDER BY mp.date ASC, mp.created_at ASC");

        let rows = qb
            .build()
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

        rows.iter().map(map_joined_row).collect()
    }

    /// Returns whether a row was deleted.
    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM meal_plans WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_joined_row(r: &SqliteRow) -> AppResult<MealPlanWithRecipe> {
    let raw_meal_type: String = r.get("meal_type");
    let meal_type = MealType::try_from(raw_meal_type.as_str())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let plan = MealPlan {
        id: r.get("id"),
        user_id: r.get("user_id"),
        date: r.get("date"),
        meal_type,
        recipe_id: r.get("recipe_id"),
        calendar_event_id: r.get("calendar_event_id"),
        sync_with_calendar: r.get("sync_with_calendar"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    };

    let recipe_id: Option<String> = r.get("r_id");
    let recipe = recipe_id.map(|_| map_recipe_row(r, "r_"));

    Ok(MealPlanWithRecipe { plan, recipe })
}
