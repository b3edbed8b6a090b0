use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::recipe::{map_recipe_row, RECIPE_COLUMNS};
use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// User Recipe Data Repository
// ============================================================================

pub struct UserRecipeDataRepository;

impl UserRecipeDataRepository {
    pub async fn find(
        pool: &SqlitePool,
        user_id: &str,
        recipe_id: &str,
    ) -> AppResult<Option<UserRecipeData>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, recipe_id, is_favorite, cook_count, last_cooked_at,
                   rating, created_at, updated_at
            FROM user_recipe_data
            WHERE user_id = ? AND recipe_id = ?
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_row))
    }

    /// Create the row on first use; afterwards only the given fields change.
    pub async fn upsert(
        pool: &SqlitePool,
        user_id: &str,
        recipe_id: &str,
        update: UpdateUserRecipeData,
    ) -> AppResult<UserRecipeData> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO user_recipe_data (
                id, user_id, recipe_id, is_favorite, cook_count, last_cooked_at,
                rating, created_at, updated_at
            )
            VALUES (?, ?, ?, COALESCE(?, 0), COALESCE(?, 0), ?, ?, ?, ?)
            ON CONFLICT(user_id, recipe_id) DO UPDATE SET
                is_favorite = COALESCE(?, is_favorite),
                cook_count = COALESCE(?, cook_count),
                last_cooked_at = COALESCE(?, last_cooked_at),
                rating = COALESCE(?, rating),
                updated_at = ?
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(recipe_id)
        .bind(update.is_favorite)
        .bind(update.cook_count)
        .bind(update.last_cooked_at)
        .bind(update.rating)
        .bind(now)
        .bind(now)
        .bind(update.is_favorite)
        .bind(update.cook_count)
        .bind(update.last_cooked_at)
        .bind(update.rating)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Self::find(pool, user_id, recipe_id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "user recipe data for {} vanished after upsert",
                recipe_id
            ))
        })
    }

    /// Clear the favorite flag, keeping cook history. Returns whether a row
    /// existed.
    pub async fn clear_favorite(
        pool: &SqlitePool,
        user_id: &str,
        recipe_id: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_recipe_data
            SET is_favorite = 0, updated_at = ?
            WHERE user_id = ? AND recipe_id = ?
            "#,
        )
        .bind(Utc::now().naive_utc())
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Favorite recipes, most recently saved first.
    pub async fn favorites(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Recipe>> {
        let columns = RECIPE_COLUMNS
            .split(',')
            .map(str::trim)
            .map(|c| format!("r.{0} AS {0}", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT {}
            FROM user_recipe_data d
            JOIN recipes r ON r.id = d.recipe_id AND r.user_id = d.user_id
            WHERE d.user_id = ? AND d.is_favorite = 1
            ORDER BY d.updated_at DESC
            "#,
            columns
        );

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows.iter().map(|r| map_recipe_row(r, "")).collect())
    }

    pub async fn delete_for_recipe(
        pool: &SqlitePool,
        user_id: &str,
        recipe_id: &str,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM user_recipe_data WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}

fn map_row(r: &SqliteRow) -> UserRecipeData {
    UserRecipeData {
        id: r.get("id"),
        user_id: r.get("user_id"),
        recipe_id: r.get("recipe_id"),
        is_favorite: r.get("is_favorite"),
        cook_count: r.get("cook_count"),
        last_cooked_at: r.get("last_cooked_at"),
        rating: r.get("rating"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}
