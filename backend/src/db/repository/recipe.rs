use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

pub(crate) const RECIPE_COLUMNS: &str = r#"
    id, user_id, title, description, cooking_time, servings, difficulty,
    ingredients, instructions, genre, image_url, child_friendly,
    created_at, updated_at
"#;

// ============================================================================
// Recipe Repository
// ============================================================================

pub struct RecipeRepository;

impl RecipeRepository {
    pub async fn create(pool: &SqlitePool, user_id: &str, create: CreateRecipe) -> AppResult<Recipe> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO recipes (
                id, user_id, title, description, cooking_time, servings, difficulty,
                ingredients, instructions, genre, image_url, child_friendly,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&create.title)
        .bind(&create.description)
        .bind(create.cooking_time)
        .bind(create.servings)
        .bind(create.difficulty.map(Difficulty::as_str))
        .bind(create.ingredients.to_string())
        .bind(create.instructions.to_string())
        .bind(&create.genre)
        .bind(&create.image_url)
        .bind(create.child_friendly)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Recipe {
            id,
            user_id: user_id.to_string(),
            title: create.title,
            description: create.description,
            cooking_time: create.cooking_time,
            servings: create.servings,
            difficulty: create.difficulty,
            ingredients: create.ingredients,
            instructions: create.instructions,
            genre: create.genre,
            image_url: create.image_url,
            child_friendly: create.child_friendly,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<Recipe>> {
        let sql = format!(
            "SELECT {} FROM recipes WHERE id = ? AND user_id = ?",
            RECIPE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row.as_ref().map(|r| map_recipe_row(r, "")))
    }

    pub async fn list_by_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Recipe>> {
        let sql = format!(
            "SELECT {} FROM recipes WHERE user_id = ? ORDER BY created_at DESC",
            RECIPE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows.iter().map(|r| map_recipe_row(r, "")).collect())
    }

    pub async fn search(
        pool: &SqlitePool,
        user_id: &str,
        filters: &RecipeSearchFilters,
    ) -> AppResult<Vec<Recipe>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        qb.push(RECIPE_COLUMNS);
        qb.push(" FROM recipes WHERE user_id = ");
        qb.push_bind(user_id);

        if !filters.genres.is_empty() {
            qb.push(" AND genre IN (");
            let mut separated = qb.separated(", ");
            for genre in &filters.genres {
                separated.push_bind(genre);
            }
            separated.push_unseparated(")");
        }
        if let Some(max) = filters.max_cooking_time {
            qb.push(" AND cooking_time <= ");
            qb.push_bind(max);
        }
        if let Some(difficulty) = filters.difficulty {
            qb.push(" AND difficulty = ");
            qb.push_bind(difficulty.as_str());
        }
        if let Some(servings) = filters.servings {
            qb.push(" AND servings = ");
            qb.push_bind(servings);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(filters.limit);

        let rows = qb
            .build()
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows.iter().map(|r| map_recipe_row(r, "")).collect())
    }

    /// Apply a partial update; returns `None` when the recipe does not belong
    /// to the user.
    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        update: UpdateRecipe,
    ) -> AppResult<Option<Recipe>> {
        let Some(current) = Self::find_by_id(pool, user_id, id).await? else {
            return Ok(None);
        };
        let now = Utc::now().naive_utc();

        let merged = Recipe {
            title: update.title.unwrap_or(current.title),
            description: update.description.or(current.description),
            cooking_time: update.cooking_time.or(current.cooking_time),
            servings: update.servings.or(current.servings),
            difficulty: update.difficulty.or(current.difficulty),
            ingredients: update.ingredients.unwrap_or(current.ingredients),
            instructions: update.instructions.unwrap_or(current.instructions),
            genre: update.genre.or(current.genre),
            image_url: update.image_url.or(current.image_url),
            child_friendly: update.child_friendly.unwrap_or(current.child_friendly),
            updated_at: now,
            ..current
        };

        sqlx::query(
            r#"
            UPDATE recipes
            SET title = ?, description = ?, cooking_time = ?, servings = ?, difficulty = ?,
                ingredients = ?, instructions = ?, genre = ?, image_url = ?,
                child_friendly = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&merged.title)
        .bind(&merged.description)
        .bind(merged.cooking_time)
        .bind(merged.servings)
        .bind(merged.difficulty.map(Difficulty::as_str))
        .bind(merged.ingredients.to_string())
        .bind(merged.instructions.to_string())
        .bind(&merged.genre)
        .bind(&merged.image_url)
        .bind(merged.child_friendly)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Some(merged))
    }

    /// Returns whether a row was deleted.
    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

/// Map recipe columns, optionally prefixed (used by joins, e.g. `r_title`).
pub(crate) fn map_recipe_row(r: &SqliteRow, prefix: &str) -> Recipe {
    let col = |name: &str| format!("{}{}", prefix, name);

    let difficulty: Option<String> = r.get(col("difficulty").as_str());
    let ingredients: String = r.get(col("ingredients").as_str());
    let instructions: String = r.get(col("instructions").as_str());

    Recipe {
        id: r.get(col("id").as_str()),
        user_id: r.get(col("user_id").as_str()),
        title: r.get(col("title").as_str()),
        description: r.get(col("description").as_str()),
        cooking_time: r.get(col("cooking_time").as_str()),
        servings: r.get(col("servings").as_str()),
        difficulty: difficulty.as_deref().and_then(Difficulty::from_str),
        ingredients: parse_json_array(&ingredients),
        instructions: parse_json_array(&instructions),
        genre: r.get(col("genre").as_str()),
        image_url: r.get(col("image_url").as_str()),
        child_friendly: r.get(col("child_friendly").as_str()),
        created_at: r.get(col("created_at").as_str()),
        updated_at: r.get(col("updated_at").as_str()),
    }
}

fn parse_json_array(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
}
