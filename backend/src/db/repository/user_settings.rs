use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// Calendar credential columns are intentionally not selected here; see
// `CalendarTokenRepository`.
const SETTINGS_COLUMNS: &str = r#"
    id, user_id, meal_times, sync_with_calendar, recipe_preferences,
    pantrypal_calendar_id,
    (google_refresh_token IS NOT NULL) AS calendar_connected,
    created_at, updated_at
"#;

// ============================================================================
// User Settings Repository
// ============================================================================

pub struct UserSettingsRepository;

impl UserSettingsRepository {
    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: &str,
    ) -> AppResult<Option<UserSettings>> {
        let sql = format!("SELECT {} FROM user_settings WHERE user_id = ?", SETTINGS_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_settings_row))
    }

    /// Insert a default settings row if the user has none yet.
    ///
    /// Safe to call concurrently: a row created by a racing request is kept.
    pub async fn ensure_exists(pool: &SqlitePool, user_id: &str) -> AppResult<()> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let meal_times = serde_json::to_string(&MealTimes::default())
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO user_settings (id, user_id, meal_times, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(meal_times)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn get_or_create(pool: &SqlitePool, user_id: &str) -> AppResult<UserSettings> {
        if let Some(settings) = Self::find_by_user_id(pool, user_id).await? {
            return Ok(settings);
        }

        tracing::debug!("Creating default settings for user {}", user_id);
        Self::ensure_exists(pool, user_id).await?;

        Self::find_by_user_id(pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User settings not found".to_string()))
    }

    /// Apply a partial update; fields left as `None` keep their stored value.
    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        update: UpdateUserSettings,
    ) -> AppResult<UserSettings> {
        let current = Self::get_or_create(pool, user_id).await?;
        let now = Utc::now().naive_utc();

        let meal_times = update.meal_times.unwrap_or(current.meal_times);
        let meal_times_json =
            serde_json::to_string(&meal_times).map_err(|e| AppError::Internal(e.into()))?;
        let sync_with_calendar = update
            .sync_with_calendar
            .unwrap_or(current.sync_with_calendar);
        let recipe_preferences = update
            .recipe_preferences
            .unwrap_or(current.recipe_preferences);

        sqlx::query(
            r#"
            UPDATE user_settings
            SET meal_times = ?, sync_with_calendar = ?, recipe_preferences = ?, updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(meal_times_json)
        .bind(sync_with_calendar)
        .bind(recipe_preferences.to_string())
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Self::get_or_create(pool, user_id).await
    }

    /// Remember the id of the app-owned calendar for this user.
    pub async fn set_calendar_id(
        pool: &SqlitePool,
        user_id: &str,
        calendar_id: &str,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            UPDATE user_settings
            SET pantrypal_calendar_id = ?, updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(calendar_id)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}

fn map_settings_row(r: &SqliteRow) -> UserSettings {
    let user_id: String = r.get("user_id");

    let raw_meal_times: String = r.get("meal_times");
    let meal_times = serde_json::from_str::<MealTimes>(&raw_meal_times).unwrap_or_else(|e| {
        tracing::warn!(
            "Invalid meal_times stored for user {}: {}; using defaults",
            user_id,
            e
        );
        MealTimes::default()
    });

    let raw_preferences: String = r.get("recipe_preferences");
    let recipe_preferences = serde_json::from_str(&raw_preferences)
        .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));

    UserSettings {
        id: r.get("id"),
        user_id,
        meal_times,
        sync_with_calendar: r.get("sync_with_calendar"),
        recipe_preferences,
        pantrypal_calendar_id: r.get("pantrypal_calendar_id"),
        calendar_connected: r.get("calendar_connected"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}
