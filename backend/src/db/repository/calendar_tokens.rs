use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::db::models::CalendarTokens;
use crate::db::repository::UserSettingsRepository;
use crate::error::{AppError, AppResult};

/// Token Store: the only code that reads or writes the Google credential
/// columns of `user_settings`.
pub struct CalendarTokenRepository;

impl CalendarTokenRepository {
    /// Stored credentials, or `None` when the user has no settings row.
    pub async fn find(pool: &SqlitePool, user_id: &str) -> AppResult<Option<CalendarTokens>> {
        let row = sqlx::query(
            r#"
            SELECT google_access_token, google_refresh_token, google_token_expires_at
            FROM user_settings
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|r| CalendarTokens {
            access_token: r.get("google_access_token"),
            refresh_token: r.get("google_refresh_token"),
            expires_at_millis: r.get("google_token_expires_at"),
        }))
    }

    /// Store credentials obtained from an OAuth consent.
    ///
    /// Google only returns a refresh token on the first consent (or with
    /// `prompt=consent`); when it is absent the previously stored one is kept.
    pub async fn store_connection(
        pool: &SqlitePool,
        user_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at_millis: i64,
    ) -> AppResult<()> {
        UserSettingsRepository::ensure_exists(pool, user_id).await?;
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE user_settings
            SET google_access_token = ?,
                google_refresh_token = COALESCE(?, google_refresh_token),
                google_token_expires_at = ?,
                updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at_millis)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Cache a refreshed access token. The refresh token is replaced only if
    /// the provider rotated it.
    pub async fn update_access_token(
        pool: &SqlitePool,
        user_id: &str,
        access_token: &str,
        expires_at_millis: i64,
        rotated_refresh_token: Option<&str>,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE user_settings
            SET google_access_token = ?,
                google_token_expires_at = ?,
                google_refresh_token = COALESCE(?, google_refresh_token),
                updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(access_token)
        .bind(expires_at_millis)
        .bind(rotated_refresh_token)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Forget all credentials. The calendar id is kept so that reconnecting
    /// reuses the same calendar.
    pub async fn clear(pool: &SqlitePool, user_id: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE user_settings
            SET google_access_token = NULL,
                google_refresh_token = NULL,
                google_token_expires_at = NULL,
                updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}
