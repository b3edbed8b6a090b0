use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// User Repository
// ============================================================================

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, google_id, email, name, picture_url, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_user_row))
    }

    pub async fn find_by_google_id(pool: &SqlitePool, google_id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, google_id, email, name, picture_url, created_at, updated_at
            FROM users
            WHERE google_id = ?
            "#,
        )
        .bind(google_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.as_ref().map(map_user_row))
    }

    /// Create the user on first sign-in. Later sign-ins only refresh the
    /// email; name and picture belong to the user once the account exists.
    pub async fn upsert_by_google_id(
        pool: &SqlitePool,
        google_id: &str,
        email: &str,
        name: &str,
        picture_url: Option<&str>,
    ) -> AppResult<User> {
        let now = Utc::now().naive_utc();

        if let Some(user) = Self::find_by_google_id(pool, google_id).await? {
            sqlx::query("UPDATE users SET email = ?, updated_at = ? WHERE id = ?")
                .bind(email)
                .bind(now)
                .bind(&user.id)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;

            return Ok(User {
                email: email.to_string(),
                updated_at: now,
                ..user
            });
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO users (id, google_id, email, name, picture_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(google_id)
        .bind(email)
        .bind(name)
        .bind(picture_url)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Created user {} for Google account {}", id, google_id);

        Ok(User {
            id,
            google_id: google_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            picture_url: picture_url.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial profile update; returns `None` for an unknown user.
    pub async fn update_profile(
        pool: &SqlitePool,
        id: &str,
        update: UpdateProfile,
    ) -> AppResult<Option<User>> {
        let Some(current) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let now = Utc::now().naive_utc();

        let merged = User {
            name: update.full_name.unwrap_or(current.name),
            picture_url: update.avatar_url.or(current.picture_url),
            updated_at: now,
            ..current
        };

        sqlx::query("UPDATE users SET name = ?, picture_url = ?, updated_at = ? WHERE id = ?")
            .bind(&merged.name)
            .bind(&merged.picture_url)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(Some(merged))
    }
}

fn map_user_row(r: &SqliteRow) -> User {
    User {
        id: r.get("id"),
        google_id: r.get("google_id"),
        email: r.get("email"),
        name: r.get("name"),
        picture_url: r.get("picture_url"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}
