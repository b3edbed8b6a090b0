//! Initialization helpers for the application:
//! - database connection + migrations
//! - the Google API client shared through `AppState`
//!
//! This module centralizes bits that would otherwise live in `main.rs`.

use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::config::Config;
use crate::services::google::{GoogleApi, GoogleClient};

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password) components.
/// Falls back to removing everything before '@' or returning "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else {
        if let Some(at_pos) = db_url.find('@') {
            let without_creds = &db_url[at_pos + 1..];
            return format!("(redacted){}", without_creds);
        }
        "(redacted)".to_string()
    }
}

/// Initialize the SQLite connection pool and run migrations.
///
/// File databases get their parent directory created and are opened with
/// `create_if_missing(true)`; `sqlite::memory:` URLs are used as-is.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    if db_url.contains(":memory:") {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(db_url)
            .await?;
        tracing::info!("Running database migrations (in-memory database)");
        sqlx::migrate!("./migrations").run(&pool).await?;
        return Ok(pool);
    }

    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
            tracing::debug!("Database directory ready: {}", parent.display());
        }
    }

    let existed = db_file_path.exists();

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    if existed {
        tracing::info!("Connected to database file: {}", db_file_path.display());
    } else {
        tracing::info!("Database file created: {}", db_file_path.display());
    }

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Build the Google OAuth / Calendar client.
pub fn init_google(config: &Config) -> Result<Arc<dyn GoogleApi>> {
    if config.google.credentials().is_none() {
        tracing::warn!(
            "GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET not set; Google sign-in and calendar sync are disabled"
        );
    }

    let client = GoogleClient::new(&config.google)?;
    Ok(Arc::new(client))
}

/// Fresh in-memory database with all migrations applied.
#[cfg(test)]
pub async fn init_test_db() -> sqlx::SqlitePool {
    let config = Config {
        database: crate::config::DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        ..Config::default()
    };
    init_db(&config).await.expect("in-memory database")
}
