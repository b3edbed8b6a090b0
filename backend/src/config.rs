use std::env;

use serde::Deserialize;

pub const DEFAULT_CALENDAR_TIME_ZONE: &str = "America/New_York";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub google: GoogleConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client credentials. Sign-in and token refresh are unavailable
    /// when either is missing.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    /// IANA zone used for calendar events and the dedicated calendar.
    pub calendar_time_zone: String,
}

impl GoogleConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for the public auth endpoints
    pub auth_per_second: u32,
    /// Burst size for auth endpoints
    pub auth_burst: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/pantry_pal.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            google: GoogleConfig {
                client_id: env::var("GOOGLE_CLIENT_ID").ok(),
                client_secret: env::var("GOOGLE_CLIENT_SECRET").ok(),
                redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|_| "http://localhost:3000/auth/callback".to_string()),
                calendar_time_zone: env::var("CALENDAR_TIME_ZONE")
                    .unwrap_or_else(|_| DEFAULT_CALENDAR_TIME_ZONE.to_string()),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("JWT_SECRET".to_string()))?,
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .unwrap_or(24),
            },
            rate_limit: RateLimitConfig {
                auth_per_second: env::var("RATE_LIMIT_AUTH_PER_SECOND")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
                auth_burst: env::var("RATE_LIMIT_AUTH_BURST")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/pantry_pal.db".to_string(),
                max_connections: 5,
            },
            google: GoogleConfig {
                client_id: None,
                client_secret: None,
                redirect_uri: "http://localhost:3000/auth/callback".to_string(),
                calendar_time_zone: DEFAULT_CALENDAR_TIME_ZONE.to_string(),
            },
            jwt: JwtConfig {
                secret: String::new(),
                expiration_hours: 24,
            },
            rate_limit: RateLimitConfig {
                auth_per_second: 3,
                auth_burst: 10,
            },
        }
    }
}
