use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::calendar::CalendarError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Google API error: {0}")]
    GoogleApi(String),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("Validation error: {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("External service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details = None;

        let (status, code, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InvalidField { field, message } => {
                details = Some(serde_json::json!({ "field": field }));
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "VALIDATION_ERROR",
                    format!("{}: {}", field, message),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Jwt(e) => {
                tracing::warn!("JWT error: {:?}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "Invalid or expired token".to_string(),
                )
            }
            AppError::GoogleApi(msg) => {
                tracing::error!("Google API error: {}", msg);
                (StatusCode::BAD_GATEWAY, "GOOGLE_API_ERROR", msg.clone())
            }
            AppError::Calendar(e) => match e {
                CalendarError::NotConnected => {
                    (StatusCode::CONFLICT, "CALENDAR_NOT_CONNECTED", e.to_string())
                }
                CalendarError::RefreshFailed(_) => {
                    tracing::error!("Calendar token refresh failed: {}", e);
                    (StatusCode::BAD_GATEWAY, "CALENDAR_REFRESH_FAILED", e.to_string())
                }
                CalendarError::WriteFailed(_) => {
                    tracing::error!("Calendar write failed: {}", e);
                    (StatusCode::BAD_GATEWAY, "CALENDAR_WRITE_FAILED", e.to_string())
                }
                CalendarError::Store(inner) => {
                    tracing::error!("Calendar store error: {:?}", inner);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        "A database error occurred".to_string(),
                    )
                }
            },
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
