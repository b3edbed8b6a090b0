use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;

    use crate::routes::test_support::send;
    use crate::services::testing::*;

    #[tokio::test]
    async fn health_needs_no_auth() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let (status, body) = send(&state, "GET", "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
