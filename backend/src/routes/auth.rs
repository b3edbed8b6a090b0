use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::services::auth::{AuthService, AuthSession};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/google/url", get(google_url))
        .route("/google/callback", get(google_callback))
        .route("/me", get(me))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn google_url(State(state): State<Arc<AppState>>) -> AppResult<Json<AuthUrlResponse>> {
    let url = AuthService::google_auth_url(&state)?;
    Ok(Json(AuthUrlResponse { url }))
}

async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Json<AuthSession>> {
    if let Some(error) = query.error {
        tracing::warn!("Google OAuth returned error: {}", error);
        return Err(AppError::BadRequest(format!("Google sign-in failed: {}", error)));
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;
    let oauth_state = query
        .state
        .ok_or_else(|| AppError::BadRequest("Missing OAuth state".to_string()))?;

    let session = AuthService::handle_google_callback(&state, &code, &oauth_state).await?;
    Ok(Json(session))
}

async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

// ============================================================================
// Auth Extractor
// ============================================================================

/// Extractor for the user behind a `Bearer` service token.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized
            })?;

        if auth_header.len() < 7 || !auth_header[..7].eq_ignore_ascii_case("bearer ") {
            tracing::debug!("Authorization header doesn't start with 'Bearer '");
            return Err(AppError::Unauthorized);
        }

        let token = auth_header[7..].trim();
        if token.is_empty() {
            tracing::debug!("Empty bearer token in Authorization header");
            return Err(AppError::Unauthorized);
        }

        let user = AuthService::get_user_from_token(state, token)
            .await
            .map_err(|e| {
                tracing::debug!("Failed to get user from token: {:?}", e);
                match e {
                    AppError::Jwt(_) => AppError::Unauthorized,
                    other => other,
                }
            })?;

        tracing::debug!("Authenticated user: {}", user.id);
        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;

    use crate::routes::test_support::*;
    use crate::services::auth::AuthService;
    use crate::services::testing::*;

    #[tokio::test]
    async fn protected_routes_reject_missing_or_bad_tokens() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;

        for auth in [None, Some("Token abc"), Some("Bearer "), Some("Bearer not-a-jwt")] {
            let (status, body) = send(&state, "GET", "/api/meal-plans", auth, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "auth header {:?}", auth);
            assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn me_returns_the_token_owner() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;

        let (status, body) =
            send(&state, "GET", "/api/auth/me", Some(&bearer(&state, &user)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], user.id.as_str());
    }

    #[tokio::test]
    async fn callback_signs_in_and_issues_a_usable_token() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let oauth_state = AuthService::generate_oauth_state(&state).unwrap();

        let uri = format!("/api/auth/google/callback?code=abc&state={}", oauth_state);
        let (status, body) = send(&state, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");

        let token = format!("Bearer {}", body["access_token"].as_str().unwrap());
        let (status, me) = send(&state, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "cook@example.com");
    }

    #[tokio::test]
    async fn callback_without_code_is_bad_request() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let (status, _) = send(&state, "GET", "/api/auth/google/callback?state=x", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
