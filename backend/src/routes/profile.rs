use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::db::models::{UpdateProfile, UserProfile};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::{data, DataResponse};
use crate::services::profile::ProfileService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_profile).put(update_profile))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    Ok(data(ProfileService::get_profile(&state, &user.id).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<UpdateProfile>,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    Ok(data(ProfileService::update_profile(&state, &user.id, body).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::*;
    use crate::services::testing::*;

    #[tokio::test]
    async fn profile_reads_and_updates_in_camel_case() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;
        let auth = bearer(&state, &user);

        let (status, body) = send(&state, "GET", "/api/user/profile", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], user.id.as_str());
        assert_eq!(body["data"]["email"], "g-1@example.com");
        assert_eq!(body["data"]["fullName"], "Test User");
        assert!(body["data"]["avatarUrl"].is_null());
        assert_eq!(body["data"]["provider"], "google");

        let (status, body) = send(
            &state,
            "PUT",
            "/api/user/profile",
            Some(&auth),
            Some(json!({ "fullName": "Chef Test" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["fullName"], "Chef Test");

        let (status, body) =
            send(&state, "PUT", "/api/user/profile", Some(&auth), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "No valid fields to update");
    }

    #[tokio::test]
    async fn profile_requires_a_token() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let (status, _) = send(&state, "GET", "/api/user/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
