use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::db::models::{UpdateUserSettings, UserSettings};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::{data, DataResponse};
use crate::services::settings::SettingsService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

async fn get_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<DataResponse<UserSettings>>> {
    let settings = SettingsService::get_settings(&state, &user.id).await?;
    Ok(data(settings))
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<UpdateUserSettings>,
) -> AppResult<Json<DataResponse<UserSettings>>> {
    let settings = SettingsService::update_settings(&state, &user.id, body).await?;
    Ok(data(settings))
}
