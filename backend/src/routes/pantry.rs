use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{
    CreatePantryItem, PantryBulkUpdate, PantryFilters, PantryItem, StorageLocation,
    UpdatePantryItem,
};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::{data, DataResponse};
use crate::services::pantry::PantryService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(list_items)
                .post(create_item)
                .put(update_items)
                .delete(delete_items),
        )
        .route("/bulk", post(create_items))
        .route(
            "/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[derive(Debug, Deserialize)]
pub struct PantryQuery {
    location: Option<String>,
    category: Option<String>,
    search: Option<String>,
    /// Only items expiring within this many days.
    expiring: Option<i64>,
}

impl PantryQuery {
    fn into_filters(self) -> AppResult<PantryFilters> {
        let mut filters = match self.expiring {
            Some(days) => PantryService::expiring_within(days)?,
            None => PantryFilters::default(),
        };

        filters.location = match self.location.as_deref() {
            None | Some("") => None,
            Some(l) => Some(StorageLocation::from_str(l).ok_or_else(|| {
                AppError::invalid_field("location", "must be one of fridge, freezer, pantry")
            })?),
        };
        filters.category = self.category.filter(|c| !c.is_empty());
        filters.search = self.search.filter(|s| !s.is_empty());

        Ok(filters)
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    items: Vec<CreatePantryItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    items: Vec<PantryBulkUpdate>,
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<PantryQuery>,
) -> AppResult<Json<DataResponse<Vec<PantryItem>>>> {
    let filters = query.into_filters()?;
    Ok(data(PantryService::list(&state, &user.id, filters).await?))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<PantryItem>>> {
    Ok(data(PantryService::get(&state, &user.id, &id).await?))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreatePantryItem>,
) -> AppResult<(StatusCode, Json<DataResponse<PantryItem>>)> {
    let item = PantryService::create(&state, &user.id, body).await?;
    Ok((StatusCode::CREATED, data(item)))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdatePantryItem>,
) -> AppResult<Json<DataResponse<PantryItem>>> {
    Ok(data(PantryService::update(&state, &user.id, &id, body).await?))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    PantryService::delete(&state, &user.id, &id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn create_items(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<BulkCreateRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<PantryItem>>>)> {
    let items = PantryService::create_many(&state, &user.id, body.items).await?;
    Ok((StatusCode::CREATED, data(items)))
}

async fn update_items(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<BulkUpdateRequest>,
) -> AppResult<Json<DataResponse<Vec<PantryItem>>>> {
    Ok(data(PantryService::update_many(&state, &user.id, body.items).await?))
}

async fn delete_items(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<BulkDeleteRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = PantryService::delete_many(&state, &user.id, &body.ids).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
