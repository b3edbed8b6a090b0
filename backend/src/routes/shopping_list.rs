use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{CreateShoppingListItem, ShoppingListItem, UpdateShoppingListItem};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::{data, DataResponse};
use crate::services::shopping::ShoppingListService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(list_items).post(create_item).delete(clear_completed),
        )
        .route(
            "/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[derive(Debug, Deserialize)]
pub struct ShoppingListQuery {
    completed: Option<bool>,
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ShoppingListQuery>,
) -> AppResult<Json<DataResponse<Vec<ShoppingListItem>>>> {
    let items = ShoppingListService::list(&state, &user.id, query.completed).await?;
    Ok(data(items))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ShoppingListItem>>> {
    Ok(data(ShoppingListService::get(&state, &user.id, &id).await?))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateShoppingListItem>,
) -> AppResult<(StatusCode, Json<DataResponse<ShoppingListItem>>)> {
    let item = ShoppingListService::create(&state, &user.id, body).await?;
    Ok((StatusCode::CREATED, data(item)))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateShoppingListItem>,
) -> AppResult<Json<DataResponse<ShoppingListItem>>> {
    Ok(data(
        ShoppingListService::update(&state, &user.id, &id, body).await?,
    ))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    ShoppingListService::delete(&state, &user.id, &id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn clear_completed(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let removed = ShoppingListService::clear_completed(&state, &user.id).await?;
    Ok(Json(json!({ "success": true, "deleted": removed })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::*;
    use crate::services::testing::*;

    #[tokio::test]
    async fn completed_filter_and_clear() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;
        let auth = bearer(&state, &user);

        for (name, completed) in [("Eggs", true), ("Basil", false)] {
            let (status, _) = send(
                &state,
                "POST",
                "/api/shopping-list",
                Some(&auth),
                Some(json!({ "name": name, "completed": completed })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = send(
            &state,
            "GET",
            "/api/shopping-list?completed=false",
            Some(&auth),
            None,
        )
        .await;
        let open = body["data"].as_array().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0]["name"], "Basil");

        let (status, body) = send(&state, "DELETE", "/api/shopping-list", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 1);

        let (_, body) = send(&state, "GET", "/api/shopping-list", Some(&auth), None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }
}
