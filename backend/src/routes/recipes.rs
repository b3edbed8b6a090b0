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
    CreateRecipe, Difficulty, Recipe, RecipeSearchFilters, UpdateRecipe, UpdateUserRecipeData,
    UserRecipeData,
};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::{data, DataResponse};
use crate::services::recipes::{search_limit, RecipeService};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/search", get(search_recipes))
        .route("/favorites", get(list_favorites))
        .route(
            "/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/:id/save", post(save_recipe).delete(unsave_recipe))
        .route("/:id/user-data", get(get_user_data).put(update_user_data))
}

/// `?genres=a,b&maxCookingTime=30&difficulty=easy&servings=4&limit=10`
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    genres: Option<String>,
    #[serde(alias = "maxCookingTime")]
    max_cooking_time: Option<i64>,
    difficulty: Option<String>,
    servings: Option<i64>,
    limit: Option<i64>,
}

impl SearchQuery {
    fn into_filters(self) -> AppResult<RecipeSearchFilters> {
        let genres = self
            .genres
            .map(|g| {
                g.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let difficulty = match self.difficulty.as_deref() {
            None | Some("") => None,
            Some(d) => Some(Difficulty::from_str(d).ok_or_else(|| {
                AppError::invalid_field("difficulty", "must be one of easy, medium, hard")
            })?),
        };

        Ok(RecipeSearchFilters {
            genres,
            max_cooking_time: self.max_cooking_time,
            difficulty,
            servings: self.servings,
            limit: search_limit(self.limit),
        })
    }
}

async fn list_recipes(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<DataResponse<Vec<Recipe>>>> {
    Ok(data(RecipeService::list(&state, &user.id).await?))
}

async fn search_recipes(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<DataResponse<Vec<Recipe>>>> {
    let filters = query.into_filters()?;
    Ok(data(RecipeService::search(&state, &user.id, filters).await?))
}

async fn get_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Recipe>>> {
    Ok(data(RecipeService::get(&state, &user.id, &id).await?))
}

async fn create_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateRecipe>,
) -> AppResult<(StatusCode, Json<DataResponse<Recipe>>)> {
    let recipe = RecipeService::create(&state, &user.id, body).await?;
    Ok((StatusCode::CREATED, data(recipe)))
}

async fn update_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateRecipe>,
) -> AppResult<Json<DataResponse<Recipe>>> {
    Ok(data(RecipeService::update(&state, &user.id, &id, body).await?))
}

async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    RecipeService::delete(&state, &user.id, &id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn list_favorites(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<DataResponse<Vec<Recipe>>>> {
    Ok(data(RecipeService::favorites(&state, &user.id).await?))
}

async fn save_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    RecipeService::save(&state, &user.id, &id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn unsave_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    RecipeService::unsave(&state, &user.id, &id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn get_user_data(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Option<UserRecipeData>>>> {
    Ok(data(RecipeService::user_data(&state, &user.id, &id).await?))
}

async fn update_user_data(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRecipeData>,
) -> AppResult<Json<DataResponse<UserRecipeData>>> {
    Ok(data(
        RecipeService::update_user_data(&state, &user.id, &id, body).await?,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::*;
    use crate::services::testing::*;

    #[tokio::test]
    async fn recipes_are_scoped_to_their_owner() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let owner = seed_user(&state, "g-1").await;
        let other = seed_user(&state, "g-2").await;
        let owner_auth = bearer(&state, &owner);

        let (status, created) = send(
            &state,
            "POST",
            "/api/recipes",
            Some(&owner_auth),
            Some(json!({
                "title": "Shakshuka",
                "cooking_time": 25,
                "difficulty": "easy",
                "genre": "Middle Eastern",
                "ingredients": ["eggs", "tomatoes"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/recipes/{}", created["data"]["id"].as_str().unwrap());

        let (status, _) = send(&state, "GET", &uri, Some(&bearer(&state, &other)), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, found) = send(
            &state,
            "GET",
            "/api/recipes/search?genres=Middle%20Eastern,Italian&maxCookingTime=30&difficulty=easy",
            Some(&owner_auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["data"].as_array().unwrap().len(), 1);

        let (status, _) = send(
            &state,
            "GET",
            "/api/recipes/search?difficulty=extreme",
            Some(&owner_auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn favorites_and_user_data_through_the_router() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;
        let auth = bearer(&state, &user);

        let (_, created) = send(
            &state,
            "POST",
            "/api/recipes",
            Some(&auth),
            Some(json!({ "title": "Risotto" })),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();
        let save_uri = format!("/api/recipes/{}/save", id);
        let data_uri = format!("/api/recipes/{}/user-data", id);

        let (status, body) = send(&state, "GET", &data_uri, Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].is_null());

        let (status, body) = send(&state, "POST", &save_uri, Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = send(&state, "GET", "/api/recipes/favorites", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        let favorites = body["data"].as_array().unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0]["title"], "Risotto");

        let (status, body) = send(
            &state,
            "PUT",
            &data_uri,
            Some(&auth),
            Some(json!({ "rating": 5, "cookCount": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rating"], 5);
        assert_eq!(body["data"]["cook_count"], 1);
        assert_eq!(body["data"]["is_favorite"], true);

        let (status, body) =
            send(&state, "PUT", &data_uri, Some(&auth), Some(json!({ "rating": 0 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"]["field"], "rating");

        let (status, _) = send(&state, "DELETE", &save_uri, Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&state, "GET", "/api/recipes/favorites", Some(&auth), None).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let (status, _) = send(&state, "POST", "/api/recipes/nope/save", Some(&auth), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
