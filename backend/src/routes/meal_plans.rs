use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::db::models::{MealPlan, MealPlanWithRecipe};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::{data, DataResponse, DateRangeQuery};
use crate::services::meal_plans::{
    validate_batch, CreateMealPlansRequest, MealPlanContext, MealPlanService,
};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_meal_plans).post(create_meal_plans))
        // must come before "/:id"
        .route("/context", get(get_context))
        .route("/:id", get(get_meal_plan).delete(delete_meal_plan))
}

async fn create_meal_plans(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateMealPlansRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<MealPlan>>>)> {
    let meals = validate_batch(body.scheduled_meals.as_deref())?;
    let created =
        MealPlanService::create_meal_plans(&state, &user.id, meals, body.sync_with_calendar)
            .await?;
    Ok((StatusCode::CREATED, data(created)))
}

async fn list_meal_plans(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<DataResponse<Vec<MealPlanWithRecipe>>>> {
    let (start, end) = range.parse()?;
    let plans = MealPlanService::list_meal_plans(&state, &user.id, start, end).await?;
    Ok(data(plans))
}

async fn get_context(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<DataResponse<MealPlanContext>>> {
    let (start, end) = range.parse()?;
    let context = MealPlanService::context(&state, &user.id, start, end).await?;
    Ok(data(context))
}

async fn get_meal_plan(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<MealPlanWithRecipe>>> {
    let plan = MealPlanService::get_meal_plan(&state, &user.id, &id).await?;
    Ok(data(plan))
}

async fn delete_meal_plan(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    MealPlanService::delete_meal_plan(&state, &user.id, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Meal plan deleted successfully"
    })))
}
