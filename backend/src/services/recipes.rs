use crate::db::models::*;
use crate::db::{RecipeRepository, UserRecipeDataRepository};
use crate::error::{AppError, AppResult};
use crate::AppState;

pub const DEFAULT_SEARCH_LIMIT: i64 = 10;
pub const MAX_SEARCH_LIMIT: i64 = 50;

/// Clamp a requested search limit into `1..=MAX_SEARCH_LIMIT`.
pub fn search_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT)
}

pub struct RecipeService;

impl RecipeService {
    fn validate_title(title: &str) -> AppResult<()> {
        if title.trim().is_empty() {
            return Err(AppError::invalid_field("title", "is required"));
        }
        Ok(())
    }

    fn validate_counts(cooking_time: Option<i64>, servings: Option<i64>) -> AppResult<()> {
        if cooking_time.is_some_and(|t| t < 0) {
            return Err(AppError::invalid_field("cooking_time", "must not be negative"));
        }
        if servings.is_some_and(|s| s < 1) {
            return Err(AppError::invalid_field("servings", "must be at least 1"));
        }
        Ok(())
    }

    fn validate_lists(
        ingredients: Option<&serde_json::Value>,
        instructions: Option<&serde_json::Value>,
    ) -> AppResult<()> {
        if ingredients.is_some_and(|v| !v.is_array()) {
            return Err(AppError::invalid_field("ingredients", "must be an array"));
        }
        if instructions.is_some_and(|v| !v.is_array()) {
            return Err(AppError::invalid_field("instructions", "must be an array"));
        }
        Ok(())
    }

    pub async fn list(state: &AppState, user_id: &str) -> AppResult<Vec<Recipe>> {
        RecipeRepository::list_by_user(&state.db, user_id).await
    }

    pub async fn search(
        state: &AppState,
        user_id: &str,
        filters: RecipeSearchFilters,
    ) -> AppResult<Vec<Recipe>> {
        RecipeRepository::search(&state.db, user_id, &filters).await
    }

    pub async fn get(state: &AppState, user_id: &str, id: &str) -> AppResult<Recipe> {
        RecipeRepository::find_by_id(&state.db, user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
    }

    pub async fn create(state: &AppState, user_id: &str, create: CreateRecipe) -> AppResult<Recipe> {
        Self::validate_title(&create.title)?;
        Self::validate_counts(create.cooking_time, create.servings)?;
        Self::validate_lists(Some(&create.ingredients), Some(&create.instructions))?;

        let recipe = RecipeRepository::create(&state.db, user_id, create).await?;
        tracing::info!("Created recipe {} for user {}", recipe.id, user_id);
        Ok(recipe)
    }

    pub async fn update(
        state: &AppState,
        user_id: &str,
        id: &str,
        update: UpdateRecipe,
    ) -> AppResult<Recipe> {
        if let Some(title) = &update.title {
            Self::validate_title(title)?;
        }
        Self::validate_counts(update.cooking_time, update.servings)?;
        Self::validate_lists(update.ingredients.as_ref(), update.instructions.as_ref())?;

        RecipeRepository::update(&state.db, user_id, id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
    }

    /// Meal plans that reference the recipe are left in place; the user's
    /// favorite and cook data for it go.
    pub async fn delete(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
        if !RecipeRepository::delete(&state.db, user_id, id).await? {
            return Err(AppError::NotFound("Recipe not found".to_string()));
        }
        UserRecipeDataRepository::delete_for_recipe(&state.db, user_id, id).await?;
        Ok(())
    }

    pub async fn save(state: &AppState, user_id: &str, id: &str) -> AppResult<UserRecipeData> {
        Self::get(state, user_id, id).await?;
        let update = UpdateUserRecipeData {
            is_favorite: Some(true),
            ..Default::default()
        };
        UserRecipeDataRepository::upsert(&state.db, user_id, id, update).await
    }

    /// Idempotent; cook count and rating survive.
    pub async fn unsave(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
        UserRecipeDataRepository::clear_favorite(&state.db, user_id, id).await?;
        Ok(())
    }

    pub async fn favorites(state: &AppState, user_id: &str) -> AppResult<Vec<Recipe>> {
        UserRecipeDataRepository::favorites(&state.db, user_id).await
    }

    /// `None` until the user first saves, rates or cooks the recipe.
    pub async fn user_data(
        state: &AppState,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<UserRecipeData>> {
        Self::get(state, user_id, id).await?;
        UserRecipeDataRepository::find(&state.db, user_id, id).await
    }

    pub async fn update_user_data(
        state: &AppState,
        user_id: &str,
        id: &str,
        update: UpdateUserRecipeData,
    ) -> AppResult<UserRecipeData> {
        if update.is_empty() {
            return Err(AppError::BadRequest("No valid fields to update".to_string()));
        }
        if update.rating.is_some_and(|r| !(1..=5).contains(&r)) {
            return Err(AppError::invalid_field("rating", "must be between 1 and 5"));
        }
        if update.cook_count.is_some_and(|c| c < 0) {
            return Err(AppError::invalid_field("cook_count", "must not be negative"));
        }

        Self::get(state, user_id, id).await?;
        UserRecipeDataRepository::upsert(&state.db, user_id, id, update).await
    }
}
