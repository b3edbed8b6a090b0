use crate::db::models::*;
use crate::db::ShoppingListRepository;
use crate::error::{AppError, AppResult};
use crate::AppState;

pub struct ShoppingListService;

impl ShoppingListService {
    fn validate(name: Option<&str>, quantity: Option<f64>) -> AppResult<()> {
        if name.is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::invalid_field("name", "is required"));
        }
        if quantity.is_some_and(|q| !q.is_finite() || q < 0.0) {
            return Err(AppError::invalid_field("quantity", "must be zero or greater"));
        }
        Ok(())
    }

    pub async fn list(
        state: &AppState,
        user_id: &str,
        completed: Option<bool>,
    ) -> AppResult<Vec<ShoppingListItem>> {
        ShoppingListRepository::list(&state.db, user_id, completed).await
    }

    pub async fn get(state: &AppState, user_id: &str, id: &str) -> AppResult<ShoppingListItem> {
        ShoppingListRepository::find_by_id(&state.db, user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shopping list item not found".to_string()))
    }

    pub async fn create(
        state: &AppState,
        user_id: &str,
        create: CreateShoppingListItem,
    ) -> AppResult<ShoppingListItem> {
        Self::validate(Some(&create.name), create.quantity)?;
        ShoppingListRepository::create(&state.db, user_id, create).await
    }

    pub async fn update(
        state: &AppState,
        user_id: &str,
        id: &str,
        update: UpdateShoppingListItem,
    ) -> AppResult<ShoppingListItem> {
        Self::validate(update.name.as_deref(), update.quantity)?;
        ShoppingListRepository::update(&state.db, user_id, id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("Shopping list item not found".to_string()))
    }

    pub async fn delete(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
        if !ShoppingListRepository::delete(&state.db, user_id, id).await? {
            return Err(AppError::NotFound(
                "Shopping list item not found".to_string(),
            ));
        }
        Ok(())
    }

    /// Remove every completed item; returns how many were removed.
    pub async fn clear_completed(state: &AppState, user_id: &str) -> AppResult<u64> {
        ShoppingListRepository::clear_completed(&state.db, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::testing::*;

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;

        let err = ShoppingListService::create(
            &state,
            &user.id,
            CreateShoppingListItem {
                name: "".to_string(),
                quantity: None,
                unit: None,
                category: None,
                completed: false,
                recipe_ids: Vec::new(),
                recipe_names: Vec::new(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { .. }));
    }

    #[tokio::test]
    async fn deleting_missing_item_is_not_found() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;

        let err = ShoppingListService::delete(&state, &user.id, "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
