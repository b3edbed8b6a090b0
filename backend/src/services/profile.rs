use crate::db::models::{UpdateProfile, UserProfile};
use crate::db::UserRepository;
use crate::error::{AppError, AppResult};
use crate::AppState;

pub struct ProfileService;

impl ProfileService {
    pub async fn get_profile(state: &AppState, user_id: &str) -> AppResult<UserProfile> {
        UserRepository::find_by_id(&state.db, user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(
        state: &AppState,
        user_id: &str,
        update: UpdateProfile,
    ) -> AppResult<UserProfile> {
        if update.is_empty() {
            return Err(AppError::BadRequest("No valid fields to update".to_string()));
        }
        if update.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::invalid_field("fullName", "must not be blank"));
        }
        if let Some(url) = update.avatar_url.as_deref() {
            if url::Url::parse(url).is_err() {
                return Err(AppError::invalid_field("avatarUrl", "must be an absolute URL"));
            }
        }

        let user = UserRepository::update_profile(&state.db, user_id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        tracing::info!("Updated profile for user {}", user_id);
        Ok(user.into())
    }
}
