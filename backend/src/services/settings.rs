use crate::db::models::{MealTimes, UpdateUserSettings, UserSettings, MEAL_TIME_KEYS};
use crate::db::UserSettingsRepository;
use crate::error::{AppError, AppResult};
use crate::services::calendar::parse_meal_time;
use crate::AppState;

pub struct SettingsService;

impl SettingsService {
    /// Validate a `meal_times` map: known slot keys and `HH:MM` values.
    pub fn validate_meal_times(meal_times: &MealTimes) -> AppResult<()> {
        for (slot, time) in &meal_times.0 {
            if !MEAL_TIME_KEYS.contains(&slot.as_str()) {
                return Err(AppError::invalid_field(
                    format!("meal_times.{}", slot),
                    format!("unknown meal slot; expected one of {}", MEAL_TIME_KEYS.join(", ")),
                ));
            }
            if parse_meal_time(time).is_none() {
                return Err(AppError::invalid_field(
                    format!("meal_times.{}", slot),
                    "must be a time in HH:MM format",
                ));
            }
        }
        Ok(())
    }

    pub async fn get_settings(state: &AppState, user_id: &str) -> AppResult<UserSettings> {
        UserSettingsRepository::get_or_create(&state.db, user_id).await
    }

    pub async fn update_settings(
        state: &AppState,
        user_id: &str,
        update: UpdateUserSettings,
    ) -> AppResult<UserSettings> {
        if update.is_empty() {
            return Err(AppError::BadRequest(
                "At least one of meal_times, sync_with_calendar or recipe_preferences is required"
                    .to_string(),
            ));
        }

        if let Some(meal_times) = &update.meal_times {
            Self::validate_meal_times(meal_times)?;
        }

        if let Some(preferences) = &update.recipe_preferences {
            if !preferences.is_object() {
                return Err(AppError::invalid_field(
                    "recipe_preferences",
                    "must be a JSON object",
                ));
            }
        }

        tracing::debug!("Updating settings for user {}", user_id);
        UserSettingsRepository::update(&state.db, user_id, update).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::services::testing::*;

    fn times(pairs: &[(&str, &str)]) -> MealTimes {
        MealTimes(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn meal_times_validation() {
        assert!(SettingsService::validate_meal_times(&MealTimes::default()).is_ok());
        assert!(SettingsService::validate_meal_times(&times(&[("snack", "16:30")])).is_ok());

        match SettingsService::validate_meal_times(&times(&[("dinner", "25:00")])) {
            Err(AppError::InvalidField { field, .. }) => assert_eq!(field, "meal_times.dinner"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(SettingsService::validate_meal_times(&times(&[("brunch", "10:00")])).is_err());
    }

    #[tokio::test]
    async fn settings_are_created_lazily_with_defaults() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;

        let settings = SettingsService::get_settings(&state, &user.id).await.unwrap();
        assert!(!settings.sync_with_calendar);
        assert!(!settings.calendar_connected);
        assert_eq!(settings.meal_times, MealTimes::default());

        let again = SettingsService::get_settings(&state, &user.id).await.unwrap();
        assert_eq!(settings.id, again.id);
    }

    #[tokio::test]
    async fn update_merges_and_rejects_empty_payload() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;

        let err = SettingsService::update_settings(&state, &user.id, UpdateUserSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let updated = SettingsService::update_settings(
            &state,
            &user.id,
            UpdateUserSettings {
                sync_with_calendar: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(updated.sync_with_calendar);
        assert_eq!(updated.meal_times, MealTimes::default());

        let updated = SettingsService::update_settings(
            &state,
            &user.id,
            UpdateUserSettings {
                meal_times: Some(times(&[("dinner", "19:15")])),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(updated.sync_with_calendar);
        assert_eq!(updated.meal_times, times(&[("dinner", "19:15")]));
    }

    #[tokio::test]
    async fn settings_never_expose_tokens() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;
        connect_calendar(&state, &user.id, 0).await;

        let settings = SettingsService::get_settings(&state, &user.id).await.unwrap();
        assert!(settings.calendar_connected);

        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("stored-refresh"));
        assert!(!json.contains("cached-access"));
    }
}
