use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::models::*;
use crate::db::{MealPlanRepository, RecipeRepository, UserSettingsRepository};
use crate::error::{AppError, AppResult};
use crate::services::calendar::{CalendarService, NewCalendarEvent};
use crate::services::google::CalendarEvent;
use crate::AppState;

/// Body of `POST /api/meal-plans`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMealPlansRequest {
    #[serde(default)]
    pub scheduled_meals: Option<Vec<ScheduledMealInput>>,
    #[serde(default, rename = "syncWithCalendar", alias = "sync_with_calendar")]
    pub sync_with_calendar: bool,
}

/// A batch entry as received; every field is checked by [`validate_batch`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduledMealInput {
    #[serde(default, alias = "recipeId")]
    pub recipe_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "mealType")]
    pub meal_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPlanContext {
    #[serde(rename = "calendarEvents")]
    pub calendar_events: Vec<CalendarEvent>,
    pub settings: UserSettings,
}

/// Validate the whole batch. The first bad entry rejects everything.
pub fn validate_batch(meals: Option<&[ScheduledMealInput]>) -> AppResult<Vec<ScheduledMeal>> {
    let meals = match meals {
        Some(meals) if !meals.is_empty() => meals,
        Some(_) => {
            return Err(AppError::invalid_field(
                "scheduled_meals",
                "must contain at least one meal",
            ))
        }
        None => return Err(AppError::invalid_field("scheduled_meals", "is required")),
    };

    meals
        .iter()
        .enumerate()
        .map(|(i, meal)| validate_meal(i, meal))
        .collect()
}

fn validate_meal(index: usize, meal: &ScheduledMealInput) -> AppResult<ScheduledMeal> {
    let field = |name: &str| format!("scheduled_meals[{}].{}", index, name);

    let recipe_id = match meal.recipe_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err(AppError::invalid_field(field("recipe_id"), "is required")),
    };

    let date = match meal.date.as_deref() {
        Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::invalid_field(field("date"), "must be a date in YYYY-MM-DD format"))?,
        _ => return Err(AppError::invalid_field(field("date"), "is required")),
    };

    let meal_type = match meal.meal_type.as_deref() {
        Some(raw) if !raw.is_empty() => MealType::from_str(raw).ok_or_else(|| {
            let names: Vec<&str> = MealType::ALL.iter().map(|m| m.as_str()).collect();
            AppError::invalid_field(field("meal_type"), format!("must be one of {}", names.join(", ")))
        })?,
        _ => return Err(AppError::invalid_field(field("meal_type"), "is required")),
    };

    Ok(ScheduledMeal {
        recipe_id,
        date,
        meal_type,
    })
}

pub struct MealPlanService;

impl MealPlanService {
    /// Create a batch of meal plans, optionally mirroring each one into the
    /// user's calendar.
    ///
    /// Calendar writes are attempted only when both `sync_with_calendar` and
    /// the user's stored preference are on. They run one at a time before
    /// the rows are written; failures are logged and leave the row without
    /// an event id. The rows are then inserted all-or-nothing.
    pub async fn create_meal_plans(
        state: &AppState,
        user_id: &str,
        meals: Vec<ScheduledMeal>,
        sync_with_calendar: bool,
    ) -> AppResult<Vec<MealPlan>> {
        let settings = UserSettingsRepository::get_or_create(&state.db, user_id).await?;
        let sync = sync_with_calendar && settings.sync_with_calendar;

        debug!(
            "Creating {} meal plans for user {} (calendar sync: {})",
            meals.len(),
            user_id,
            sync
        );

        let mut rows = Vec::with_capacity(meals.len());
        for meal in meals {
            let calendar_event_id = if sync {
                Self::create_calendar_event(state, user_id, &settings.meal_times, &meal).await
            } else {
                None
            };

            rows.push(NewMealPlan {
                recipe_id: meal.recipe_id,
                date: meal.date,
                meal_type: meal.meal_type,
                calendar_event_id,
                sync_with_calendar: sync,
            });
        }

        let created = MealPlanRepository::insert_batch(&state.db, user_id, rows).await?;
        info!("Created {} meal plans for user {}", created.len(), user_id);

        Ok(created)
    }

    async fn create_calendar_event(
        state: &AppState,
        user_id: &str,
        meal_times: &MealTimes,
        meal: &ScheduledMeal,
    ) -> Option<String> {
        let recipe = match RecipeRepository::find_by_id(&state.db, user_id, &meal.recipe_id).await {
            Ok(recipe) => recipe,
            Err(e) => {
                warn!("Recipe lookup failed for {}: {}", meal.recipe_id, e);
                None
            }
        };

        let title = recipe.as_ref().map(|r| r.title.as_str()).unwrap_or("Meal");
        let event = NewCalendarEvent {
            summary: format!("{}: {}", meal.meal_type.as_str(), title),
            description: recipe.as_ref().and_then(|r| r.description.clone()),
            date: meal.date,
            meal_time: meal_times.time_for(meal.meal_type).to_string(),
        };

        match CalendarService::create_event(state, user_id, &event).await {
            Ok(event_id) => Some(event_id),
            Err(e) => {
                warn!(
                    "Failed to create calendar event for {} on {}: {}",
                    meal.meal_type.as_str(),
                    meal.date,
                    e
                );
                None
            }
        }
    }

    pub async fn list_meal_plans(
        state: &AppState,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<MealPlanWithRecipe>> {
        MealPlanRepository::list(&state.db, user_id, start, end).await
    }

    pub async fn get_meal_plan(
        state: &AppState,
        user_id: &str,
        id: &str,
    ) -> AppResult<MealPlanWithRecipe> {
        MealPlanRepository::find_by_id(&state.db, user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Meal plan not found".to_string()))
    }

    /// Delete a meal plan and, best-effort, its calendar event.
    pub async fn delete_meal_plan(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
        let existing = Self::get_meal_plan(state, user_id, id).await?;

        if let Some(event_id) = existing.plan.calendar_event_id.as_deref() {
            if let Err(e) = CalendarService::delete_event(state, user_id, event_id).await {
                warn!(
                    "Failed to delete calendar event {} for meal plan {}: {}",
                    event_id, id, e
                );
            }
        }

        MealPlanRepository::delete(&state.db, user_id, id).await?;
        info!("Deleted meal plan {} for user {}", id, user_id);

        Ok(())
    }

    /// Settings plus calendar events, the latter only when sync is on and
    /// both dates are given.
    pub async fn context(
        state: &AppState,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<MealPlanContext> {
        let settings = UserSettingsRepository::get_or_create(&state.db, user_id).await?;

        let calendar_events = match (settings.sync_with_calendar, start, end) {
            (true, Some(start), Some(end)) => {
                CalendarService::list_events(state, user_id, start, end).await
            }
            _ => Vec::new(),
        };

        Ok(MealPlanContext {
            calendar_events,
            settings,
        })
    }
}
