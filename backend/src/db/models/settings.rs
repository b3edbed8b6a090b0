use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::MealType;

/// Time used for a meal slot that has no configured time.
pub const DEFAULT_MEAL_TIME: &str = "12:00";

/// Slot names accepted as `meal_times` keys. `snacks` is the historical key for
/// the Snack slot; `snack` is accepted as well.
pub const MEAL_TIME_KEYS: [&str; 5] = ["breakfast", "lunch", "dinner", "snack", "snacks"];

/// Per-user map of meal slot name -> local time of day (`HH:MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealTimes(pub BTreeMap<String, String>);

impl Default for MealTimes {
    fn default() -> Self {
        let mut times = BTreeMap::new();
        times.insert("breakfast".to_string(), "08:00".to_string());
        times.insert("lunch".to_string(), "12:00".to_string());
        times.insert("dinner".to_string(), "18:00".to_string());
        times.insert("snacks".to_string(), "15:00".to_string());
        Self(times)
    }
}

impl MealTimes {
    /// Configured time for a slot, or [`DEFAULT_MEAL_TIME`] when unset.
    pub fn time_for(&self, meal_type: MealType) -> &str {
        meal_type
            .settings_keys()
            .iter()
            .find_map(|key| self.0.get(*key))
            .map(String::as_str)
            .unwrap_or(DEFAULT_MEAL_TIME)
    }
}

/// User settings as exposed to clients.
///
/// Calendar credentials live on the same row but are never loaded into this
/// struct; only `calendar_connected` reflects whether a refresh token exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub id: String,
    pub user_id: String,
    pub meal_times: MealTimes,
    pub sync_with_calendar: bool,
    pub recipe_preferences: serde_json::Value,
    pub pantrypal_calendar_id: Option<String>,
    pub calendar_connected: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUserSettings {
    pub meal_times: Option<MealTimes>,
    pub sync_with_calendar: Option<bool>,
    pub recipe_preferences: Option<serde_json::Value>,
}

impl UpdateUserSettings {
    pub fn is_empty(&self) -> bool {
        self.meal_times.is_none()
            && self.sync_with_calendar.is_none()
            && self.recipe_preferences.is_none()
    }
}

/// Google OAuth credentials stored for calendar access.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CalendarTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Access token expiry, epoch milliseconds.
    pub expires_at_millis: Option<i64>,
}

impl CalendarTokens {
    /// Returns the cached access token if it is still valid at `now_millis`.
    pub fn cached_access_token(&self, now_millis: i64) -> Option<&str> {
        match (self.access_token.as_deref(), self.expires_at_millis) {
            (Some(token), Some(expires)) if now_millis < expires => Some(token),
            _ => None,
        }
    }
}

// Tokens never end up in logs.
impl fmt::Debug for CalendarTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarTokens")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at_millis", &self.expires_at_millis)
            .finish()
    }
}
