use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::db::models::Recipe;

/// Meal slot of a scheduled meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    /// Parse the wire name (case-sensitive, e.g. `"Dinner"`).
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Breakfast" => Some(MealType::Breakfast),
            "Lunch" => Some(MealType::Lunch),
            "Dinner" => Some(MealType::Dinner),
            "Snack" => Some(MealType::Snack),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }

    /// Keys looked up in `meal_times`, in priority order.
    pub fn settings_keys(self) -> &'static [&'static str] {
        match self {
            MealType::Breakfast => &["breakfast"],
            MealType::Lunch => &["lunch"],
            MealType::Dinner => &["dinner"],
            MealType::Snack => &["snack", "snacks"],
        }
    }
}

impl TryFrom<&str> for MealType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value).ok_or_else(|| format!("Invalid meal type: {}", value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: String,
    pub calendar_event_id: Option<String>,
    pub sync_with_calendar: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A row prepared by the orchestrator, ready for the batch insert.
#[derive(Debug, Clone)]
pub struct NewMealPlan {
    pub recipe_id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub calendar_event_id: Option<String>,
    pub sync_with_calendar: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPlanWithRecipe {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub recipe: Option<Recipe>,
}

/// A validated batch entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledMeal {
    pub recipe_id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_type_round_trips_wire_names() {
        for meal_type in MealType::ALL {
            assert_eq!(MealType::from_str(meal_type.as_str()), Some(meal_type));
        }
    }

    #[test]
    fn meal_type_rejects_unknown_and_lowercase() {
        assert_eq!(MealType::from_str("brunch"), None);
        assert_eq!(MealType::from_str("dinner"), None);
        assert!(MealType::try_from("Supper").is_err());
    }
}
