use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Minutes.
    pub cooking_time: Option<i64>,
    pub servings: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub genre: Option<String>,
    pub image_url: Option<String>,
    pub child_friendly: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecipe {
    pub title: String,
    pub description: Option<String>,
    pub cooking_time: Option<i64>,
    pub servings: Option<i64>,
    pub difficulty: Option<Difficulty>,
    #[serde(default = "empty_array")]
    pub ingredients: serde_json::Value,
    #[serde(default = "empty_array")]
    pub instructions: serde_json::Value,
    pub genre: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub child_friendly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRecipe {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cooking_time: Option<i64>,
    pub servings: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub ingredients: Option<serde_json::Value>,
    pub instructions: Option<serde_json::Value>,
    pub genre: Option<String>,
    pub image_url: Option<String>,
    pub child_friendly: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeSearchFilters {
    pub genres: Vec<String>,
    pub max_cooking_time: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub servings: Option<i64>,
    pub limit: i64,
}

fn empty_array() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}
