use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub completed: bool,
    pub recipe_ids: Vec<String>,
    pub recipe_names: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShoppingListItem {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub recipe_ids: Vec<String>,
    #[serde(default)]
    pub recipe_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateShoppingListItem {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub completed: Option<bool>,
    pub recipe_ids: Option<Vec<String>>,
    pub recipe_names: Option<Vec<String>>,
}
