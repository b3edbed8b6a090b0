use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecipeData {
    pub id: String,
    pub user_id: String,
    pub recipe_id: String,
    pub is_favorite: bool,
    pub cook_count: i64,
    pub last_cooked_at: Option<NaiveDateTime>,
    /// 1 to 5 stars.
    pub rating: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRecipeData {
    #[serde(default, alias = "isFavorite")]
    pub is_favorite: Option<bool>,
    #[serde(default, alias = "cookCount")]
    pub cook_count: Option<i64>,
    #[serde(default, alias = "lastCookedAt")]
    pub last_cooked_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub rating: Option<i64>,
}

impl UpdateUserRecipeData {
    pub fn is_empty(&self) -> bool {
        self.is_favorite.is_none()
            && self.cook_count.is_none()
            && self.last_cooked_at.is_none()
            && self.rating.is_none()
    }
}
