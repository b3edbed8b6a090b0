pub mod calendar_tokens;
pub mod meal_plan;
pub mod pantry_item;
pub mod recipe;
pub mod shopping_list;
pub mod user;
pub mod user_recipe_data;
pub mod user_settings;

pub use calendar_tokens::CalendarTokenRepository;
pub use meal_plan::MealPlanRepository;
pub use pantry_item::PantryItemRepository;
pub use recipe::RecipeRepository;
pub use shopping_list::ShoppingListRepository;
pub use user::UserRepository;
pub use user_recipe_data::UserRecipeDataRepository;
pub use user_settings::UserSettingsRepository;
