#![allow(unused_imports)]

//! Database models, one file per table.
//! Everything is re-exported at `crate::db::models` (and `crate::db`).

pub mod meal_plan;
pub mod pantry;
pub mod recipe;
pub mod settings;
pub mod shopping;
pub mod user;
pub mod user_recipe_data;

pub use self::meal_plan::*;
pub use self::pantry::*;
pub use self::recipe::*;
pub use self::settings::*;
pub use self::shopping::*;
pub use self::user::*;
pub use self::user_recipe_data::*;
