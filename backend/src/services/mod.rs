pub mod auth;
pub mod calendar;
pub mod google;
pub mod init;
pub mod meal_plans;
pub mod pantry;
pub mod profile;
pub mod recipes;
pub mod settings;
pub mod shopping;
pub mod tokens;

#[cfg(test)]
pub mod testing;
