use std::sync::Arc;

use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::AppState;

pub mod auth;
pub mod calendar;
pub mod health;
pub mod meal_plans;
pub mod pantry;
pub mod profile;
pub mod recipes;
pub mod settings;
pub mod shopping_list;

/// Success envelope: `{ "data": ... }`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

pub fn data<T: Serialize>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse { data })
}

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD`, both optional.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRangeQuery {
    pub fn parse(&self) -> AppResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        Ok((
            parse_date("start", self.start.as_deref())?,
            parse_date("end", self.end.as_deref())?,
        ))
    }
}

fn parse_date(field: &str, value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::invalid_field(field, "must be a date in YYYY-MM-DD format")),
    }
}

/// Every `/api` router except auth, which `main` wraps in a rate limiter.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api/user/settings", settings::router())
        .nest("/api/user/profile", profile::router())
        .nest("/api/meal-plans", meal_plans::router())
        .nest("/api/calendar", calendar::router())
        .nest("/api/recipes", recipes::router())
        .nest("/api/pantry", pantry::router())
        .nest("/api/shopping-list", shopping_list::router())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_rejects_malformed_dates() {
        let query = DateRangeQuery {
            start: Some("2024-06-10".to_string()),
            end: Some("".to_string()),
        };
        assert_eq!(
            query.parse().unwrap(),
            (NaiveDate::from_ymd_opt(2024, 6, 10), None)
        );

        let bad = DateRangeQuery {
            start: Some("10/06/2024".to_string()),
            end: None,
        };
        assert!(matches!(
            bad.parse().unwrap_err(),
            AppError::InvalidField { .. }
        ));
    }
}
