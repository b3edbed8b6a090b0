use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::{data, DataResponse, DateRangeQuery};
use crate::services::calendar::{CalendarService, CalendarStatus};
use crate::services::google::CalendarEvent;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/setup", post(setup))
        .route("/events", get(list_events))
        .route("/disconnect", post(disconnect))
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub calendar_id: String,
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<DataResponse<CalendarStatus>>> {
    let status = CalendarService::status(&state, &user.id).await?;
    Ok(data(status))
}

/// Create the dedicated calendar now instead of on the first synced meal.
async fn setup(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<DataResponse<SetupResponse>>> {
    let calendar_id = CalendarService::find_or_create_calendar(&state, &user.id).await?;
    Ok(data(SetupResponse { calendar_id }))
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<DataResponse<Vec<CalendarEvent>>>> {
    let (Some(start), Some(end)) = range.parse()? else {
        return Err(AppError::BadRequest(
            "Both start and end dates are required".to_string(),
        ));
    };
    if end < start {
        return Err(AppError::invalid_field("end", "must not be before start"));
    }

    let events = CalendarService::list_events(&state, &user.id, start, end).await;
    Ok(data(events))
}

async fn disconnect(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<DataResponse<CalendarStatus>>> {
    let status = CalendarService::disconnect(&state, &user.id).await?;
    Ok(data(status))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use http::StatusCode;

    use crate::routes::test_support::*;
    use crate::services::testing::*;

    #[tokio::test]
    async fn setup_without_connection_is_conflict() {
        let google = Arc::new(FakeGoogle::default());
        let state = test_state(google.clone()).await;
        let user = seed_user(&state, "g-1").await;
        let auth = bearer(&state, &user);

        let (status, body) = send(&state, "POST", "/api/calendar/setup", Some(&auth), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CALENDAR_NOT_CONNECTED");
        assert_eq!(google.total_calls(), 0);
    }

    #[tokio::test]
    async fn setup_status_and_disconnect() {
        let google = Arc::new(FakeGoogle::default());
        let state = test_state(google.clone()).await;
        let user = seed_user(&state, "g-1").await;
        let auth = bearer(&state, &user);
        connect_calendar(&state, &user.id, Utc::now().timestamp_millis() + 3_600_000).await;

        let (status, body) = send(&state, "POST", "/api/calendar/setup", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["calendar_id"], "calendar-1");

        let (_, body) = send(&state, "GET", "/api/calendar/status", Some(&auth), None).await;
        assert_eq!(body["data"]["connected"], true);
        assert_eq!(body["data"]["calendar_id"], "calendar-1");

        let (status, body) =
            send(&state, "POST", "/api/calendar/disconnect", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["connected"], false);
        assert_eq!(body["data"]["calendar_id"], "calendar-1");
    }

    #[tokio::test]
    async fn events_require_both_dates_and_degrade_to_empty() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;
        let auth = bearer(&state, &user);

        let (status, _) = send(
            &state,
            "GET",
            "/api/calendar/events?start=2024-06-10",
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Not connected: listing is best-effort and yields no events.
        let (status, body) = send(
            &state,
            "GET",
            "/api/calendar/events?start=2024-06-10&end=2024-06-16",
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
    }
}
