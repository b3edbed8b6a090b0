use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::models::DEFAULT_MEAL_TIME;
use crate::db::{CalendarTokenRepository, UserSettingsRepository};
use crate::error::AppError;
use crate::services::google::{CalendarEvent, EventDateTime, NewCalendar};
use crate::services::tokens::CalendarTokenService;
use crate::AppState;

pub const CALENDAR_NAME: &str = "PantryPal Meals";
pub const CALENDAR_DESCRIPTION: &str = "Meal plans created by PantryPal";

const EVENT_DURATION_MINUTES: i64 = 60;
const LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Google Calendar not connected. Please sign in with Google.")]
    NotConnected,

    #[error("Failed to refresh Google access token: {0}")]
    RefreshFailed(String),

    #[error("Google Calendar request failed: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Store(Box<AppError>),
}

impl From<AppError> for CalendarError {
    fn from(err: AppError) -> Self {
        CalendarError::Store(Box::new(err))
    }
}

pub type CalendarResult<T> = Result<T, CalendarError>;

/// Input for a single meal event.
#[derive(Debug, Clone)]
pub struct NewCalendarEvent {
    pub summary: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    /// Local time of day, `HH:MM`.
    pub meal_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarStatus {
    pub connected: bool,
    pub calendar_id: Option<String>,
    /// Expiry of the cached access token, epoch milliseconds.
    pub token_expires_at: Option<i64>,
}

/// Parse a strict `HH:MM` time of day.
pub fn parse_meal_time(value: &str) -> Option<NaiveTime> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// One-hour event window starting at `date` + `time`, in local wall-clock time.
pub fn event_window(date: NaiveDate, time: NaiveTime) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(time);
    (start, start + Duration::minutes(EVENT_DURATION_MINUTES))
}

/// Gateway to the user's dedicated Google calendar.
pub struct CalendarService;

impl CalendarService {
    /// Id of the user's dedicated calendar, creating it on first use.
    pub async fn find_or_create_calendar(state: &AppState, user_id: &str) -> CalendarResult<String> {
        let settings = UserSettingsRepository::get_or_create(&state.db, user_id).await?;
        if let Some(calendar_id) = settings.pantrypal_calendar_id {
            return Ok(calendar_id);
        }

        let access_token = CalendarTokenService::valid_access_token(state, user_id).await?;

        let calendar = NewCalendar {
            summary: CALENDAR_NAME.to_string(),
            description: CALENDAR_DESCRIPTION.to_string(),
            time_zone: state.config.google.calendar_time_zone.clone(),
        };
        let calendar_id = state
            .google
            .create_calendar(&access_token, &calendar)
            .await
            .map_err(|e| CalendarError::WriteFailed(format!("Failed to create calendar: {}", e)))?;

        UserSettingsRepository::set_calendar_id(&state.db, user_id, &calendar_id).await?;
        info!("Created calendar {} for user {}", calendar_id, user_id);

        Ok(calendar_id)
    }

    /// Create a one-hour event; returns the provider's event id.
    pub async fn create_event(
        state: &AppState,
        user_id: &str,
        event: &NewCalendarEvent,
    ) -> CalendarResult<String> {
        let access_token = CalendarTokenService::valid_access_token(state, user_id).await?;
        let calendar_id = Self::find_or_create_calendar(state, user_id).await?;

        let time = parse_meal_time(&event.meal_time).unwrap_or_else(|| {
            warn!(
                "Invalid meal time '{}' for user {}; using {}",
                event.meal_time, user_id, DEFAULT_MEAL_TIME
            );
            parse_meal_time(DEFAULT_MEAL_TIME).unwrap_or(NaiveTime::MIN)
        });
        let (start, end) = event_window(event.date, time);
        let time_zone = Some(state.config.google.calendar_time_zone.clone());

        let body = CalendarEvent {
            summary: Some(event.summary.clone()),
            description: event.description.clone(),
            start: Some(EventDateTime {
                date_time: Some(start.format(LOCAL_DATE_TIME_FORMAT).to_string()),
                time_zone: time_zone.clone(),
                ..Default::default()
            }),
            end: Some(EventDateTime {
                date_time: Some(end.format(LOCAL_DATE_TIME_FORMAT).to_string()),
                time_zone,
                ..Default::default()
            }),
            ..Default::default()
        };

        let event_id = state
            .google
            .insert_event(&access_token, &calendar_id, &body)
            .await
            .map_err(|e| CalendarError::WriteFailed(format!("Failed to create event: {}", e)))?;

        debug!("Created calendar event {} for user {}", event_id, user_id);
        Ok(event_id)
    }

    /// Delete an event. An event that is already gone counts as deleted.
    pub async fn delete_event(state: &AppState, user_id: &str, event_id: &str) -> CalendarResult<()> {
        let access_token = CalendarTokenService::valid_access_token(state, user_id).await?;
        let calendar_id = Self::find_or_create_calendar(state, user_id).await?;

        match state
            .google
            .delete_event(&access_token, &calendar_id, event_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("Calendar event {} already removed", event_id);
                Ok(())
            }
            Err(e) => Err(CalendarError::WriteFailed(format!(
                "Failed to delete event: {}",
                e
            ))),
        }
    }

    /// Events between `start` and `end` (both inclusive, whole days in UTC).
    ///
    /// Best-effort: any failure, including a missing connection, is logged
    /// and yields an empty list.
    pub async fn list_events(
        state: &AppState,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<CalendarEvent> {
        match Self::try_list_events(state, user_id, start, end).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Failed to fetch calendar events for user {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    async fn try_list_events(
        state: &AppState,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CalendarResult<Vec<CalendarEvent>> {
        let access_token = CalendarTokenService::valid_access_token(state, user_id).await?;
        let calendar_id = Self::find_or_create_calendar(state, user_id).await?;

        let time_min = start.and_time(NaiveTime::MIN).and_utc();
        let time_max = (end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();

        state
            .google
            .list_events(&access_token, &calendar_id, time_min, time_max)
            .await
            .map_err(|e| CalendarError::WriteFailed(format!("Failed to list events: {}", e)))
    }

    pub async fn status(state: &AppState, user_id: &str) -> CalendarResult<CalendarStatus> {
        let settings = UserSettingsRepository::get_or_create(&state.db, user_id).await?;
        let tokens = CalendarTokenRepository::find(&state.db, user_id)
            .await?
            .unwrap_or_default();

        Ok(CalendarStatus {
            connected: tokens.refresh_token.is_some(),
            calendar_id: settings.pantrypal_calendar_id,
            token_expires_at: tokens.expires_at_millis,
        })
    }

    /// Forget the stored Google credentials. Existing events stay in Google.
    pub async fn disconnect(state: &AppState, user_id: &str) -> CalendarResult<CalendarStatus> {
        CalendarTokenRepository::clear(&state.db, user_id).await?;
        info!(
            "Disconnected Google Calendar for user {} at {}",
            user_id,
            Utc::now()
        );
        Self::status(state, user_id).await
    }
}
