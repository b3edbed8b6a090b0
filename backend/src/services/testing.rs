//! Test doubles shared by service and route tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::db::models::User;
use crate::db::{CalendarTokenRepository, UserRepository};
use crate::services::google::*;
use crate::services::init::init_test_db;
use crate::AppState;

pub const TEST_JWT_SECRET: &str = "test-secret-with-enough-entropy-0123456789";

/// In-memory Google fake that counts every call.
#[derive(Default)]
pub struct FakeGoogle {
    pub refresh_calls: AtomicUsize,
    pub create_calendar_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub list_calls: AtomicUsize,

    pub fail_refresh: AtomicBool,
    pub fail_insert: AtomicBool,
    /// Status returned by `delete_event`; success when `None`.
    pub delete_status: Mutex<Option<u16>>,
    /// Refresh token returned by the next refresh, simulating rotation.
    pub rotated_refresh_token: Mutex<Option<String>>,
    /// Overrides the `expires_in` of exchanged and refreshed tokens.
    pub expires_in: Mutex<Option<i64>>,

    pub inserted: Mutex<Vec<(String, CalendarEvent)>>,
    pub deleted: Mutex<Vec<(String, String)>>,
    pub listed_windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    pub events: Mutex<Vec<CalendarEvent>>,
}

impl FakeGoogle {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        [
            &self.refresh_calls,
            &self.create_calendar_calls,
            &self.insert_calls,
            &self.delete_calls,
            &self.list_calls,
        ]
        .iter()
        .map(|c| Self::count(c))
        .sum()
    }

    fn token_lifetime(&self) -> i64 {
        let lifetime = *self.expires_in.lock().unwrap();
        lifetime.unwrap_or(3600)
    }

    fn server_error() -> GoogleApiError {
        GoogleApiError::Status {
            status: 500,
            body: "backend error".to_string(),
        }
    }
}

#[async_trait]
impl GoogleApi for FakeGoogle {
    async fn exchange_code(&self, code: &str) -> GoogleResult<TokenResponse> {
        if code == "bad-code" {
            return Err(GoogleApiError::Status {
                status: 400,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(TokenResponse {
            access_token: format!("access-{}", code),
            expires_in: self.token_lifetime(),
            refresh_token: if code == "no-refresh" {
                None
            } else {
                Some(format!("refresh-{}", code))
            },
            scope: None,
            token_type: Some("Bearer".to_string()),
        })
    }

    async fn get_user_info(&self, _access_token: &str) -> GoogleResult<GoogleUserInfo> {
        Ok(GoogleUserInfo {
            id: "google-123".to_string(),
            email: "cook@example.com".to_string(),
            name: Some("Home Cook".to_string()),
            picture: None,
        })
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> GoogleResult<TokenResponse> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(GoogleApiError::Status {
                status: 400,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(TokenResponse {
            access_token: format!("refreshed-access-{}", n),
            expires_in: self.token_lifetime(),
            refresh_token: self.rotated_refresh_token.lock().unwrap().take(),
            scope: None,
            token_type: Some("Bearer".to_string()),
        })
    }

    async fn create_calendar(
        &self,
        _access_token: &str,
        _calendar: &NewCalendar,
    ) -> GoogleResult<String> {
        let n = self.create_calendar_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("calendar-{}", n))
    }

    async fn insert_event(
        &self,
        _access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> GoogleResult<String> {
        let n = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(Self::server_error());
        }
        self.inserted
            .lock()
            .unwrap()
            .push((calendar_id.to_string(), event.clone()));
        Ok(format!("event-{}", n))
    }

    async fn delete_event(
        &self,
        _access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> GoogleResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = *self.delete_status.lock().unwrap() {
            return Err(GoogleApiError::Status {
                status,
                body: String::new(),
            });
        }
        self.deleted
            .lock()
            .unwrap()
            .push((calendar_id.to_string(), event_id.to_string()));
        Ok(())
    }

    async fn list_events(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> GoogleResult<Vec<CalendarEvent>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listed_windows
            .lock()
            .unwrap()
            .push((time_min, time_max));
        Ok(self.events.lock().unwrap().clone())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = TEST_JWT_SECRET.to_string();
    config.google.client_id = Some("client-id".to_string());
    config.google.client_secret = Some("client-secret".to_string());
    config
}

pub async fn test_state(google: Arc<FakeGoogle>) -> Arc<AppState> {
    Arc::new(AppState {
        db: init_test_db().await,
        config: test_config(),
        google,
    })
}

pub async fn seed_user(state: &AppState, google_id: &str) -> User {
    UserRepository::upsert_by_google_id(
        &state.db,
        google_id,
        &format!("{}@example.com", google_id),
        "Test User",
        None,
    )
    .await
    .unwrap()
}

/// Store calendar credentials whose access token expires at `expires_at_millis`.
pub async fn connect_calendar(state: &AppState, user_id: &str, expires_at_millis: i64) {
    CalendarTokenRepository::store_connection(
        &state.db,
        user_id,
        "cached-access",
        Some("stored-refresh"),
        expires_at_millis,
    )
    .await
    .unwrap();
}
