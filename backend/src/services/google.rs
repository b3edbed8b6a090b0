use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Upper bound on pages fetched by one `list_events` call.
const MAX_EVENT_PAGES: usize = 20;

/// Scopes requested at sign-in: profile plus calendar management.
pub const GOOGLE_SCOPES: [&str; 5] = [
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
];

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("Google OAuth client is not configured")]
    NotConfigured,

    #[error("Request to Google failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Google returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response from Google: {0}")]
    Decode(String),
}

impl GoogleApiError {
    /// The resource is already gone (404 or 410).
    pub fn is_not_found(&self) -> bool {
        matches!(self, GoogleApiError::Status { status: 404 | 410, .. })
    }
}

pub type GoogleResult<T> = Result<T, GoogleApiError>;

// ============================================================================
// OAuth Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    /// Only present on first consent, or when Google rotates the token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Absolute expiry in epoch milliseconds, `None` when `expires_in` is
    /// negative or does not fit.
    pub fn expires_at_millis(&self, now_millis: i64) -> Option<i64> {
        if self.expires_in < 0 {
            return None;
        }
        self.expires_in
            .checked_mul(1000)
            .and_then(|span| now_millis.checked_add(span))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

// ============================================================================
// Calendar Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCalendar {
    pub summary: String,
    pub description: String,
    pub time_zone: String,
}

#[derive(Debug, Deserialize)]
struct CreatedCalendar {
    id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// All-day events carry a date instead of a date-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Operations the service needs from Google OAuth and Calendar v3.
#[async_trait]
pub trait GoogleApi: Send + Sync {
    async fn exchange_code(&self, code: &str) -> GoogleResult<TokenResponse>;

    async fn get_user_info(&self, access_token: &str) -> GoogleResult<GoogleUserInfo>;

    async fn refresh_access_token(&self, refresh_token: &str) -> GoogleResult<TokenResponse>;

    /// Returns the id of the new calendar.
    async fn create_calendar(&self, access_token: &str, calendar: &NewCalendar)
        -> GoogleResult<String>;

    /// Returns the id of the new event.
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> GoogleResult<String>;

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> GoogleResult<()>;

    /// Single (expanded) events in `[time_min, time_max)`, ordered by start.
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> GoogleResult<Vec<CalendarEvent>>;
}

// ============================================================================
// reqwest implementation
// ============================================================================

#[derive(Debug, Clone)]
pub struct GoogleClient {
    client: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl GoogleClient {
    pub fn new(config: &GoogleConfig) -> GoogleResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let (client_id, client_secret) = match config.credentials() {
            Some((id, secret)) => (Some(id.to_string()), Some(secret.to_string())),
            None => (None, None),
        };

        Ok(Self {
            client,
            client_id,
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    fn credentials(&self) -> GoogleResult<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(GoogleApiError::NotConfigured),
        }
    }

    fn calendar_url(calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}",
            GOOGLE_CALENDAR_API_URL,
            urlencoding::encode(calendar_id)
        )
    }

    /// Turn a non-success response into `GoogleApiError::Status`.
    async fn check(response: reqwest::Response) -> GoogleResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GoogleApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> GoogleResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| GoogleApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GoogleApi for GoogleClient {
    async fn exchange_code(&self, code: &str) -> GoogleResult<TokenResponse> {
        let (client_id, client_secret) = self.credentials()?;

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        Self::decode(Self::check(response).await?).await
    }

    async fn get_user_info(&self, access_token: &str) -> GoogleResult<GoogleUserInfo> {
        let response = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::decode(Self::check(response).await?).await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> GoogleResult<TokenResponse> {
        let (client_id, client_secret) = self.credentials()?;

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        Self::decode(Self::check(response).await?).await
    }

    async fn create_calendar(
        &self,
        access_token: &str,
        calendar: &NewCalendar,
    ) -> GoogleResult<String> {
        let response = self
            .client
            .post(format!("{}/calendars", GOOGLE_CALENDAR_API_URL))
            .bearer_auth(access_token)
            .json(calendar)
            .send()
            .await?;

        let created: CreatedCalendar = Self::decode(Self::check(response).await?).await?;
        Ok(created.id)
    }

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> GoogleResult<String> {
        let response = self
            .client
            .post(format!("{}/events", Self::calendar_url(calendar_id)))
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;

        let created: CalendarEvent = Self::decode(Self::check(response).await?).await?;
        created
            .id
            .ok_or_else(|| GoogleApiError::Decode("created event has no id".to_string()))
    }

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> GoogleResult<()> {
        let response = self
            .client
            .delete(format!(
                "{}/events/{}",
                Self::calendar_url(calendar_id),
                urlencoding::encode(event_id)
            ))
            .bearer_auth(access_token)
            .send()
            .await?;

        // 204 No Content on success
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        Self::check(response).await.map(|_| ())
    }

    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> GoogleResult<Vec<CalendarEvent>> {
        let time_min = time_min.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = time_max.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages_read = 0;

        loop {
            let mut query = vec![
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self
                .client
                .get(format!("{}/events", Self::calendar_url(calendar_id)))
                .bearer_auth(access_token)
                .query(&query)
                .send()
                .await?;

            let page: EventsPage = Self::decode(Self::check(response).await?).await?;
            events.extend(page.items);
            pages_read += 1;

            match next_page_token(pages_read, page_token.as_deref(), page.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }
}

/// The token to request next, or `None` once paging has to stop: no further
/// page, the page cap reached, or the provider repeating the current token.
fn next_page_token(
    pages_read: usize,
    current: Option<&str>,
    next: Option<String>,
) -> Option<String> {
    let token = next?;
    if pages_read >= MAX_EVENT_PAGES {
        tracing::warn!(
            "Stopping event listing after {} pages; later events are omitted",
            pages_read
        );
        return None;
    }
    if current == Some(token.as_str()) {
        tracing::warn!("Calendar API repeated page token; stopping event listing");
        return None;
    }
    Some(token)
}
