use chrono::Utc;
use tracing::{debug, warn};

use crate::db::CalendarTokenRepository;
use crate::services::calendar::{CalendarError, CalendarResult};
use crate::AppState;

/// Hands out Google access tokens for calendar calls, refreshing the cached
/// one through the OAuth token endpoint once it has expired.
pub struct CalendarTokenService;

impl CalendarTokenService {
    /// A currently valid access token for `user_id`.
    ///
    /// - no refresh token on file: `NotConnected`
    /// - cached token still valid: returned without any network call
    /// - otherwise: one refresh; the new token and expiry are persisted. On
    ///   failure nothing is written and `RefreshFailed` is returned.
    pub async fn valid_access_token(state: &AppState, user_id: &str) -> CalendarResult<String> {
        let tokens = CalendarTokenRepository::find(&state.db, user_id)
            .await?
            .unwrap_or_default();

        let Some(refresh_token) = tokens.refresh_token.as_deref() else {
            return Err(CalendarError::NotConnected);
        };

        let now_millis = Utc::now().timestamp_millis();
        if let Some(access_token) = tokens.cached_access_token(now_millis) {
            return Ok(access_token.to_string());
        }

        debug!("Refreshing Google access token for user {}", user_id);

        let response = state
            .google
            .refresh_access_token(refresh_token)
            .await
            .map_err(|e| {
                warn!("Google token refresh failed for user {}: {}", user_id, e);
                CalendarError::RefreshFailed(e.to_string())
            })?;

        let expires_at_millis = response.expires_at_millis(now_millis).ok_or_else(|| {
            warn!(
                "Google returned an unusable expires_in ({}) for user {}",
                response.expires_in, user_id
            );
            CalendarError::RefreshFailed(format!("invalid expires_in: {}", response.expires_in))
        })?;
        CalendarTokenRepository::update_access_token(
            &state.db,
            user_id,
            &response.access_token,
            expires_at_millis,
            response.refresh_token.as_deref(),
        )
        .await?;

        Ok(response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;
    use crate::services::testing::*;

    #[tokio::test]
    async fn missing_refresh_token_is_not_connected() {
        let google = Arc::new(FakeGoogle::default());
        let state = test_state(google.clone()).await;
        let user = seed_user(&state, "g-1").await;

        let err = CalendarTokenService::valid_access_token(&state, &user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CalendarError::NotConnected));
        assert_eq!(google.total_calls(), 0);
    }

    #[tokio::test]
    async fn cached_token_is_reused_without_refresh() {
        let google = Arc::new(FakeGoogle::default());
        let state = test_state(google.clone()).await;
        let user = seed_user(&state, "g-1").await;
        let in_an_hour = Utc::now().timestamp_millis() + 3_600_000;
        connect_calendar(&state, &user.id, in_an_hour).await;

        for _ in 0..3 {
            let token = CalendarTokenService::valid_access_token(&state, &user.id)
                .await
                .unwrap();
            assert_eq!(token, "cached-access");
        }
        assert_eq!(FakeGoogle::count(&google.refresh_calls), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once_and_persisted() {
        let google = Arc::new(FakeGoogle::default());
        let state = test_state(google.clone()).await;
        let user = seed_user(&state, "g-1").await;
        let before = Utc::now().timestamp_millis();
        connect_calendar(&state, &user.id, before - 1).await;

        let token = CalendarTokenService::valid_access_token(&state, &user.id)
            .await
            .unwrap();
        assert_eq!(token, "refreshed-access-1");
        assert_eq!(FakeGoogle::count(&google.refresh_calls), 1);

        let stored = CalendarTokenRepository::find(&state.db, &user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("refreshed-access-1"));
        assert_eq!(stored.refresh_token.as_deref(), Some("stored-refresh"));
        let expires = stored.expires_at_millis.unwrap();
        assert!(expires >= before + 3_600_000);

        // The refreshed token is now cached.
        CalendarTokenService::valid_access_token(&state, &user.id)
            .await
            .unwrap();
        assert_eq!(FakeGoogle::count(&google.refresh_calls), 1);
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_stored() {
        let google = Arc::new(FakeGoogle::default());
        *google.rotated_refresh_token.lock().unwrap() = Some("rotated".to_string());
        let state = test_state(google.clone()).await;
        let user = seed_user(&state, "g-1").await;
        connect_calendar(&state, &user.id, 0).await;

        CalendarTokenService::valid_access_token(&state, &user.id)
            .await
            .unwrap();

        let stored = CalendarTokenRepository::find(&state.db, &user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn failed_refresh_leaves_store_untouched() {
        let google = Arc::new(FakeGoogle::default());
        google.fail_refresh.store(true, Ordering::SeqCst);
        let state = test_state(google.clone()).await;
        let user = seed_user(&state, "g-1").await;
        connect_calendar(&state, &user.id, 1_000).await;

        let err = CalendarTokenService::valid_access_token(&state, &user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CalendarError::RefreshFailed(_)));

        let stored = CalendarTokenRepository::find(&state.db, &user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("cached-access"));
        assert_eq!(stored.expires_at_millis, Some(1_000));
    }

    #[tokio::test]
    async fn oversized_token_lifetime_fails_without_writing() {
        let google = Arc::new(FakeGoogle::default());
        *google.expires_in.lock().unwrap() = Some(i64::MAX);
        let state = test_state(google.clone()).await;
        let user = seed_user(&state, "g-1").await;
        connect_calendar(&state, &user.id, 1_000).await;

        let err = CalendarTokenService::valid_access_token(&state, &user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CalendarError::RefreshFailed(_)));
        assert_eq!(FakeGoogle::count(&google.refresh_calls), 1);

        let stored = CalendarTokenRepository::find(&state.db, &user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("cached-access"));
        assert_eq!(stored.expires_at_millis, Some(1_000));
    }
}
