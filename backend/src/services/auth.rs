use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::models::User;
use crate::db::{CalendarTokenRepository, UserRepository, UserSettingsRepository};
use crate::error::{AppError, AppResult};
use crate::services::google::{GOOGLE_AUTH_URL, GOOGLE_SCOPES};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub csrf_token: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Result of a completed Google sign-in.
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub token_type: &'static str,
    /// Service token expiry, unix seconds.
    pub expires_at: i64,
}

pub struct AuthService;

impl AuthService {
    /// Google consent URL carrying a signed, short-lived state.
    pub fn google_auth_url(state: &AppState) -> AppResult<String> {
        let (client_id, _) = state.config.google.credentials().ok_or_else(|| {
            AppError::ServiceUnavailable("Google sign-in is not configured".to_string())
        })?;
        let oauth_state = Self::generate_oauth_state(state)?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(&state.config.google.redirect_uri),
            urlencoding::encode(&GOOGLE_SCOPES.join(" ")),
            urlencoding::encode(&oauth_state)
        ))
    }

    /// Generate OAuth state JWT (valid for 10 minutes)
    pub fn generate_oauth_state(state: &AppState) -> AppResult<String> {
        let now = Utc::now();
        let claims = OAuthState {
            csrf_token: Self::generate_random_string(32),
            iat: now.timestamp() as usize,
            exp: (now + Duration::minutes(10)).timestamp() as usize,
        };

        let state_jwt = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )?;

        Ok(state_jwt)
    }

    /// Decode and validate OAuth state JWT
    pub fn decode_oauth_state(state: &AppState, state_encoded: &str) -> AppResult<OAuthState> {
        let token_data = decode::<OAuthState>(
            state_encoded,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::warn!("Failed to decode OAuth state: {:?}", e);
            AppError::BadRequest("Invalid or expired OAuth state".to_string())
        })?;
        Ok(token_data.claims)
    }

    /// Create a signed JWT for a user; returns the token and its expiry (unix seconds).
    pub fn create_jwt(state: &AppState, user: &User) -> AppResult<(String, i64)> {
        let now = Utc::now();
        let exp = now + Duration::hours(state.config.jwt.expiration_hours);
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )?;
        Ok((token, exp.timestamp()))
    }

    /// Decode and validate a JWT, returning the claims
    pub fn decode_jwt(state: &AppState, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Resolve the user a bearer token was issued for.
    pub async fn get_user_from_token(state: &AppState, token: &str) -> AppResult<User> {
        let claims = Self::decode_jwt(state, token)?;
        UserRepository::find_by_id(&state.db, &claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Finish the Google OAuth flow: sign the user in and store their
    /// calendar credentials.
    pub async fn handle_google_callback(
        state: &AppState,
        code: &str,
        oauth_state: &str,
    ) -> AppResult<AuthSession> {
        if state.config.google.credentials().is_none() {
            return Err(AppError::ServiceUnavailable(
                "Google sign-in is not configured".to_string(),
            ));
        }
        Self::decode_oauth_state(state, oauth_state)?;

        let tokens = state.google.exchange_code(code).await.map_err(|e| {
            tracing::warn!("Google code exchange failed: {}", e);
            AppError::GoogleApi("Failed to exchange authorization code".to_string())
        })?;

        let expires_at_millis = tokens
            .expires_at_millis(Utc::now().timestamp_millis())
            .ok_or_else(|| {
                AppError::GoogleApi(format!(
                    "Google returned an invalid token lifetime: {}",
                    tokens.expires_in
                ))
            })?;

        let profile = state
            .google
            .get_user_info(&tokens.access_token)
            .await
            .map_err(|e| AppError::GoogleApi(format!("Failed to fetch Google profile: {}", e)))?;

        let name = profile.name.as_deref().unwrap_or(&profile.email);
        let user = UserRepository::upsert_by_google_id(
            &state.db,
            &profile.id,
            &profile.email,
            name,
            profile.picture.as_deref(),
        )
        .await?;

        UserSettingsRepository::ensure_exists(&state.db, &user.id).await?;

        if tokens.refresh_token.is_none() {
            tracing::warn!(
                "Google returned no refresh token for user {}; keeping the stored one",
                user.id
            );
        }
        CalendarTokenRepository::store_connection(
            &state.db,
            &user.id,
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
            expires_at_millis,
        )
        .await?;

        let (access_token, expires_at) = Self::create_jwt(state, &user)?;
        tracing::info!("User {} signed in with Google", user.id);

        Ok(AuthSession {
            user,
            access_token,
            token_type: "Bearer",
            expires_at,
        })
    }

    /// Generate random string
    pub fn generate_random_string(length: usize) -> String {
        use rand::Rng;
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}
