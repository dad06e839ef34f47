//! Authentication service: Google OAuth, admin password login, OTP
//! verification, and admin-flag management.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GoogleConfig;
use domain::models::User;
use persistence::repositories::{GoogleProfile, UserRepository};
use shared::crypto::{random_hex, random_otp};
use shared::jwt::{JwtConfig, JwtError};
use shared::password::{verify_password, PasswordError};

/// Minutes an admin login OTP stays valid.
const OTP_EXPIRY_MINUTES: i64 = 5;

/// Scopes requested from Google.
const GOOGLE_OAUTH_SCOPES: &str =
    "https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/userinfo.profile";

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Cannot change your own admin access")]
    SelfToggle,

    #[error("Invalid OAuth state parameter")]
    InvalidState,

    #[error("Invalid or expired verification code")]
    InvalidOtp,

    #[error("OAuth provider error: {0}")]
    OAuthProvider(String),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Opaque state carried through the OAuth redirect.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthState {
    random: String,
    is_admin: bool,
    origin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

/// A successful login: the user and their session token.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub token: String,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    jwt: Arc<JwtConfig>,
    google: Arc<GoogleConfig>,
    client: reqwest::Client,
}

impl AuthService {
    /// Creates the service with its own HTTP client for Google calls.
    pub fn new(pool: PgPool, jwt: Arc<JwtConfig>, google: GoogleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(google.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            users: UserRepository::new(pool),
            jwt,
            google: Arc::new(google),
            client,
        }
    }

    /// Repository accessor for admin user routes.
    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Builds the Google consent URL. Logins originating from the admin
    /// dashboard are tagged admin in the state parameter.
    pub fn google_auth_url(&self, origin: Option<&str>) -> Result<String, AuthError> {
        if self.google.client_id.is_empty() {
            return Err(AuthError::OAuthProvider(
                "Google client ID is not configured".to_string(),
            ));
        }

        let is_admin_request = origin
            .map(|o| o == self.google.admin_dashboard_url)
            .unwrap_or(false);

        let state = OAuthState {
            random: random_hex(16),
            is_admin: is_admin_request,
            origin: origin.map(|s| s.to_string()),
        };
        let encoded_state = BASE64.encode(
            serde_json::to_vec(&state)
                .map_err(|e| AuthError::OAuthProvider(format!("State encoding failed: {}", e)))?,
        );

        let url = reqwest::Url::parse_with_params(
            &self.google.oauth_url,
            &[
                ("client_id", self.google.client_id.as_str()),
                ("redirect_uri", &self.callback_url()),
                ("response_type", "code"),
                ("scope", GOOGLE_OAUTH_SCOPES),
                ("access_type", "offline"),
                ("state", &encoded_state),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::OAuthProvider(format!("Invalid OAuth URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Handles the OAuth callback: exchanges the code, fetches the profile,
    /// upserts the user, and issues a session token.
    pub async fn handle_google_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<LoginResult, AuthError> {
        let state = self.decode_state(state)?;

        let tokens = self.exchange_code(code).await?;
        let profile = self.fetch_userinfo(&tokens.access_token).await?;

        let token_expires_at = tokens
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));

        let user = self
            .users
            .upsert_google_user(
                &GoogleProfile {
                    email: &profile.email,
                    name: profile.name.as_deref(),
                    google_id: &profile.sub,
                    profile_picture: profile.picture.as_deref(),
                    access_token: &tokens.access_token,
                    refresh_token: tokens.refresh_token.as_deref(),
                    token_expires_at,
                },
                state.is_admin,
            )
            .await?;

        info!(user_id = %user.id, email = %user.email, "Google login");

        let (token, _jti) =
            self.jwt
                .generate_session_token(user.id, &user.email, user.is_admin)?;

        Ok(LoginResult {
            user: user.into(),
            token,
        })
    }

    /// Password login for admin accounts.
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let user = self
            .users
            .find_admin_by_email(email)
            .await?
            .ok_or_else(|| {
                warn!(email = %email, "Admin login attempt for unknown or non-admin account");
                AuthError::InvalidCredentials
            })?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.users.update_last_login(user.id).await?;

        let (token, _jti) =
            self.jwt
                .generate_session_token(user.id, &user.email, user.is_admin)?;

        info!(user_id = %user.id, "Admin login");

        Ok(LoginResult {
            user: user.into(),
            token,
        })
    }

    /// Issues a fresh login OTP for a user and returns the code for the
    /// caller to dispatch.
    pub async fn issue_otp(&self, user_id: Uuid) -> Result<(User, String), AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let code = random_otp(6);
        let expires_at = Utc::now() + ChronoDuration::minutes(OTP_EXPIRY_MINUTES);
        self.users
            .set_verification_code(user.id, &code, expires_at)
            .await?;

        Ok((user.into(), code))
    }

    /// Consumes a login OTP; on success, issues a session token.
    ///
    /// Expired codes and exhausted attempt budgets both fail; every failed
    /// attempt increments the counter.
    pub async fn verify_otp(&self, user_id: Uuid, code: &str) -> Result<LoginResult, AuthError> {
        let user = self
            .users
            .consume_verification_code(user_id, code)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        let (token, _jti) =
            self.jwt
                .generate_session_token(user.id, &user.email, user.is_admin)?;

        Ok(LoginResult {
            user: user.into(),
            token,
        })
    }

    /// Flips the admin flag on the target user. Self-toggles are forbidden;
    /// a caller can never grant or revoke their own access.
    pub async fn toggle_admin(&self, actor_id: Uuid, target_id: Uuid) -> Result<User, AuthError> {
        if actor_id == target_id {
            return Err(AuthError::SelfToggle);
        }

        let user = self
            .users
            .toggle_admin(target_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(
            actor = %actor_id,
            target = %target_id,
            is_admin = user.is_admin,
            "Admin flag toggled"
        );

        Ok(user.into())
    }

    /// Fetches the caller's profile.
    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(user.into())
    }

    fn callback_url(&self) -> String {
        format!("{}/api/v1/auth/google/callback", self.google.backend_url)
    }

    fn decode_state(&self, state: &str) -> Result<OAuthState, AuthError> {
        let bytes = BASE64.decode(state).map_err(|_| AuthError::InvalidState)?;
        serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidState)
    }

    async fn exchange_code(&self, code: &str) -> Result<GoogleTokenResponse, AuthError> {
        let response = self
            .client
            .post(&self.google.token_url)
            .form(&[
                ("code", code),
                ("client_id", &self.google.client_id),
                ("client_secret", &self.google.client_secret),
                ("redirect_uri", &self.callback_url()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::OAuthProvider(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::OAuthProvider(format!(
                "Failed to exchange auth code: {}",
                body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::OAuthProvider(format!("Invalid token response: {}", e)))
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo, AuthError> {
        let response = self
            .client
            .get(&self.google.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::OAuthProvider(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::OAuthProvider(
                "Failed to get user info".to_string(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::OAuthProvider(format!("Invalid userinfo response: {}", e)))
    }
}
