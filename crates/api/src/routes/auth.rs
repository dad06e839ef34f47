//! Authentication routes: Google OAuth, admin password login, OTP
//! verification, session introspection, logout.
//!
//! The OAuth callback is a browser flow: every failure redirects to the
//! admin dashboard with an error flag instead of returning JSON.

use axum::{
    extract::{Query, State},
    http::{header::ORIGIN, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use domain::models::User;

/// Minimal user view for auth responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_admin: user.is_admin,
        }
    }
}

/// Envelope carrying the consent URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthResponse {
    pub success: bool,
    pub url: String,
}

/// GET /api/v1/auth/google
///
/// Returns the Google consent URL. The request's Origin header decides
/// whether this is an admin-dashboard login.
pub async fn google_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GoogleAuthResponse>, ApiError> {
    let origin = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| {
            let dashboard = &state.config.google.admin_dashboard_url;
            (!dashboard.is_empty()).then(|| dashboard.clone())
        });

    let url = state.auth.google_auth_url(origin.as_deref())?;

    Ok(Json(GoogleAuthResponse { success: true, url }))
}

/// Query parameters of the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /api/v1/auth/google/callback
///
/// Exchanges the code, upserts the user, sets the session cookie, and
/// redirects back to the dashboard. Failures redirect with `?error=`.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Response {
    let dashboard = state.config.google.admin_dashboard_url.clone();

    let code = match query.code {
        Some(code) => code,
        None => {
            tracing::error!("No code received from Google");
            return Redirect::temporary(&format!("{}?error=no_code", dashboard)).into_response();
        }
    };

    let oauth_state = query.state.unwrap_or_default();

    match state.auth.handle_google_callback(&code, &oauth_state).await {
        Ok(login) => {
            let view = UserView::from(login.user);
            let encoded_user = BASE64.encode(serde_json::to_vec(&view).unwrap_or_default());
            let redirect_url = format!(
                "{}/auth?user={}",
                dashboard,
                urlencode(&encoded_user)
            );

            let mut response = Redirect::temporary(&redirect_url).into_response();
            state
                .cookies
                .add_session_cookie(response.headers_mut(), &login.token);
            response
        }
        Err(e) => {
            tracing::error!("OAuth callback failed: {}", e);
            Redirect::temporary(&format!("{}/login?error={}", dashboard, urlencode(&e.to_string())))
                .into_response()
        }
    }
}

/// Request body for password login.
#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

/// Envelope for a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: UserView,
}

/// POST /api/v1/auth/login
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Response, ApiError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let login = state
        .auth
        .admin_login(request.email.trim(), &request.password)
        .await?;

    let mut response = Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        user: login.user.into(),
    })
    .into_response();

    state
        .cookies
        .add_session_cookie(response.headers_mut(), &login.token);

    Ok(response)
}

/// Request body for requesting a login OTP.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpRequest {
    pub user_id: Uuid,
}

/// Envelope acknowledging an OTP dispatch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/v1/auth/request-otp
pub async fn request_otp(
    State(state): State<AppState>,
    Json(request): Json<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>, ApiError> {
    let (user, code) = state.auth.issue_otp(request.user_id).await?;

    state.email.send_verification_otp(&user.email, &code).await?;

    Ok(Json(RequestOtpResponse {
        success: true,
        message: "Verification code sent".to_string(),
    }))
}

/// Request body for OTP verification.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub user_id: Uuid,
    pub code: String,
}

/// POST /api/v1/auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Response, ApiError> {
    let login = state.auth.verify_otp(request.user_id, &request.code).await?;

    let mut response = Json(LoginResponse {
        success: true,
        message: "Verification successful".to_string(),
        user: login.user.into(),
    })
    .into_response();

    state
        .cookies
        .add_session_cookie(response.headers_mut(), &login.token);

    Ok(response)
}

/// Envelope for the current user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub success: bool,
    pub user: UserView,
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state.auth.current_user(auth.user_id).await?;

    Ok(Json(MeResponse {
        success: true,
        user: user.into(),
    }))
}

/// Plain acknowledgement envelope.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/v1/auth/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = Json(LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
    .into_response();

    state.cookies.add_clear_cookie(response.headers_mut());
    response
}

/// Percent-encodes a query-string value.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
