//! Session authentication extractors.
//!
//! [`AuthUser`] resolves the caller's identity from the httpOnly session
//! cookie (or a Bearer header as a fallback for API clients). [`AdminUser`]
//! additionally requires the admin flag and is the gate in front of every
//! privileged route.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use shared::jwt::extract_user_id;

/// Authenticated caller resolved from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Prefer the session cookie; fall back to a Bearer header
        let cookie_token = state.cookies.extract_session_token(&parts.headers);

        let bearer_token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "));

        let token = cookie_token
            .or(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let claims = state
            .jwt
            .validate_session_token(token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        let user_id = extract_user_id(&claims)
            .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            is_admin: claims.is_admin,
        })
    }
}

/// Authenticated caller that must hold the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            tracing::warn!(user_id = %user.user_id, "Access denied: not an admin");
            return Err(ApiError::Forbidden("Admin privileges required".to_string()));
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_user_fields() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            email: "admin@fest.example".to_string(),
            is_admin: true,
        };
        assert!(user.is_admin);
        assert_eq!(user.email, "admin@fest.example");
    }

    #[test]
    fn test_admin_user_wraps_auth_user() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            email: "admin@fest.example".to_string(),
            is_admin: true,
        };
        let admin = AdminUser(user.clone());
        assert_eq!(admin.0.user_id, user.user_id);
    }
}
