//! Cookie helper for httpOnly session authentication.
//!
//! The admin dashboard authenticates with a single httpOnly cookie carrying
//! the signed session token.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::config::CookieConfig;

/// Builds, reads, and clears the session cookie.
#[derive(Debug, Clone)]
pub struct CookieHelper {
    config: CookieConfig,
    /// Session expiry in seconds (from JWT config), used as cookie Max-Age
    session_expiry_secs: i64,
}

impl CookieHelper {
    /// Create a new cookie helper with configuration.
    pub fn new(config: CookieConfig, session_expiry_secs: i64) -> Self {
        Self {
            config,
            session_expiry_secs,
        }
    }

    /// Build a Set-Cookie header value for the session token.
    pub fn build_session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly",
            self.config.name, token, self.session_expiry_secs
        );

        if self.config.secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str(&format!("; SameSite={}", self.config.same_site));

        if !self.config.domain.is_empty() {
            cookie.push_str(&format!("; Domain={}", self.config.domain));
        }

        cookie
    }

    /// Build a Set-Cookie header that clears the session cookie (logout).
    pub fn build_clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly",
            self.config.name
        );

        if self.config.secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str(&format!("; SameSite={}", self.config.same_site));

        if !self.config.domain.is_empty() {
            cookie.push_str(&format!("; Domain={}", self.config.domain));
        }

        cookie
    }

    /// Append the session cookie to a response HeaderMap.
    pub fn add_session_cookie(&self, headers: &mut HeaderMap, token: &str) {
        if let Ok(value) = HeaderValue::from_str(&self.build_session_cookie(token)) {
            headers.append(SET_COOKIE, value);
        }
    }

    /// Append the clearing cookie to a response HeaderMap.
    pub fn add_clear_cookie(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.build_clear_cookie()) {
            headers.append(SET_COOKIE, value);
        }
    }

    /// Extract the session token value from request headers.
    pub fn extract_session_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get(axum::http::header::COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|cookie_header| {
                cookie_header
                    .split(';')
                    .map(|s| s.trim())
                    .find_map(|cookie| {
                        let (name, value) = cookie.split_once('=')?;
                        (name == self.config.name).then_some(value)
                    })
            })
    }
}
