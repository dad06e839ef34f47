//! Session token utilities using RS256 JWTs.
//!
//! The admin dashboard and participant flows authenticate with a single
//! signed session token carried in an httpOnly cookie. Claims embed the
//! user's id, email, and admin flag so route handlers can gate privileged
//! operations without a database round trip.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for token operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User email, embedded so handlers can attribute actions without a lookup
    pub email: String,
    /// Admin flag gating privileged operations
    pub is_admin: bool,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token identifier
    pub jti: String,
}

/// Configuration for session token generation and validation.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Session token expiration in seconds (default: 86400 = 24 hours)
    pub session_expiry_secs: i64,
    /// Leeway in seconds for clock skew tolerance
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("session_expiry_secs", &self.session_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtConfig {
    /// Creates a new JwtConfig from an RSA key pair in PEM format.
    pub fn new(
        private_key_pem: &str,
        public_key_pem: &str,
        session_expiry_secs: i64,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid private key: {}", e)))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            session_expiry_secs,
            leeway_secs,
        })
    }

    /// Creates a JwtConfig for testing with an HS256 symmetric key.
    /// DO NOT use in production - only for tests.
    #[cfg(test)]
    pub fn new_for_testing(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_expiry_secs: 86400,
            leeway_secs: 0,
        }
    }

    /// Generates a session token for the given user.
    ///
    /// Returns the encoded token and its `jti`.
    pub fn generate_session_token(
        &self,
        user_id: Uuid,
        email: &str,
        is_admin: bool,
    ) -> Result<(String, String), JwtError> {
        let now = Utc::now();
        let jti = Uuid::new_v4().to_string();
        let exp = (now + Duration::seconds(self.session_expiry_secs)).timestamp();

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            is_admin,
            exp,
            iat: now.timestamp(),
            jti: jti.clone(),
        };

        let header = Header::new(self.algorithm());
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok((token, jti))
    }

    /// Validates a session token and returns its claims.
    pub fn validate_session_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm());
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Tests use HS256, production uses RS256.
    fn algorithm(&self) -> Algorithm {
        #[cfg(test)]
        {
            Algorithm::HS256
        }
        #[cfg(not(test))]
        {
            Algorithm::RS256
        }
    }
}

/// Extracts the user ID from validated claims.
pub fn extract_user_id(claims: &Claims) -> Result<Uuid, JwtError> {
    Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration as StdDuration;

    fn create_test_config() -> JwtConfig {
        JwtConfig::new_for_testing("session_token_test_secret_0451")
    }

    #[test]
    fn test_generate_session_token() {
        let config = create_test_config();
        let user_id = Uuid::new_v4();

        let (token, jti) = config
            .generate_session_token(user_id, "admin@fest.example", true)
            .unwrap();

        assert!(!token.is_empty());
        assert!(!jti.is_empty());
        assert!(token.contains('.'), "JWT should have dots separating parts");
    }

    #[test]
    fn test_validate_session_token_roundtrip() {
        let config = create_test_config();
        let user_id = Uuid::new_v4();

        let (token, jti) = config
            .generate_session_token(user_id, "lead@college.example", false)
            .unwrap();
        let claims = config.validate_session_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "lead@college.example");
        assert!(!claims.is_admin);
        assert_eq!(claims.jti, jti);
    }

    #[test]
    fn test_admin_flag_survives_roundtrip() {
        let config = create_test_config();
        let (token, _) = config
            .generate_session_token(Uuid::new_v4(), "admin@fest.example", true)
            .unwrap();
        let claims = config.validate_session_token(&token).unwrap();
        assert!(claims.is_admin);
    }

    #[test]
    fn test_expired_token() {
        let mut config = create_test_config();
        config.session_expiry_secs = 1;
        let (token, _) = config
            .generate_session_token(Uuid::new_v4(), "x@y.example", false)
            .unwrap();

        sleep(StdDuration::from_secs(2));

        let result = config.validate_session_token(&token);
        assert!(
            matches!(result, Err(JwtError::TokenExpired)),
            "Expected TokenExpired, got: {:?}",
            result
        );
    }

    #[test]
    fn test_invalid_token() {
        let config = create_test_config();
        let result = config.validate_session_token("invalid.token.here");
        assert!(matches!(
            result,
            Err(JwtError::InvalidToken) | Err(JwtError::DecodingError(_))
        ));
    }

    #[test]
    fn test_malformed_token() {
        let config = create_test_config();
        assert!(config.validate_session_token("not_a_jwt").is_err());
    }

    #[test]
    fn test_extract_user_id() {
        let config = create_test_config();
        let user_id = Uuid::new_v4();

        let (token, _) = config
            .generate_session_token(user_id, "x@y.example", false)
            .unwrap();
        let claims = config.validate_session_token(&token).unwrap();

        assert_eq!(extract_user_id(&claims).unwrap(), user_id);
    }

    #[test]
    fn test_unique_jti_per_token() {
        let config = create_test_config();
        let user_id = Uuid::new_v4();

        let (_, jti1) = config
            .generate_session_token(user_id, "x@y.example", false)
            .unwrap();
        let (_, jti2) = config
            .generate_session_token(user_id, "x@y.example", false)
            .unwrap();

        assert_ne!(jti1, jti2);
    }

    #[test]
    fn test_claims_timestamps() {
        let config = create_test_config();

        let before = Utc::now().timestamp();
        let (token, _) = config
            .generate_session_token(Uuid::new_v4(), "x@y.example", false)
            .unwrap();
        let after = Utc::now().timestamp();

        let claims = config.validate_session_token(&token).unwrap();

        assert!(claims.iat >= before && claims.iat <= after);
        assert_eq!(claims.exp - claims.iat, config.session_expiry_secs);
    }
}
