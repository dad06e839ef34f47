//! User (authenticated principal) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated principal. Admin accounts log in with a password or
/// Google OAuth; `is_admin` gates every privileged operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
    #[serde(skip_serializing)] // Never serialize the password hash to API responses
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    pub verification_code_expires_at: Option<DateTime<Utc>>,
    pub verification_attempts: i32,
    pub is_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "admin@fest.example".to_string(),
            name: Some("Admin".to_string()),
            is_admin: true,
            password_hash: Some("$argon2id$secret".to_string()),
            google_id: None,
            profile_picture: None,
            access_token: Some("ya29.token".to_string()),
            refresh_token: Some("1//refresh".to_string()),
            token_expires_at: None,
            verification_code: Some("123456".to_string()),
            verification_code_expires_at: None,
            verification_attempts: 0,
            is_verified: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("ya29"));
        assert!(!json.contains("123456"));
        assert!(json.contains("admin@fest.example"));
    }
}
