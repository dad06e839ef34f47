//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

const USER_COLUMNS: &str = r#"id, email, name, is_admin, password_hash, google_id, profile_picture,
       access_token, refresh_token, token_expires_at, verification_code,
       verification_code_expires_at, verification_attempts, is_verified,
       last_login_at, created_at, updated_at"#;

/// OAuth profile fields used for the Google upsert.
#[derive(Debug, Clone)]
pub struct GoogleProfile<'a> {
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub google_id: &'a str,
    pub profile_picture: Option<&'a str>,
    pub access_token: &'a str,
    pub refresh_token: Option<&'a str>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Repository for user-related database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new UserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a user by email address (lowercased).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find an admin user by email address.
    pub async fn find_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_admin_by_email");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1) AND is_admin = true"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Upserts a user from a Google OAuth profile, keyed on email.
    ///
    /// An existing row keeps its admin flag; a fresh row takes `is_admin`
    /// from the caller (true only for admin-dashboard logins).
    pub async fn upsert_google_user(
        &self,
        profile: &GoogleProfile<'_>,
        is_admin: bool,
    ) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_google_user");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (email, name, google_id, profile_picture, access_token,
                               refresh_token, token_expires_at, is_admin, last_login_at)
            VALUES (LOWER($1), $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                google_id = EXCLUDED.google_id,
                profile_picture = EXCLUDED.profile_picture,
                access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, users.refresh_token),
                token_expires_at = EXCLUDED.token_expires_at,
                last_login_at = NOW(),
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(profile.email)
        .bind(profile.name)
        .bind(profile.google_id)
        .bind(profile.profile_picture)
        .bind(profile.access_token)
        .bind(profile.refresh_token)
        .bind(profile.token_expires_at)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Creates a password-based admin account (startup bootstrap).
    pub async fn create_admin(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_admin_user");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, is_admin, is_verified)
            VALUES (LOWER($1), $2, $3, true, true)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Flips a user's admin flag. Returns `None` when the user is missing.
    pub async fn toggle_admin(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("toggle_admin");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            UPDATE users
            SET is_admin = NOT is_admin, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Stores a fresh OTP on the user row and resets the attempt counter.
    pub async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("set_verification_code");
        sqlx::query(
            r#"
            UPDATE users
            SET verification_code = $2,
                verification_code_expires_at = $3,
                verification_attempts = 0,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    /// Consumes an OTP: on match, marks the user verified and clears the
    /// code; on mismatch, bumps the attempt counter. Returns the user only
    /// on success.
    pub async fn consume_verification_code(
        &self,
        id: Uuid,
        code: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("consume_verification_code");
        let verified = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            UPDATE users
            SET is_verified = true,
                verification_code = NULL,
                verification_code_expires_at = NULL,
                verification_attempts = 0,
                updated_at = NOW()
            WHERE id = $1
              AND verification_code = $2
              AND verification_code_expires_at > NOW()
              AND verification_attempts < 3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        if verified.is_none() {
            sqlx::query(
                r#"
                UPDATE users
                SET verification_attempts = verification_attempts + 1, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        timer.record();
        Ok(verified)
    }

    /// Update the user's last login timestamp.
    pub async fn update_last_login(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_user_last_login");
        sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(())
    }

    /// List all users, newest first.
    pub async fn list(&self) -> Result<Vec<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_users");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    // UserRepository queries require a database connection and are covered
    // by the integration tests in crates/api/tests.
}
