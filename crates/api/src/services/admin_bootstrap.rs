//! Admin bootstrap service for initial setup.
//!
//! Creates the first admin account on startup if configured. Idempotent: an
//! existing account with the bootstrap email is left untouched.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::AdminBootstrapConfig;
use persistence::repositories::UserRepository;
use shared::password::{hash_password, PasswordError};

/// Error types for admin bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] PasswordError),
}

/// Bootstrap the first admin account if configured.
///
/// Called after migrations on startup.
pub async fn bootstrap_admin(
    pool: &PgPool,
    config: &AdminBootstrapConfig,
) -> Result<(), BootstrapError> {
    if config.bootstrap_email.is_empty() {
        return Ok(());
    }

    if config.bootstrap_password.is_empty() {
        warn!(
            "ER__ADMIN__BOOTSTRAP_EMAIL is set but ER__ADMIN__BOOTSTRAP_PASSWORD is empty - skipping bootstrap"
        );
        return Ok(());
    }

    let users = UserRepository::new(pool.clone());

    if users.find_by_email(&config.bootstrap_email).await?.is_some() {
        info!(
            email = %config.bootstrap_email,
            "Bootstrap admin already exists, skipping"
        );
        return Ok(());
    }

    let password_hash = hash_password(&config.bootstrap_password)?;
    let name = (!config.bootstrap_name.is_empty()).then_some(config.bootstrap_name.as_str());

    let user = users
        .create_admin(&config.bootstrap_email, name, &password_hash)
        .await?;

    info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");

    Ok(())
}
