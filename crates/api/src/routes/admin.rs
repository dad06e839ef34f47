//! Admin user-management routes.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminUser;
use crate::routes::auth::UserView;

/// Envelope for the user listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserView>,
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.auth.users().list().await?;

    Ok(Json(UserListResponse {
        success: true,
        users: users
            .into_iter()
            .map(|entity| UserView::from(domain::models::User::from(entity)))
            .collect(),
    }))
}

/// Envelope for an admin-flag toggle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAdminResponse {
    pub success: bool,
    pub message: String,
    pub user: UserView,
}

/// POST /api/v1/admin/users/:id/toggle-admin
///
/// Self-toggles are rejected with 403; the caller can never change their own
/// admin access.
pub async fn toggle_admin(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(target_id): Path<Uuid>,
) -> Result<Json<ToggleAdminResponse>, ApiError> {
    let user = state.auth.toggle_admin(admin.0.user_id, target_id).await?;

    let message = if user.is_admin {
        "Admin access granted".to_string()
    } else {
        "Admin access revoked".to_string()
    };

    Ok(Json(ToggleAdminResponse {
        success: true,
        message,
        user: user.into(),
    }))
}
