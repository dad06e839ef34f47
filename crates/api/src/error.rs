use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error taxonomy. Every variant maps to one HTTP status and renders as
/// the standard `{"success": false, "message": ...}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON envelope for error responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Delivery(msg) => {
                tracing::error!("Delivery error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        "23514" => ApiError::Validation("Value violates a data constraint".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .collect();

        let message = if messages.len() == 1 {
            messages.into_iter().next().unwrap_or_default()
        } else {
            format!("{} validation errors", messages.len())
        };

        ApiError::Validation(message)
    }
}

impl From<validator::ValidationError> for ApiError {
    fn from(error: validator::ValidationError) -> Self {
        let message = error
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "Invalid input".to_string());
        ApiError::Validation(message)
    }
}

impl From<crate::services::registration::WorkflowError> for ApiError {
    fn from(err: crate::services::registration::WorkflowError) -> Self {
        use crate::services::registration::WorkflowError;
        match err {
            WorkflowError::Validation(msg) => ApiError::Validation(msg),
            WorkflowError::NotFound(msg) => ApiError::NotFound(msg),
            WorkflowError::Conflict(msg) => ApiError::Conflict(msg),
            WorkflowError::Delivery(msg) => ApiError::Delivery(msg),
            WorkflowError::Database(e) => e.into(),
        }
    }
}

impl From<crate::services::email::EmailError> for ApiError {
    fn from(err: crate::services::email::EmailError) -> Self {
        use crate::services::email::EmailError;
        match err {
            EmailError::TemplateNotFound(name) => {
                ApiError::NotFound(format!("Email template not found: {}", name))
            }
            EmailError::Database(e) => e.into(),
            other => ApiError::Delivery(other.to_string()),
        }
    }
}

impl From<crate::services::payment::PaymentError> for ApiError {
    fn from(err: crate::services::payment::PaymentError) -> Self {
        use crate::services::payment::PaymentError;
        match err {
            PaymentError::InvalidAmount => {
                ApiError::Validation("Invalid payment amount".to_string())
            }
            PaymentError::NotFound => ApiError::NotFound("Transaction not found".to_string()),
            PaymentError::Provider(msg) => ApiError::Delivery(msg),
            PaymentError::Database(e) => e.into(),
        }
    }
}

impl From<crate::services::auth::AuthError> for ApiError {
    fn from(err: crate::services::auth::AuthError) -> Self {
        use crate::services::auth::AuthError;
        match err {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials or not an admin user".to_string())
            }
            AuthError::InvalidOtp => {
                ApiError::Unauthorized("Invalid or expired verification code".to_string())
            }
            AuthError::SelfToggle => {
                ApiError::Forbidden("Cannot change your own admin access".to_string())
            }
            AuthError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AuthError::InvalidState => {
                ApiError::Validation("Invalid OAuth state parameter".to_string())
            }
            AuthError::OAuthProvider(msg) => ApiError::Delivery(msg),
            AuthError::Token(e) => ApiError::Internal(format!("Token error: {}", e)),
            AuthError::Password(e) => ApiError::Internal(format!("Password error: {}", e)),
            AuthError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_validation_maps_to_400() {
        let response = ApiError::Validation("bad input".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let response = ApiError::Unauthorized("no token".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        let response = ApiError::Forbidden("not admin".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError::NotFound("missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let response = ApiError::Conflict("duplicate".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_delivery_and_internal_map_to_500() {
        let response = ApiError::Delivery("smtp down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, ApiError::NotFound(_)));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            format!("{}", ApiError::Validation("x".to_string())),
            "Validation error: x"
        );
        assert_eq!(
            format!("{}", ApiError::Forbidden("x".to_string())),
            "Forbidden: x"
        );
    }

    #[test]
    fn test_from_validation_error_uses_message() {
        let mut err = validator::ValidationError::new("phone_digits");
        err.message = Some("Phone number must contain at least 10 digits".into());
        let api: ApiError = err.into();
        match api {
            ApiError::Validation(msg) => {
                assert_eq!(msg, "Phone number must contain at least 10 digits")
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
    }
}
