//! Payment routes: initiation, provider callbacks, and status checks.
//!
//! Browser-facing callback flows degrade to a redirect with an error flag in
//! the query string instead of a JSON error.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{PaymentTransaction, TransactionStatus};

/// Request body for payment initiation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub amount: f64,
    pub registration_id: Uuid,
}

/// Envelope for a payment initiation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub transaction_id: String,
    pub payment_url: String,
}

/// POST /api/v1/payment/initiate
pub async fn initiate(
    State(state): State<AppState>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>, ApiError> {
    let initiation = state
        .payments
        .create_payment(request.amount, Some(request.registration_id), None)
        .await?;

    Ok(Json(InitiatePaymentResponse {
        success: true,
        transaction_id: initiation.transaction_id,
        payment_url: initiation.payment_url,
    }))
}

/// Request body for test payment initiation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateTestPaymentRequest {
    pub amount: f64,
    pub registration_id: Option<Uuid>,
}

/// POST /api/v1/payment/initiate-test
pub async fn initiate_test(
    State(state): State<AppState>,
    Json(request): Json<InitiateTestPaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>, ApiError> {
    let initiation = state
        .payments
        .create_test_payment(request.amount, request.registration_id, None)
        .await?;

    Ok(Json(InitiatePaymentResponse {
        success: true,
        transaction_id: initiation.transaction_id,
        payment_url: initiation.payment_url,
    }))
}

/// Query parameters of the provider's browser redirect.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuery {
    pub txn_id: Option<String>,
}

/// Envelope for a processed callback.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub status: TransactionStatus,
    pub message: String,
}

/// GET /api/v1/payment/verify?txnId=... — browser redirect after checkout.
pub async fn verify_redirect(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Redirect {
    match query.txn_id {
        Some(transaction_id) => redirect_by_status(&state, &transaction_id).await,
        None => Redirect::temporary(&format!(
            "{}?error=verification_failed",
            state.payments.redirect_for(false)
        )),
    }
}

/// GET /api/v1/payment/verify/:transaction_id — browser redirect after checkout.
pub async fn verify_redirect_path(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Redirect {
    redirect_by_status(&state, &transaction_id).await
}

async fn redirect_by_status(state: &AppState, transaction_id: &str) -> Redirect {
    match state.payments.get_status(transaction_id).await {
        Ok(transaction) => {
            let completed = transaction.status == TransactionStatus::Completed.as_str();
            Redirect::temporary(&format!(
                "{}?id={}",
                state.payments.redirect_for(completed),
                transaction_id
            ))
        }
        Err(e) => {
            tracing::error!(transaction_id = %transaction_id, error = %e, "Payment redirect lookup failed");
            Redirect::temporary(&format!(
                "{}?error=verification_failed",
                state.payments.redirect_for(false)
            ))
        }
    }
}

/// POST /api/v1/payment/verify?txnId=... — server-to-server callback.
pub async fn verify_callback_query(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let transaction_id = query
        .txn_id
        .ok_or_else(|| ApiError::Validation("Transaction ID is required".to_string()))?;

    process_callback(&state, &transaction_id, payload).await
}

/// POST /api/v1/payment/verify/:transaction_id — server-to-server callback.
pub async fn verify_callback(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<VerifyResponse>, ApiError> {
    process_callback(&state, &transaction_id, payload).await
}

async fn process_callback(
    state: &AppState,
    transaction_id: &str,
    payload: serde_json::Value,
) -> Result<Json<VerifyResponse>, ApiError> {
    tracing::info!(transaction_id = %transaction_id, "Payment callback received");

    let outcome = state
        .payments
        .verify_callback(transaction_id, payload)
        .await?;

    let transaction: PaymentTransaction = outcome.transaction.into();
    let message = if outcome.applied {
        "Payment verification completed".to_string()
    } else {
        "Payment already verified".to_string()
    };

    Ok(Json(VerifyResponse {
        success: true,
        status: transaction.status,
        message,
    }))
}

/// Envelope for a test payment verification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTestResponse {
    pub success: bool,
    pub status: TransactionStatus,
    pub transaction_id: String,
}

/// POST /api/v1/payment/test/verify/:transaction_id
pub async fn verify_test(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<VerifyTestResponse>, ApiError> {
    let transaction = state.payments.verify_test_payment(&transaction_id).await?;
    let transaction: PaymentTransaction = transaction.into();

    Ok(Json(VerifyTestResponse {
        success: true,
        status: transaction.status,
        transaction_id: transaction.transaction_id,
    }))
}

/// Envelope for a stored transaction snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub transaction: PaymentTransaction,
}

/// GET /api/v1/payment/status/:transaction_id
pub async fn status(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let transaction = state.payments.get_status(&transaction_id).await?;

    Ok(Json(StatusResponse {
        success: true,
        transaction: transaction.into(),
    }))
}

/// Envelope for a live provider status check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatusResponse {
    pub success: bool,
    pub data: serde_json::Value,
}

/// GET /api/v1/payment/status/:transaction_id/live
pub async fn status_live(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<LiveStatusResponse>, ApiError> {
    let data = state.payments.poll_provider_status(&transaction_id).await?;

    Ok(Json(LiveStatusResponse {
        success: true,
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_query_accepts_txn_id() {
        let query: VerifyQuery = serde_json::from_value(serde_json::json!({
            "txnId": "abc123"
        }))
        .unwrap();
        assert_eq!(query.txn_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_initiate_request_shape() {
        let request: InitiatePaymentRequest = serde_json::from_value(serde_json::json!({
            "amount": 200.0,
            "registrationId": Uuid::new_v4()
        }))
        .unwrap();
        assert_eq!(request.amount, 200.0);
    }
}
