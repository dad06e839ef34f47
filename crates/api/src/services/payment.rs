//! Payment gateway adapter.
//!
//! Talks to a PhonePe-style hosted-checkout provider: requests are
//! base64-encoded JSON payloads signed with a SHA-256 checksum over
//! payload + API path + merchant salt key, carried in the `X-VERIFY` header.
//! The adapter never retries provider calls on its own; retries are
//! operator-initiated.

use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::PaymentConfig;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use domain::models::TransactionStatus;
use persistence::entities::TransactionEntity;
use persistence::repositories::{CallbackApply, TransactionRepository};
use shared::crypto::{random_hex, sha256_hex};

/// Provider API path for payment creation, part of the checksum input.
const PAY_PATH: &str = "/pg/v1/pay";

/// Provider result code signalling a successful payment.
const PAYMENT_SUCCESS_CODE: &str = "PAYMENT_SUCCESS";

/// Errors that can occur in the payment adapter.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid payment amount")]
    InvalidAmount,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Transaction not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of initiating a payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiation {
    pub transaction_id: String,
    pub payment_url: String,
}

/// Outcome of a verified callback.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub transaction: TransactionEntity,
    /// False when the callback was a replay of an already-terminal transaction.
    pub applied: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderPayRequest<'a> {
    merchant_id: &'a str,
    merchant_transaction_id: &'a str,
    amount: i64,
    redirect_url: String,
    redirect_mode: &'a str,
    callback_url: String,
    payment_instrument: ProviderInstrument<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderInstrument<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

/// Payment gateway adapter service.
#[derive(Clone)]
pub struct PaymentGateway {
    config: Arc<PaymentConfig>,
    client: reqwest::Client,
    transactions: TransactionRepository,
}

impl PaymentGateway {
    /// Creates the adapter with its own HTTP client (explicit timeout).
    pub fn new(config: PaymentConfig, pool: PgPool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config: Arc::new(config),
            client,
            transactions: TransactionRepository::new(pool),
        }
    }

    /// Initiates a payment with the provider.
    ///
    /// Persists the pending transaction before calling out, so a provider
    /// failure leaves an auditable row with its error recorded.
    pub async fn create_payment(
        &self,
        amount: f64,
        registration_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<PaymentInitiation, PaymentError> {
        let amount_minor = minor_units(amount).ok_or(PaymentError::InvalidAmount)?;
        let transaction_id = random_hex(16);

        self.transactions
            .create(&transaction_id, registration_id, user_id, amount, false)
            .await?;

        let request = ProviderPayRequest {
            merchant_id: &self.config.merchant_id,
            merchant_transaction_id: &transaction_id,
            amount: amount_minor,
            redirect_url: format!("{}?txnId={}", self.config.redirect_url, transaction_id),
            redirect_mode: "REDIRECT",
            callback_url: format!("{}?txnId={}", self.config.callback_url, transaction_id),
            payment_instrument: ProviderInstrument { kind: "PAY_PAGE" },
        };

        let payload = BASE64.encode(
            serde_json::to_vec(&request)
                .map_err(|e| PaymentError::Provider(format!("Payload encoding failed: {}", e)))?,
        );
        let checksum = pay_checksum(&payload, &self.config.merchant_key, self.config.key_index);

        let result = self
            .client
            .post(format!("{}{}", self.config.base_url, PAY_PATH))
            .header("X-VERIFY", checksum)
            .json(&serde_json::json!({ "request": payload }))
            .send()
            .await;

        let payment_url = match result {
            Ok(response) if response.status().is_success() => {
                let body: serde_json::Value = response.json().await.map_err(|e| {
                    PaymentError::Provider(format!("Invalid provider response: {}", e))
                })?;
                body.pointer("/data/instrumentResponse/redirectInfo/url")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        PaymentError::Provider("Provider response missing redirect URL".to_string())
                    })?
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                self.transactions
                    .record_error(&transaction_id, "PROVIDER_REJECTED", &body)
                    .await?;
                return Err(PaymentError::Provider(format!(
                    "Provider returned {}: {}",
                    status, body
                )));
            }
            Err(e) => {
                self.transactions
                    .record_error(&transaction_id, "PROVIDER_UNREACHABLE", &e.to_string())
                    .await?;
                return Err(PaymentError::Provider(format!(
                    "Provider request failed: {}",
                    e
                )));
            }
        };

        info!(transaction_id = %transaction_id, amount = amount, "Payment initiated");

        Ok(PaymentInitiation {
            transaction_id,
            payment_url,
        })
    }

    /// Initiates a test-mode payment pointing at the frontend simulator.
    pub async fn create_test_payment(
        &self,
        amount: f64,
        registration_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<PaymentInitiation, PaymentError> {
        let amount_minor = minor_units(amount).ok_or(PaymentError::InvalidAmount)?;
        let transaction_id = random_hex(16);

        self.transactions
            .create(&transaction_id, registration_id, user_id, amount, true)
            .await?;

        let payment_url = format!(
            "{}/payment/test/simulator?amount={}&id={}",
            self.config.frontend_url, amount_minor, transaction_id
        );

        Ok(PaymentInitiation {
            transaction_id,
            payment_url,
        })
    }

    /// Applies a provider callback. Idempotent per transaction id: replays
    /// of an already-terminal transaction change nothing and are reported
    /// with `applied = false`.
    ///
    /// On an internal failure the transaction's retry counter and last error
    /// are recorded before the error propagates.
    pub async fn verify_callback(
        &self,
        transaction_id: &str,
        payload: serde_json::Value,
    ) -> Result<CallbackOutcome, PaymentError> {
        let code = payload
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let outcome = if code == PAYMENT_SUCCESS_CODE {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Failed
        };
        let provider_reference_id = payload
            .get("providerReferenceId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let apply = self
            .transactions
            .apply_callback(
                transaction_id,
                outcome,
                provider_reference_id.as_deref(),
                (!code.is_empty()).then_some(code.as_str()),
                &payload,
            )
            .await;

        match apply {
            Ok(CallbackApply::Applied(transaction)) => {
                info!(
                    transaction_id = %transaction_id,
                    status = %outcome,
                    "Payment callback applied"
                );
                Ok(CallbackOutcome {
                    transaction,
                    applied: true,
                })
            }
            Ok(CallbackApply::AlreadyProcessed(transaction)) => {
                info!(
                    transaction_id = %transaction_id,
                    status = %transaction.status,
                    "Payment callback replay ignored"
                );
                Ok(CallbackOutcome {
                    transaction,
                    applied: false,
                })
            }
            Ok(CallbackApply::NotFound) => Err(PaymentError::NotFound),
            Err(e) => {
                error!(transaction_id = %transaction_id, error = %e, "Payment verification failed");
                self.transactions
                    .record_error(transaction_id, "CALLBACK_ERROR", &e.to_string())
                    .await?;
                Err(PaymentError::Database(e))
            }
        }
    }

    /// Marks a test-mode transaction completed.
    pub async fn verify_test_payment(
        &self,
        transaction_id: &str,
    ) -> Result<TransactionEntity, PaymentError> {
        self.transactions
            .complete_test(transaction_id)
            .await?
            .ok_or(PaymentError::NotFound)
    }

    /// Stored transaction snapshot.
    pub async fn get_status(
        &self,
        transaction_id: &str,
    ) -> Result<TransactionEntity, PaymentError> {
        self.transactions
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or(PaymentError::NotFound)
    }

    /// Live status check against the provider.
    pub async fn poll_provider_status(
        &self,
        transaction_id: &str,
    ) -> Result<serde_json::Value, PaymentError> {
        let path = format!(
            "/pg/v1/status/{}/{}",
            self.config.merchant_id, transaction_id
        );
        let checksum = status_checksum(&path, &self.config.merchant_key, self.config.key_index);

        let response = self
            .client
            .get(format!("{}{}", self.config.base_url, path))
            .header("X-VERIFY", checksum)
            .header("X-MERCHANT-ID", &self.config.merchant_id)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(format!("Provider request failed: {}", e)))?;

        response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("Invalid provider response: {}", e)))
    }

    /// Success/failure redirect target for browser-facing callback flows.
    pub fn redirect_for(&self, completed: bool) -> &str {
        if completed {
            &self.config.success_url
        } else {
            &self.config.failure_url
        }
    }
}

/// Converts a rupee amount to the smallest currency unit (paise).
fn minor_units(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    Some((amount * 100.0).round() as i64)
}

/// Checksum for payment creation: sha256(payload + path + key) + "###" + index.
fn pay_checksum(payload_b64: &str, merchant_key: &str, key_index: u32) -> String {
    let digest = sha256_hex(&format!("{}{}{}", payload_b64, PAY_PATH, merchant_key));
    format!("{}###{}", digest, key_index)
}

/// Checksum for status polling: sha256(path + key) + "###" + index.
fn status_checksum(path: &str, merchant_key: &str, key_index: u32) -> String {
    let digest = sha256_hex(&format!("{}{}", path, merchant_key));
    format!("{}###{}", digest, key_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units_conversion() {
        assert_eq!(minor_units(200.0), Some(20000));
        assert_eq!(minor_units(99.99), Some(9999));
        assert_eq!(minor_units(0.01), Some(1));
    }

    #[test]
    fn test_minor_units_rejects_invalid() {
        assert_eq!(minor_units(0.0), None);
        assert_eq!(minor_units(-5.0), None);
        assert_eq!(minor_units(f64::NAN), None);
        assert_eq!(minor_units(f64::INFINITY), None);
    }

    #[test]
    fn test_pay_checksum_shape() {
        let checksum = pay_checksum("cGF5bG9hZA==", "salt-key", 1);
        let (digest, index) = checksum.split_once("###").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(index, "1");
    }

    #[test]
    fn test_pay_checksum_matches_manual_digest() {
        let payload = "eyJhIjoxfQ==";
        let expected = format!(
            "{}###3",
            sha256_hex(&format!("{}{}{}", payload, "/pg/v1/pay", "secret"))
        );
        assert_eq!(pay_checksum(payload, "secret", 3), expected);
    }

    #[test]
    fn test_status_checksum_matches_manual_digest() {
        let path = "/pg/v1/status/MID/txn123";
        let expected = format!("{}###1", sha256_hex(&format!("{}{}", path, "secret")));
        assert_eq!(status_checksum(path, "secret", 1), expected);
    }

    #[test]
    fn test_checksum_varies_with_key() {
        assert_ne!(
            pay_checksum("payload", "key-a", 1),
            pay_checksum("payload", "key-b", 1)
        );
    }

    #[test]
    fn test_provider_request_serializes_camel_case() {
        let request = ProviderPayRequest {
            merchant_id: "MID",
            merchant_transaction_id: "txn",
            amount: 20000,
            redirect_url: "https://x/redirect?txnId=txn".to_string(),
            redirect_mode: "REDIRECT",
            callback_url: "https://x/callback?txnId=txn".to_string(),
            payment_instrument: ProviderInstrument { kind: "PAY_PAGE" },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["merchantId"], "MID");
        assert_eq!(json["merchantTransactionId"], "txn");
        assert_eq!(json["amount"], 20000);
        assert_eq!(json["paymentInstrument"]["type"], "PAY_PAGE");
    }
}
