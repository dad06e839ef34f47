//! Payment transaction entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use domain::models::{PaymentTransaction, TransactionStatus};

/// Database row mapping for the transactions table.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionEntity {
    pub id: i64,
    pub transaction_id: String,
    pub registration_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub amount: f64,
    pub status: String,
    pub provider_reference_id: Option<String>,
    pub provider_response: Option<serde_json::Value>,
    pub response_code: Option<String>,
    pub retry_count: i32,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub is_test: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TransactionEntity> for PaymentTransaction {
    fn from(entity: TransactionEntity) -> Self {
        Self {
            transaction_id: entity.transaction_id,
            registration_id: entity.registration_id,
            user_id: entity.user_id,
            amount: entity.amount,
            status: TransactionStatus::from_str(&entity.status)
                .unwrap_or(TransactionStatus::Pending),
            provider_reference_id: entity.provider_reference_id,
            provider_response: entity.provider_response,
            response_code: entity.response_code,
            retry_count: entity.retry_count,
            error_code: entity.error_code,
            error_message: entity.error_message,
            is_test: entity.is_test,
            verified_at: entity.verified_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
