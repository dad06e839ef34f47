//! Payment transaction repository.
//!
//! The callback path is idempotent per transaction id: a transaction already
//! in a terminal state is never re-applied, and the registration propagation
//! plus audit append happen in the same database transaction as the status
//! flip.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::TransactionEntity;
use crate::metrics::QueryTimer;
use domain::models::TransactionStatus;

const TRANSACTION_COLUMNS: &str = r#"id, transaction_id, registration_id, user_id, amount, status,
       provider_reference_id, provider_response, response_code, retry_count,
       error_code, error_message, is_test, verified_at, created_at, updated_at"#;

/// Outcome of applying a provider callback.
#[derive(Debug, Clone)]
pub enum CallbackApply {
    /// The callback moved the transaction out of `pending`.
    Applied(TransactionEntity),
    /// The transaction was already terminal; nothing was re-applied.
    AlreadyProcessed(TransactionEntity),
    /// No transaction with this id exists.
    NotFound,
}

/// Repository for payment transaction database operations.
#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists a new pending transaction.
    pub async fn create(
        &self,
        transaction_id: &str,
        registration_id: Option<Uuid>,
        user_id: Option<Uuid>,
        amount: f64,
        is_test: bool,
    ) -> Result<TransactionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_transaction");
        let result = sqlx::query_as::<_, TransactionEntity>(&format!(
            r#"
            INSERT INTO transactions (transaction_id, registration_id, user_id, amount, status, is_test)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction_id)
        .bind(registration_id)
        .bind(user_id)
        .bind(amount)
        .bind(is_test)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a transaction by its opaque transaction id.
    pub async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_transaction");
        let result = sqlx::query_as::<_, TransactionEntity>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Applies a verified provider callback.
    ///
    /// In one database transaction: flips the transaction row out of
    /// `pending` (guarded, so a replayed callback is a no-op), propagates the
    /// payment status to the owning registration, and appends the raw
    /// callback payload to the audit table. The audit row is written even for
    /// replays.
    pub async fn apply_callback(
        &self,
        transaction_id: &str,
        outcome: TransactionStatus,
        provider_reference_id: Option<&str>,
        response_code: Option<&str>,
        raw_payload: &serde_json::Value,
    ) -> Result<CallbackApply, sqlx::Error> {
        let timer = QueryTimer::new("apply_payment_callback");
        let mut tx = self.pool.begin().await?;

        // Audit first: every callback is recorded, applied or not.
        sqlx::query(
            r#"
            INSERT INTO payment_callbacks (transaction_id, payload)
            VALUES ($1, $2)
            "#,
        )
        .bind(transaction_id)
        .bind(raw_payload)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, TransactionEntity>(&format!(
            r#"
            UPDATE transactions
            SET status = $2,
                provider_reference_id = $3,
                response_code = $4,
                provider_response = $5,
                verified_at = NOW(),
                updated_at = NOW()
            WHERE transaction_id = $1 AND status = 'pending'
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction_id)
        .bind(outcome.as_str())
        .bind(provider_reference_id)
        .bind(response_code)
        .bind(raw_payload)
        .fetch_optional(&mut *tx)
        .await?;

        let apply = match updated {
            Some(entity) => {
                if let Some(registration_id) = entity.registration_id {
                    let registration_payment = match outcome {
                        TransactionStatus::Completed => "completed",
                        _ => "failed",
                    };
                    sqlx::query(
                        r#"
                        UPDATE registrations
                        SET payment_status = $2, updated_at = NOW()
                        WHERE id = $1
                        "#,
                    )
                    .bind(registration_id)
                    .bind(registration_payment)
                    .execute(&mut *tx)
                    .await?;
                }
                CallbackApply::Applied(entity)
            }
            None => {
                let existing = sqlx::query_as::<_, TransactionEntity>(&format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_id = $1"
                ))
                .bind(transaction_id)
                .fetch_optional(&mut *tx)
                .await?;

                match existing {
                    Some(entity) => CallbackApply::AlreadyProcessed(entity),
                    None => CallbackApply::NotFound,
                }
            }
        };

        tx.commit().await?;
        timer.record();
        Ok(apply)
    }

    /// Records a processing error: bumps retry_count and stores the last
    /// error without touching the status.
    pub async fn record_error(
        &self,
        transaction_id: &str,
        error_code: &str,
        error_message: &str,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("record_transaction_error");
        sqlx::query(
            r#"
            UPDATE transactions
            SET error_code = $2,
                error_message = $3,
                retry_count = retry_count + 1,
                updated_at = NOW()
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .bind(error_code)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    /// Marks a test-mode transaction completed (simulator flow).
    pub async fn complete_test(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("complete_test_transaction");
        let result = sqlx::query_as::<_, TransactionEntity>(&format!(
            r#"
            UPDATE transactions
            SET status = 'completed', verified_at = NOW(), updated_at = NOW()
            WHERE transaction_id = $1 AND is_test = true AND status = 'pending'
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    // TransactionRepository queries require a database connection and are
    // covered by the integration tests in crates/api/tests.
}
