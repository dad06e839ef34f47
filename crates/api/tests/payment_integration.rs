//! Integration tests for payment callback handling.
//!
//! Require a live PostgreSQL database (`TEST_DATABASE_URL`); run with
//! `cargo test -- --ignored`.

mod common;

use domain::models::TransactionStatus;
use persistence::repositories::{CallbackApply, TransactionRepository};
use shared::crypto::random_hex;

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_callback_applies_once_and_ignores_replay() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let repo = TransactionRepository::new(pool.clone());

    let transaction_id = random_hex(16);
    repo.create(&transaction_id, None, None, 200.0, false)
        .await
        .unwrap();

    let payload = serde_json::json!({
        "code": "PAYMENT_SUCCESS",
        "providerReferenceId": "P2501010001",
        "amount": 20000
    });

    let first = repo
        .apply_callback(
            &transaction_id,
            TransactionStatus::Completed,
            Some("P2501010001"),
            Some("PAYMENT_SUCCESS"),
            &payload,
        )
        .await
        .unwrap();
    let applied = match first {
        CallbackApply::Applied(entity) => entity,
        other => panic!("expected Applied, got {:?}", other),
    };
    assert_eq!(applied.status, "completed");
    assert_eq!(applied.provider_reference_id.as_deref(), Some("P2501010001"));
    assert!(applied.verified_at.is_some());

    // A replayed callback must not re-apply
    let second = repo
        .apply_callback(
            &transaction_id,
            TransactionStatus::Failed,
            Some("P2501010001"),
            Some("PAYMENT_ERROR"),
            &payload,
        )
        .await
        .unwrap();
    let replay = match second {
        CallbackApply::AlreadyProcessed(entity) => entity,
        other => panic!("expected AlreadyProcessed, got {:?}", other),
    };
    assert_eq!(replay.status, "completed", "replay must not flip the status");

    // Both callbacks land in the append-only audit table
    let (audit_rows,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payment_callbacks WHERE transaction_id = $1")
            .bind(&transaction_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(audit_rows, 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_record_error_bumps_retry_count_without_touching_status() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let repo = TransactionRepository::new(pool.clone());

    let transaction_id = random_hex(16);
    repo.create(&transaction_id, None, None, 150.0, false)
        .await
        .unwrap();

    repo.record_error(&transaction_id, "PROVIDER_UNREACHABLE", "connect timeout")
        .await
        .unwrap();
    repo.record_error(&transaction_id, "PROVIDER_UNREACHABLE", "connect timeout")
        .await
        .unwrap();

    let entity = repo
        .find_by_transaction_id(&transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entity.retry_count, 2);
    assert_eq!(entity.status, "pending");
    assert_eq!(entity.error_code.as_deref(), Some("PROVIDER_UNREACHABLE"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_test_mode_transaction_completes_via_simulator() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let repo = TransactionRepository::new(pool.clone());

    let transaction_id = random_hex(16);
    repo.create(&transaction_id, None, None, 100.0, true)
        .await
        .unwrap();

    let completed = repo.complete_test(&transaction_id).await.unwrap().unwrap();
    assert_eq!(completed.status, "completed");
    assert!(completed.is_test);

    // Second completion attempt is a no-op
    assert!(repo.complete_test(&transaction_id).await.unwrap().is_none());
}
