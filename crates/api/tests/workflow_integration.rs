//! Integration tests for the registration workflow.
//!
//! Require a live PostgreSQL database (`TEST_DATABASE_URL`); run with
//! `cargo test -- --ignored`.

mod common;

use std::sync::Arc;

use event_registration_api::services::email::{ConsoleTransport, EmailService};
use event_registration_api::services::registration::{
    RegistrationWorkflow, SubmitRegistration, WorkflowError,
};

use domain::models::{PaymentStatus, RegistrationStatus};
use persistence::repositories::{RegistrationRepository, RosterMember};

fn submit_input(participants: &[&str]) -> SubmitRegistration {
    SubmitRegistration {
        event_code: "TALSUTRA".to_string(),
        team_lead_name: None,
        email: common::random_email(),
        whatsapp_number: "+91 98765-43210".to_string(),
        alternate_phone: None,
        college: "Test College".to_string(),
        payment_screenshot_url: None,
        upi_transaction_id: None,
        participant_names: participants.iter().map(|s| s.to_string()).collect(),
    }
}

fn workflow(pool: sqlx::PgPool) -> RegistrationWorkflow {
    let email = EmailService::with_transport(pool.clone(), Arc::new(ConsoleTransport));
    RegistrationWorkflow::new(pool, email)
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_submit_creates_pending_registration_with_roster() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let workflow = workflow(pool.clone());

    let detail = workflow
        .submit(submit_input(&["Ravi", "Asha", "Kiran"]))
        .await
        .expect("submission should succeed");

    assert_eq!(detail.registration.status, RegistrationStatus::Pending);
    assert_eq!(detail.registration.payment_status, PaymentStatus::Pending);
    assert_eq!(detail.registration.team_size, 3);
    assert_eq!(detail.registration.whatsapp_number, "9876543210");
    assert_eq!(detail.participants.len(), 3);

    // First participant is the team lead when no explicit lead was given
    let leads: Vec<_> = detail.participants.iter().filter(|p| p.is_team_lead).collect();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].name, "Ravi");
    assert_eq!(detail.registration.team_lead_name, "Ravi");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_submit_rejects_oversized_team_without_writing_rows() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let workflow = workflow(pool.clone());

    let input = submit_input(&["A", "B", "C", "D", "E"]); // TALSUTRA allows 1-4
    let marker_email = input.email.clone();

    let result = workflow.submit(input).await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations WHERE email = $1")
        .bind(&marker_email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0, "no rows may be written for a rejected submission");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_submit_rejects_short_phone() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let workflow = workflow(pool);

    let mut input = submit_input(&["Ravi"]);
    input.whatsapp_number = "98765".to_string();

    let result = workflow.submit(input).await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_submit_rejects_unknown_event_code() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let workflow = workflow(pool);

    let mut input = submit_input(&["Ravi"]);
    input.event_code = "NO_SUCH_EVENT".to_string();

    let result = workflow.submit(input).await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_registration_insert_is_all_or_nothing() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let repo = RegistrationRepository::new(pool.clone());

    // Two team leads violate the partial unique index on the second insert;
    // the registration row from the first statement must roll back with it.
    let new = persistence::repositories::NewRegistration {
        event_name: "Talsutra".to_string(),
        event_code: "TALSUTRA".to_string(),
        event_day: "Day 1".to_string(),
        event_time: "10:00 AM".to_string(),
        event_location: "Main Auditorium".to_string(),
        team_size: 2,
        team_lead_name: "Ravi".to_string(),
        email: common::random_email(),
        whatsapp_number: "9876543210".to_string(),
        alternate_phone: None,
        college: "Test College".to_string(),
        payment_screenshot_url: None,
        upi_transaction_id: None,
    };
    let roster = vec![
        RosterMember {
            name: "Ravi".to_string(),
            is_team_lead: true,
        },
        RosterMember {
            name: "Asha".to_string(),
            is_team_lead: true,
        },
    ];

    let result = repo.create_with_participants(&new, &roster).await;
    assert!(result.is_err());

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations WHERE email = $1")
        .bind(&new.email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0, "partial writes must not survive a failed insert");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_approval_forces_payment_completed_and_logs_email() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let workflow = workflow(pool.clone());

    let detail = workflow
        .submit(submit_input(&["Ravi", "Asha", "Kiran"]))
        .await
        .unwrap();
    let id = detail.registration.id;

    let updated = workflow
        .update_status(id, RegistrationStatus::Approved, None)
        .await
        .expect("approval should succeed");

    assert_eq!(updated.status, RegistrationStatus::Approved);
    assert_eq!(updated.payment_status, PaymentStatus::Completed);

    // Notification runs on a spawned task after commit
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let (log_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM email_logs WHERE registration_id = $1 AND status = 'sent'",
    )
    .bind(id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(log_count, 1, "approval must log exactly one sent email");

    let (email_status,): (Option<String>,) =
        sqlx::query_as("SELECT email_status FROM registrations WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(email_status.as_deref(), Some("sent"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_rejection_requires_reason() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let workflow = workflow(pool);

    let detail = workflow.submit(submit_input(&["Ravi"])).await.unwrap();

    let result = workflow
        .update_status(detail.registration.id, RegistrationStatus::Rejected, None)
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));

    let updated = workflow
        .update_status(
            detail.registration.id,
            RegistrationStatus::Rejected,
            Some("Blurry payment screenshot".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, RegistrationStatus::Rejected);
    assert_eq!(
        updated.rejection_reason.as_deref(),
        Some("Blurry payment screenshot")
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_no_transition_out_of_terminal_status() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let workflow = workflow(pool);

    let detail = workflow.submit(submit_input(&["Ravi"])).await.unwrap();
    let id = detail.registration.id;

    workflow
        .update_status(id, RegistrationStatus::Approved, None)
        .await
        .unwrap();

    let result = workflow
        .update_status(id, RegistrationStatus::Rejected, Some("late".to_string()))
        .await;
    assert!(matches!(result, Err(WorkflowError::Conflict(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn test_verification_notes_append() {
    let pool = common::create_test_pool().await;
    common::run_migrations(&pool).await;
    let workflow = workflow(pool.clone());

    let detail = workflow.submit(submit_input(&["Ravi"])).await.unwrap();
    let id = detail.registration.id;

    let result = workflow.add_verification_note(id, "   ", "admin@x").await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));

    workflow
        .add_verification_note(id, "screenshot checked", "admin@x")
        .await
        .unwrap();
    workflow
        .add_verification_note(id, "UPI reference matches", "admin@x")
        .await
        .unwrap();

    let (notes,): (Option<String>,) =
        sqlx::query_as("SELECT verification_notes FROM registrations WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let notes = notes.unwrap();
    assert!(notes.contains("screenshot checked"));
    assert!(notes.contains("UPI reference matches"));
    assert!(notes.contains("admin@x"));
    assert_eq!(notes.matches("\n\n").count(), 1);
}
