//! Email service: template rendering, transactional sends, and bulk dispatch.
//!
//! Dispatch goes through the [`MailTransport`] seam; the `console` transport
//! logs messages (development), the `sendgrid` transport calls the SendGrid
//! API. Every dispatch attempt writes one `email_logs` row. Bulk sends run in
//! fixed batches of [`BULK_BATCH_SIZE`] recipients, concurrent within a batch
//! and sequential across batches, to bound pressure on the transport.

use async_trait::async_trait;
use futures_util::future::join_all;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::EmailConfig;
use domain::models::{EmailLogStatus, Registration, TemplateKind};
use domain::services::template::{render_email, TemplateVars};
use persistence::entities::EmailTemplateEntity;
use persistence::repositories::{EmailRepository, NewEmailLog, RegistrationRepository};

/// Recipients dispatched concurrently per bulk sub-batch.
pub const BULK_BATCH_SIZE: usize = 10;

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email provider not configured")]
    NotConfigured,

    #[error("Email template not found: {0}")]
    TemplateNotFound(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Transport seam in front of the actual mail provider.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hands one message to the provider.
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

/// Development transport: logs the message instead of sending it.
pub struct ConsoleTransport;

#[async_trait]
impl MailTransport for ConsoleTransport {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        info!(to = %to, subject = %subject, "Email (console transport)");
        info!(body = %body, "Email body");
        Ok(())
    }
}

/// SendGrid API transport.
pub struct SendGridTransport {
    client: reqwest::Client,
    api_key: String,
    sender_email: String,
    sender_name: String,
}

impl SendGridTransport {
    pub fn new(config: &EmailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: config.sendgrid_api_key.clone(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
        }
    }
}

#[async_trait]
impl MailTransport for SendGridTransport {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        if self.api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let payload = serde_json::json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": {
                "email": self.sender_email,
                "name": self.sender_name
            },
            "subject": subject,
            "content": [{
                "type": "text/html",
                "value": body
            }]
        });

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::SendFailed(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

/// One recipient of a bulk send.
#[derive(Debug, Clone)]
pub struct BulkRecipient {
    pub email: String,
    pub registration_id: Option<Uuid>,
    pub variables: TemplateVars,
}

/// Per-recipient outcome within a bulk send.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRecipientOutcome {
    pub email: String,
    pub registration_id: Option<Uuid>,
    pub status: EmailLogStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<i64>,
}

/// Aggregate report for one bulk send.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendReport {
    pub total_sent: usize,
    pub total_failed: usize,
    pub summary_log_id: i64,
    pub results: Vec<BulkRecipientOutcome>,
}

/// Email service for transactional and bulk sends.
#[derive(Clone)]
pub struct EmailService {
    transport: Arc<dyn MailTransport>,
    emails: EmailRepository,
    registrations: RegistrationRepository,
}

impl EmailService {
    /// Builds the service from configuration, choosing the transport.
    pub fn from_config(config: &EmailConfig, pool: PgPool) -> Self {
        let transport: Arc<dyn MailTransport> =
            if config.enabled && config.provider == "sendgrid" {
                Arc::new(SendGridTransport::new(config))
            } else {
                if config.enabled && config.provider != "console" {
                    warn!(provider = %config.provider, "Unknown email provider, falling back to console");
                }
                Arc::new(ConsoleTransport)
            };

        Self::with_transport(pool, transport)
    }

    /// Builds the service with an explicit transport (tests).
    pub fn with_transport(pool: PgPool, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            transport,
            emails: EmailRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool),
        }
    }

    /// Repository accessor for template CRUD routes.
    pub fn templates(&self) -> &EmailRepository {
        &self.emails
    }

    /// Sends one templated email and logs the attempt.
    ///
    /// A failed delivery still writes a `failed` log row before the error is
    /// returned.
    pub async fn send_templated(
        &self,
        to: &str,
        template: &EmailTemplateEntity,
        vars: &TemplateVars,
        registration_id: Option<Uuid>,
    ) -> Result<i64, EmailError> {
        let rendered = render_email(&template.subject, &template.content, vars);

        let outcome = self
            .transport
            .deliver(to, &rendered.subject, &rendered.body)
            .await;

        let (status, error_message) = match &outcome {
            Ok(()) => (EmailLogStatus::Sent, None),
            Err(e) => (EmailLogStatus::Failed, Some(e.to_string())),
        };

        let log_id = self
            .emails
            .insert_log(&NewEmailLog {
                template_id: Some(template.id),
                recipient_email: to,
                subject: &rendered.subject,
                content: &rendered.body,
                status,
                error_message: error_message.as_deref(),
                bulk_email_id: None,
                registration_id,
            })
            .await?;

        if let Some(registration_id) = registration_id {
            self.registrations
                .mark_email_result(registration_id, Some(&template.name), outcome.is_ok())
                .await?;
        }

        outcome?;
        Ok(log_id)
    }

    /// Sends the approval/rejection/reminder email for a registration.
    ///
    /// Loads the named template, builds the registration variable map, and
    /// dispatches via [`send_templated`](Self::send_templated).
    pub async fn send_registration_status(
        &self,
        registration: &Registration,
        kind: TemplateKind,
        reason: Option<&str>,
    ) -> Result<i64, EmailError> {
        let template_name = kind.template_name();
        let template = self
            .emails
            .find_template_by_name(template_name)
            .await?
            .ok_or_else(|| EmailError::TemplateNotFound(template_name.to_string()))?;

        let roster = self
            .registrations
            .find_participants(registration.id)
            .await?;
        let all_participants = if roster.is_empty() {
            registration.team_lead_name.clone()
        } else {
            roster
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut vars = registration_vars(registration, &all_participants);
        if let Some(reason) = reason {
            vars.insert("reason".to_string(), reason.to_string());
        }

        self.send_templated(&registration.email, &template, &vars, Some(registration.id))
            .await
    }

    /// Bulk send: batches of [`BULK_BATCH_SIZE`], concurrent within a batch,
    /// sequential across batches. Each recipient gets its own log row; one
    /// summary row records the aggregate counts.
    pub async fn send_bulk(
        &self,
        template: &EmailTemplateEntity,
        recipients: &[BulkRecipient],
    ) -> Result<BulkSendReport, EmailError> {
        // Summary row first, so per-recipient rows can reference it
        let summary_log_id = self
            .emails
            .insert_log(&NewEmailLog {
                template_id: Some(template.id),
                recipient_email: "multiple-recipients",
                subject: &template.subject,
                content: &template.content,
                status: EmailLogStatus::Queued,
                error_message: None,
                bulk_email_id: None,
                registration_id: None,
            })
            .await?;

        let mut results = Vec::with_capacity(recipients.len());

        for batch in recipients.chunks(BULK_BATCH_SIZE) {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|recipient| self.send_bulk_one(template, summary_log_id, recipient)),
            )
            .await;
            results.extend(outcomes);
        }

        let total_sent = results
            .iter()
            .filter(|r| r.status == EmailLogStatus::Sent)
            .count();
        let total_failed = results.len() - total_sent;

        self.emails
            .update_log_status(
                summary_log_id,
                EmailLogStatus::Completed,
                Some(&format!("Success: {}, Failed: {}", total_sent, total_failed)),
            )
            .await?;

        Ok(BulkSendReport {
            total_sent,
            total_failed,
            summary_log_id,
            results,
        })
    }

    /// One recipient within a bulk batch. Never fails the batch: errors are
    /// captured into the outcome and its log row.
    async fn send_bulk_one(
        &self,
        template: &EmailTemplateEntity,
        summary_log_id: i64,
        recipient: &BulkRecipient,
    ) -> BulkRecipientOutcome {
        let rendered = render_email(&template.subject, &template.content, &recipient.variables);

        let delivery = self
            .transport
            .deliver(&recipient.email, &rendered.subject, &rendered.body)
            .await;

        let (status, error_message) = match &delivery {
            Ok(()) => (EmailLogStatus::Sent, None),
            Err(e) => {
                error!(to = %recipient.email, error = %e, "Bulk email delivery failed");
                (EmailLogStatus::Failed, Some(e.to_string()))
            }
        };

        let log_id = match self
            .emails
            .insert_log(&NewEmailLog {
                template_id: Some(template.id),
                recipient_email: &recipient.email,
                subject: &rendered.subject,
                content: &rendered.body,
                status,
                error_message: error_message.as_deref(),
                bulk_email_id: Some(summary_log_id),
                registration_id: recipient.registration_id,
            })
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!(to = %recipient.email, error = %e, "Failed to write email log row");
                None
            }
        };

        if let Some(registration_id) = recipient.registration_id {
            if let Err(e) = self
                .registrations
                .mark_email_result(registration_id, Some(&template.name), delivery.is_ok())
                .await
            {
                error!(registration_id = %registration_id, error = %e, "Failed to update registration email status");
            }
        }

        BulkRecipientOutcome {
            email: recipient.email.clone(),
            registration_id: recipient.registration_id,
            status,
            error: error_message,
            log_id,
        }
    }

    /// Sends an admin login OTP. Not logged to `email_logs`.
    pub async fn send_verification_otp(&self, to: &str, otp: &str) -> Result<(), EmailError> {
        let subject = "Verify Your Admin Access";
        let body = format!(
            "<h1>Admin Verification Required</h1>\
             <p>Your verification code is: <strong>{}</strong></p>\
             <p>This code will expire in 5 minutes.</p>\
             <p>If you didn't request this, please ignore this email.</p>",
            otp
        );
        self.transport.deliver(to, subject, &body).await
    }
}

/// Builds the standard variable map for registration emails.
pub fn registration_vars(registration: &Registration, all_participants: &str) -> TemplateVars {
    let mut vars = TemplateVars::new();
    vars.insert("name".into(), registration.team_lead_name.clone());
    vars.insert("event".into(), registration.event_name.clone());
    vars.insert("eventDate".into(), registration.event_day.clone());
    vars.insert("eventTime".into(), registration.event_time.clone());
    vars.insert("eventLocation".into(), registration.event_location.clone());
    vars.insert("college".into(), registration.college.clone());
    vars.insert("teamSize".into(), registration.team_size.to_string());
    vars.insert(
        "paymentStatus".into(),
        registration.payment_status.to_string(),
    );
    vars.insert("registrationId".into(), registration.id.to_string());
    vars.insert("allParticipants".into(), all_participants.to_string());
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{PaymentStatus, RegistrationStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that fails for recipients listed in `failing`.
    struct ScriptedTransport {
        failing: Vec<String>,
        delivered: AtomicUsize,
    }

    #[async_trait]
    impl MailTransport for ScriptedTransport {
        async fn deliver(&self, to: &str, _subject: &str, _body: &str) -> Result<(), EmailError> {
            if self.failing.iter().any(|f| f == to) {
                return Err(EmailError::SendFailed("scripted failure".to_string()));
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample_registration() -> Registration {
        Registration {
            id: Uuid::new_v4(),
            event_name: "Talsutra".into(),
            event_code: "TALSUTRA".into(),
            event_day: "Day 1".into(),
            event_time: "10:00 AM".into(),
            event_location: "Main Auditorium".into(),
            team_size: 3,
            team_lead_name: "Ravi".into(),
            email: "ravi@college.example".into(),
            whatsapp_number: "9876543210".into(),
            alternate_phone: None,
            college: "NIT".into(),
            payment_screenshot_url: None,
            upi_transaction_id: None,
            status: RegistrationStatus::Pending,
            payment_status: PaymentStatus::Pending,
            rejection_reason: None,
            verification_notes: None,
            last_email_sent: None,
            last_email_sent_at: None,
            email_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_registration_vars_complete() {
        let reg = sample_registration();
        let vars = registration_vars(&reg, "Ravi, Asha, Kiran");

        assert_eq!(vars.get("name").unwrap(), "Ravi");
        assert_eq!(vars.get("event").unwrap(), "Talsutra");
        assert_eq!(vars.get("eventDate").unwrap(), "Day 1");
        assert_eq!(vars.get("teamSize").unwrap(), "3");
        assert_eq!(vars.get("paymentStatus").unwrap(), "pending");
        assert_eq!(vars.get("allParticipants").unwrap(), "Ravi, Asha, Kiran");
        assert_eq!(vars.get("registrationId").unwrap(), &reg.id.to_string());
    }

    #[tokio::test]
    async fn test_console_transport_always_delivers() {
        let transport = ConsoleTransport;
        assert!(transport
            .deliver("x@y.example", "subject", "body")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_scripted_transport_fails_selected_recipients() {
        let transport = ScriptedTransport {
            failing: vec!["bad@x.example".to_string()],
            delivered: AtomicUsize::new(0),
        };

        assert!(transport.deliver("ok@x.example", "s", "b").await.is_ok());
        assert!(transport.deliver("bad@x.example", "s", "b").await.is_err());
        assert_eq!(transport.delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batch_partitioning() {
        // 25 recipients split into batches of 10 -> 10 + 10 + 5
        let recipients: Vec<u32> = (0..25).collect();
        let batches: Vec<_> = recipients.chunks(BULK_BATCH_SIZE).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[2].len(), 5);
    }
}
