//! Email template and dispatch-log domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A named, parameterized message body. Placeholders use `{{var}}` syntax.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: i64,
    /// Unique template name, e.g. `registration_approval`.
    pub name: String,
    pub subject: String,
    pub content: String,
    /// Declared variable schema (informational).
    pub variables: Option<serde_json::Value>,
    pub template_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The well-known transactional templates seeded by migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    RegistrationApproval,
    RegistrationRejection,
    PaymentReminder,
}

impl TemplateKind {
    pub fn template_name(&self) -> &'static str {
        match self {
            TemplateKind::RegistrationApproval => "registration_approval",
            TemplateKind::RegistrationRejection => "registration_rejection",
            TemplateKind::PaymentReminder => "payment_reminder",
        }
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approval" | "registration_approval" => Ok(TemplateKind::RegistrationApproval),
            "rejection" | "registration_rejection" => Ok(TemplateKind::RegistrationRejection),
            "payment_reminder" => Ok(TemplateKind::PaymentReminder),
            _ => Err(format!("Invalid email template type: {}", s)),
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.template_name())
    }
}

/// Outcome of one dispatch attempt (or a bulk-batch summary row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailLogStatus {
    Sent,
    Failed,
    Queued,
    Completed,
}

impl EmailLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailLogStatus::Sent => "sent",
            EmailLogStatus::Failed => "failed",
            EmailLogStatus::Queued => "queued",
            EmailLogStatus::Completed => "completed",
        }
    }
}

impl FromStr for EmailLogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(EmailLogStatus::Sent),
            "failed" => Ok(EmailLogStatus::Failed),
            "queued" => Ok(EmailLogStatus::Queued),
            "completed" => Ok(EmailLogStatus::Completed),
            _ => Err(format!("Invalid email log status: {}", s)),
        }
    }
}

impl fmt::Display for EmailLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One record per dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailLog {
    pub id: i64,
    pub template_id: Option<i64>,
    pub recipient_email: String,
    pub subject: String,
    pub content: String,
    pub status: EmailLogStatus,
    pub error_message: Option<String>,
    /// Links per-recipient rows of a bulk send to their summary row.
    pub bulk_email_id: Option<i64>,
    pub registration_id: Option<Uuid>,
    pub sent_at: DateTime<Utc>,
}
