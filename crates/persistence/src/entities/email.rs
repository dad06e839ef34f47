//! Email template and log entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use domain::models::{EmailLog, EmailLogStatus, EmailTemplate};

/// Database row mapping for the email_templates table.
#[derive(Debug, Clone, FromRow)]
pub struct EmailTemplateEntity {
    pub id: i64,
    pub name: String,
    pub subject: String,
    pub content: String,
    pub variables: Option<serde_json::Value>,
    pub template_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EmailTemplateEntity> for EmailTemplate {
    fn from(entity: EmailTemplateEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            subject: entity.subject,
            content: entity.content,
            variables: entity.variables,
            template_type: entity.template_type,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the email_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct EmailLogEntity {
    pub id: i64,
    pub template_id: Option<i64>,
    pub recipient_email: String,
    pub subject: String,
    pub content: String,
    pub status: String,
    pub error_message: Option<String>,
    pub bulk_email_id: Option<i64>,
    pub registration_id: Option<Uuid>,
    pub sent_at: DateTime<Utc>,
}

impl From<EmailLogEntity> for EmailLog {
    fn from(entity: EmailLogEntity) -> Self {
        Self {
            id: entity.id,
            template_id: entity.template_id,
            recipient_email: entity.recipient_email,
            subject: entity.subject,
            content: entity.content,
            status: EmailLogStatus::from_str(&entity.status).unwrap_or(EmailLogStatus::Queued),
            error_message: entity.error_message,
            bulk_email_id: entity.bulk_email_id,
            registration_id: entity.registration_id,
            sent_at: entity.sent_at,
        }
    }
}
