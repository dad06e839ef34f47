//! Registration and participant entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use domain::models::{Participant, PaymentStatus, Registration, RegistrationStatus};

/// Database row mapping for the registrations table.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationEntity {
    pub id: Uuid,
    pub event_name: String,
    pub event_code: String,
    pub event_day: String,
    pub event_time: String,
    pub event_location: String,
    pub team_size: i32,
    pub team_lead_name: String,
    pub email: String,
    pub whatsapp_number: String,
    pub alternate_phone: Option<String>,
    pub college: String,
    pub payment_screenshot_url: Option<String>,
    pub upi_transaction_id: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub rejection_reason: Option<String>,
    pub verification_notes: Option<String>,
    pub last_email_sent: Option<String>,
    pub last_email_sent_at: Option<DateTime<Utc>>,
    pub email_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RegistrationEntity> for Registration {
    fn from(entity: RegistrationEntity) -> Self {
        Self {
            id: entity.id,
            event_name: entity.event_name,
            event_code: entity.event_code,
            event_day: entity.event_day,
            event_time: entity.event_time,
            event_location: entity.event_location,
            team_size: entity.team_size,
            team_lead_name: entity.team_lead_name,
            email: entity.email,
            whatsapp_number: entity.whatsapp_number,
            alternate_phone: entity.alternate_phone,
            college: entity.college,
            payment_screenshot_url: entity.payment_screenshot_url,
            upi_transaction_id: entity.upi_transaction_id,
            status: RegistrationStatus::from_str(&entity.status)
                .unwrap_or(RegistrationStatus::Pending),
            payment_status: PaymentStatus::from_str(&entity.payment_status)
                .unwrap_or(PaymentStatus::Pending),
            rejection_reason: entity.rejection_reason,
            verification_notes: entity.verification_notes,
            last_email_sent: entity.last_email_sent,
            last_email_sent_at: entity.last_email_sent_at,
            email_status: entity.email_status,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the participants table.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantEntity {
    pub id: i64,
    pub registration_id: Uuid,
    pub name: String,
    pub is_team_lead: bool,
}

impl From<ParticipantEntity> for Participant {
    fn from(entity: ParticipantEntity) -> Self {
        Self {
            id: entity.id,
            registration_id: entity.registration_id,
            name: entity.name,
            is_team_lead: entity.is_team_lead,
        }
    }
}

/// Listing row: a registration joined with its aggregated roster.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationWithRosterRow {
    #[sqlx(flatten)]
    pub registration: RegistrationEntity,
    pub participant_names: Option<String>,
    pub participant_count: i64,
}
