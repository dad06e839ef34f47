//! Registration workflow.
//!
//! Drives the registration lifecycle: validated submission (one transaction
//! for the registration and its roster), admin status decisions with
//! best-effort notification, verification notes, and bulk templated email
//! actions.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::services::email::{registration_vars, EmailError, EmailService};
use domain::models::{
    EventInfo, Participant, PaymentStatus, Registration, RegistrationStatus, TemplateKind,
};
use domain::services::template::TemplateVars;
use persistence::entities::RegistrationWithRosterRow;
use persistence::repositories::{
    EventRepository, NewRegistration, RegistrationFilters, RegistrationRepository, RosterMember,
    StatusUpdate,
};
use shared::validation::{normalize_phone, validate_note};

/// Errors produced by the registration workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Email delivery failed: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<EmailError> for WorkflowError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::TemplateNotFound(name) => {
                WorkflowError::NotFound(format!("Email template not found: {}", name))
            }
            EmailError::Database(e) => WorkflowError::Database(e),
            other => WorkflowError::Delivery(other.to_string()),
        }
    }
}

/// Submission input, already deserialized by the route layer.
#[derive(Debug, Clone)]
pub struct SubmitRegistration {
    pub event_code: String,
    pub team_lead_name: Option<String>,
    pub email: String,
    pub whatsapp_number: String,
    pub alternate_phone: Option<String>,
    pub college: String,
    pub payment_screenshot_url: Option<String>,
    pub upi_transaction_id: Option<String>,
    pub participant_names: Vec<String>,
}

/// A registration with its participant roster.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDetail {
    #[serde(flatten)]
    pub registration: Registration,
    pub participants: Vec<Participant>,
}

/// Per-registration outcome of a bulk action.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionOutcome {
    pub id: Uuid,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Registration workflow service.
#[derive(Clone)]
pub struct RegistrationWorkflow {
    events: EventRepository,
    registrations: RegistrationRepository,
    email: EmailService,
}

impl RegistrationWorkflow {
    /// Creates the workflow with its collaborators.
    pub fn new(pool: PgPool, email: EmailService) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool),
            email,
        }
    }

    /// Validates and persists a new registration with its roster.
    ///
    /// The registration row and every participant row are inserted in one
    /// transaction; any failure leaves no partial state.
    pub async fn submit(
        &self,
        input: SubmitRegistration,
    ) -> Result<RegistrationDetail, WorkflowError> {
        let whatsapp = normalize_phone(&input.whatsapp_number)
            .map_err(|_| WorkflowError::Validation("WhatsApp number must be exactly 10 digits".into()))?;

        let alternate = match &input.alternate_phone {
            Some(raw) if !raw.trim().is_empty() => Some(normalize_phone(raw).map_err(|_| {
                WorkflowError::Validation("Alternate phone number must be exactly 10 digits".into())
            })?),
            _ => None,
        };

        let names: Vec<String> = input
            .participant_names
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();

        if names.is_empty() {
            return Err(WorkflowError::Validation(
                "At least one valid participant name is required".into(),
            ));
        }

        let event = self
            .events
            .find_by_code(input.event_code.trim())
            .await?
            .ok_or_else(|| {
                WorkflowError::Validation(format!("Unknown event code: {}", input.event_code))
            })?;

        let event: EventInfo = event.into();
        if !event.accepts_team_of(names.len()) {
            return Err(WorkflowError::Validation(format!(
                "Team size must be between {} and {} participants",
                event.min_team_size, event.max_team_size
            )));
        }

        let team_lead = input
            .team_lead_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&names[0])
            .to_string();

        // The lead must be a roster member, or exactly-one-lead cannot hold
        let team_lead = if names.iter().any(|n| *n == team_lead) {
            team_lead
        } else {
            names[0].clone()
        };

        // Mark exactly one roster entry as lead, even when names repeat
        let mut lead_marked = false;
        let roster: Vec<RosterMember> = names
            .iter()
            .map(|name| {
                let is_team_lead = !lead_marked && *name == team_lead;
                lead_marked |= is_team_lead;
                RosterMember {
                    name: name.clone(),
                    is_team_lead,
                }
            })
            .collect();

        let new = NewRegistration {
            event_name: event.name.clone(),
            event_code: event.code.clone(),
            event_day: event.day.clone(),
            event_time: event.time.clone(),
            event_location: event.location.clone(),
            team_size: names.len() as i32,
            team_lead_name: team_lead,
            email: input.email.trim().to_lowercase(),
            whatsapp_number: whatsapp,
            alternate_phone: alternate,
            college: input.college.trim().to_string(),
            payment_screenshot_url: input.payment_screenshot_url,
            upi_transaction_id: input.upi_transaction_id,
        };

        let (registration, participants) = self
            .registrations
            .create_with_participants(&new, &roster)
            .await?;

        info!(
            registration_id = %registration.id,
            event = %registration.event_code,
            team_size = registration.team_size,
            "Registration submitted"
        );

        Ok(RegistrationDetail {
            registration: registration.into(),
            participants: participants.into_iter().map(Into::into).collect(),
        })
    }

    /// Applies an admin status decision and dispatches the notification.
    ///
    /// Approval forces the payment status to completed; rejection requires a
    /// reason. The approval/rejection email runs on a spawned task after the
    /// update commits: a delivery failure is logged and recorded on the
    /// registration, never propagated, and never reverts the decision.
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: RegistrationStatus,
        reason: Option<String>,
    ) -> Result<Registration, WorkflowError> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        if new_status == RegistrationStatus::Rejected && reason.is_none() {
            return Err(WorkflowError::Validation(
                "A rejection reason is required".into(),
            ));
        }

        let current = self
            .registrations
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Registration not found".into()))?;
        let current_status: RegistrationStatus = Registration::from(current.clone()).status;

        if !current_status.can_transition_to(new_status) {
            return Err(WorkflowError::Conflict(format!(
                "Cannot move a registration from {} to {}",
                current_status, new_status
            )));
        }

        let updated = self
            .registrations
            .update_status(
                id,
                &StatusUpdate {
                    new_status,
                    expected_status: current_status,
                    rejection_reason: reason.clone(),
                },
            )
            .await?
            .ok_or_else(|| {
                WorkflowError::Conflict("Registration was updated concurrently".into())
            })?;

        let registration: Registration = updated.into();

        info!(
            registration_id = %id,
            status = %new_status,
            "Registration status updated"
        );

        // Notification is best-effort: status truth lives in the database,
        // delivery failures are logged by the email service.
        let template = match new_status {
            RegistrationStatus::Approved => Some(TemplateKind::RegistrationApproval),
            RegistrationStatus::Rejected => Some(TemplateKind::RegistrationRejection),
            _ => None,
        };

        if let Some(kind) = template {
            let email = self.email.clone();
            let registration_for_mail = registration.clone();
            let reason_for_mail = reason;
            tokio::spawn(async move {
                if let Err(e) = email
                    .send_registration_status(
                        &registration_for_mail,
                        kind,
                        reason_for_mail.as_deref(),
                    )
                    .await
                {
                    error!(
                        registration_id = %registration_for_mail.id,
                        error = %e,
                        "Status notification failed"
                    );
                }
            });
        }

        Ok(registration)
    }

    /// Appends a timestamped, attributed note to the verification log.
    pub async fn add_verification_note(
        &self,
        id: Uuid,
        note: &str,
        admin_name: &str,
    ) -> Result<(), WorkflowError> {
        validate_note(note).map_err(|e| WorkflowError::Validation(error_message(&e)))?;

        let line = Registration::format_note_line(admin_name, note, Utc::now());
        let found = self.registrations.append_verification_note(id, &line).await?;

        if !found {
            return Err(WorkflowError::NotFound("Registration not found".into()));
        }

        Ok(())
    }

    /// Sends one templated email per selected registration.
    ///
    /// Outcomes are independent: one failure is reported for its id and the
    /// batch continues.
    pub async fn bulk_action(
        &self,
        ids: &[Uuid],
        template_id: i64,
        extra_vars: TemplateVars,
    ) -> Result<Vec<BulkActionOutcome>, WorkflowError> {
        if ids.is_empty() {
            return Err(WorkflowError::Validation("No registrations selected".into()));
        }

        let template = self
            .email
            .templates()
            .find_template(template_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Email template not found".into()))?;

        let rows = self.registrations.find_many_with_roster(ids).await?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let registration: Registration = row.registration.clone().into();
            let roster = row
                .participant_names
                .clone()
                .unwrap_or_else(|| registration.team_lead_name.clone());

            let mut vars = registration_vars(&registration, &roster);
            vars.extend(extra_vars.clone());

            let outcome = match self
                .email
                .send_templated(&registration.email, &template, &vars, Some(registration.id))
                .await
            {
                Ok(_) => BulkActionOutcome {
                    id: registration.id,
                    status: "success",
                    error: None,
                },
                Err(e) => BulkActionOutcome {
                    id: registration.id,
                    status: "failed",
                    error: Some(e.to_string()),
                },
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Re-sends a transactional email for one registration.
    pub async fn resend_email(
        &self,
        id: Uuid,
        kind: TemplateKind,
        reason: Option<&str>,
    ) -> Result<(), WorkflowError> {
        let registration = self
            .registrations
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Registration not found".into()))?;
        let registration: Registration = registration.into();

        if kind == TemplateKind::PaymentReminder
            && registration.payment_status != PaymentStatus::Pending
        {
            return Err(WorkflowError::Validation(
                "Registration has no pending payment".into(),
            ));
        }

        self.email
            .send_registration_status(&registration, kind, reason)
            .await?;

        Ok(())
    }

    /// Participant-facing payment-proof update.
    pub async fn update_payment_info(
        &self,
        id: Uuid,
        upi_transaction_id: Option<&str>,
        payment_screenshot_url: Option<&str>,
    ) -> Result<Registration, WorkflowError> {
        let updated = self
            .registrations
            .update_payment_info(id, upi_transaction_id, payment_screenshot_url)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Registration not found".into()))?;

        Ok(updated.into())
    }

    /// Admin listing with aggregated rosters.
    pub async fn list(
        &self,
        filters: &RegistrationFilters,
    ) -> Result<Vec<RegistrationWithRosterRow>, WorkflowError> {
        Ok(self.registrations.list(filters).await?)
    }

    /// The event catalog, for registration forms.
    pub async fn list_events(&self) -> Result<Vec<EventInfo>, WorkflowError> {
        let events = self.events.list().await?;
        Ok(events.into_iter().map(Into::into).collect())
    }

    /// One registration with its participants.
    pub async fn get(&self, id: Uuid) -> Result<RegistrationDetail, WorkflowError> {
        let registration = self
            .registrations
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Registration not found".into()))?;
        let participants = self.registrations.find_participants(id).await?;

        Ok(RegistrationDetail {
            registration: registration.into(),
            participants: participants.into_iter().map(Into::into).collect(),
        })
    }
}

fn error_message(err: &validator::ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "Invalid input".to_string())
}
