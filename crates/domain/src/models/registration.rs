//! Registration and participant domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Admin-driven lifecycle status of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    Waitlisted,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::Waitlisted => "waitlisted",
        }
    }

    /// Approved and rejected registrations accept no further transitions.
    /// Waitlisted entries may still be moved by a later admin decision.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Approved | RegistrationStatus::Rejected
        )
    }

    /// Checks whether an admin decision may move a registration from `self`
    /// to `target`.
    pub fn can_transition_to(&self, target: RegistrationStatus) -> bool {
        match self {
            RegistrationStatus::Pending => target != RegistrationStatus::Pending,
            RegistrationStatus::Waitlisted => {
                matches!(
                    target,
                    RegistrationStatus::Approved | RegistrationStatus::Rejected
                )
            }
            RegistrationStatus::Approved | RegistrationStatus::Rejected => false,
        }
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RegistrationStatus::Pending),
            "approved" => Ok(RegistrationStatus::Approved),
            "rejected" => Ok(RegistrationStatus::Rejected),
            "waitlisted" => Ok(RegistrationStatus::Waitlisted),
            _ => Err(format!("Invalid registration status: {}", s)),
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment lifecycle of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One team's entry to one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
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
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    pub rejection_reason: Option<String>,
    /// Append-only log of admin verification notes.
    pub verification_notes: Option<String>,
    pub last_email_sent: Option<String>,
    pub last_email_sent_at: Option<DateTime<Utc>>,
    pub email_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Formats a verification note line: `[timestamp] admin: note`.
    ///
    /// Appended to the existing log separated by a blank line.
    pub fn format_note_line(admin_name: &str, note: &str, at: DateTime<Utc>) -> String {
        format!("[{}] {}: {}", at.to_rfc3339(), admin_name, note.trim())
    }

    /// Appends a note line to an existing (possibly empty) notes log.
    pub fn append_note(existing: Option<&str>, line: &str) -> String {
        match existing {
            Some(notes) if !notes.is_empty() => format!("{}\n\n{}", notes, line),
            _ => line.to_string(),
        }
    }
}

/// One named member of a registration's team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub registration_id: Uuid,
    pub name: String,
    pub is_team_lead: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_roundtrip() {
        for s in ["pending", "approved", "rejected", "waitlisted"] {
            let status = RegistrationStatus::from_str(s).unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!(RegistrationStatus::from_str("bogus").is_err());
    }

    #[test]
    fn test_status_from_str_case_insensitive() {
        assert_eq!(
            RegistrationStatus::from_str("APPROVED").unwrap(),
            RegistrationStatus::Approved
        );
    }

    #[test]
    fn test_pending_can_move_anywhere_but_pending() {
        let pending = RegistrationStatus::Pending;
        assert!(pending.can_transition_to(RegistrationStatus::Approved));
        assert!(pending.can_transition_to(RegistrationStatus::Rejected));
        assert!(pending.can_transition_to(RegistrationStatus::Waitlisted));
        assert!(!pending.can_transition_to(RegistrationStatus::Pending));
    }

    #[test]
    fn test_terminal_statuses_are_frozen() {
        for terminal in [RegistrationStatus::Approved, RegistrationStatus::Rejected] {
            assert!(terminal.is_terminal());
            for target in [
                RegistrationStatus::Pending,
                RegistrationStatus::Approved,
                RegistrationStatus::Rejected,
                RegistrationStatus::Waitlisted,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_waitlisted_can_be_decided_later() {
        let waitlisted = RegistrationStatus::Waitlisted;
        assert!(!waitlisted.is_terminal());
        assert!(waitlisted.can_transition_to(RegistrationStatus::Approved));
        assert!(waitlisted.can_transition_to(RegistrationStatus::Rejected));
        assert!(!waitlisted.can_transition_to(RegistrationStatus::Pending));
    }

    #[test]
    fn test_payment_status_roundtrip() {
        for s in ["pending", "completed", "failed", "refunded"] {
            assert_eq!(PaymentStatus::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_note_formatting() {
        let at = Utc.with_ymd_and_hms(2025, 2, 14, 9, 30, 0).unwrap();
        let line = Registration::format_note_line("Priya", "  screenshot verified ", at);
        assert_eq!(line, "[2025-02-14T09:30:00+00:00] Priya: screenshot verified");
    }

    #[test]
    fn test_note_appending() {
        let first = Registration::append_note(None, "line one");
        assert_eq!(first, "line one");

        let second = Registration::append_note(Some(&first), "line two");
        assert_eq!(second, "line one\n\nline two");

        let from_empty = Registration::append_note(Some(""), "line one");
        assert_eq!(from_empty, "line one");
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&RegistrationStatus::Waitlisted).unwrap(),
            "\"waitlisted\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
