//! Registration repository for database operations.
//!
//! Owns the transactional boundaries of the registration workflow: the
//! registration + participants insert and the status update both run inside
//! one `begin()`/`commit()` so a failure at any step leaves no partial rows.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ParticipantEntity, RegistrationEntity, RegistrationWithRosterRow};
use crate::metrics::QueryTimer;
use domain::models::{PaymentStatus, RegistrationStatus};

/// Input for a new registration row.
#[derive(Debug, Clone)]
pub struct NewRegistration {
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
}

/// One roster entry to insert alongside a registration.
#[derive(Debug, Clone)]
pub struct RosterMember {
    pub name: String,
    pub is_team_lead: bool,
}

/// Admin status decision to apply.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub new_status: RegistrationStatus,
    /// Status the row must currently hold (optimistic guard).
    pub expected_status: RegistrationStatus,
    pub rejection_reason: Option<String>,
}

/// Listing filters for the admin dashboard.
#[derive(Debug, Clone, Default)]
pub struct RegistrationFilters {
    pub day: Option<String>,
    pub event: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

const REGISTRATION_COLUMNS: &str = r#"id, event_name, event_code, event_day, event_time, event_location,
       team_size, team_lead_name, email, whatsapp_number, alternate_phone, college,
       payment_screenshot_url, upi_transaction_id, status, payment_status,
       rejection_reason, verification_notes, last_email_sent, last_email_sent_at,
       email_status, created_at, updated_at"#;

/// Repository for registration-related database operations.
#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    /// Creates a new RegistrationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a registration and its roster in one transaction.
    ///
    /// If any participant insert fails the whole transaction rolls back and
    /// no rows for this registration remain.
    pub async fn create_with_participants(
        &self,
        new: &NewRegistration,
        roster: &[RosterMember],
    ) -> Result<(RegistrationEntity, Vec<ParticipantEntity>), sqlx::Error> {
        let timer = QueryTimer::new("create_registration_with_participants");
        let mut tx = self.pool.begin().await?;

        let registration = sqlx::query_as::<_, RegistrationEntity>(&format!(
            r#"
            INSERT INTO registrations (
                event_name, event_code, event_day, event_time, event_location,
                team_size, team_lead_name, email, whatsapp_number, alternate_phone,
                college, payment_screenshot_url, upi_transaction_id, status, payment_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending', 'pending')
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(&new.event_name)
        .bind(&new.event_code)
        .bind(&new.event_day)
        .bind(&new.event_time)
        .bind(&new.event_location)
        .bind(new.team_size)
        .bind(&new.team_lead_name)
        .bind(&new.email)
        .bind(&new.whatsapp_number)
        .bind(&new.alternate_phone)
        .bind(&new.college)
        .bind(&new.payment_screenshot_url)
        .bind(&new.upi_transaction_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut participants = Vec::with_capacity(roster.len());
        for member in roster {
            let participant = sqlx::query_as::<_, ParticipantEntity>(
                r#"
                INSERT INTO participants (registration_id, name, is_team_lead)
                VALUES ($1, $2, $3)
                RETURNING id, registration_id, name, is_team_lead
                "#,
            )
            .bind(registration.id)
            .bind(&member.name)
            .bind(member.is_team_lead)
            .fetch_one(&mut *tx)
            .await?;
            participants.push(participant);
        }

        tx.commit().await?;
        timer.record();
        Ok((registration, participants))
    }

    /// Find a registration by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_registration_by_id");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Fetch the participants of a registration.
    pub async fn find_participants(
        &self,
        registration_id: Uuid,
    ) -> Result<Vec<ParticipantEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_participants");
        let result = sqlx::query_as::<_, ParticipantEntity>(
            r#"
            SELECT id, registration_id, name, is_team_lead
            FROM participants
            WHERE registration_id = $1
            ORDER BY id
            "#,
        )
        .bind(registration_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List registrations with aggregated rosters, newest first.
    ///
    /// All filters are optional and combined with AND; `search` matches the
    /// team lead name, contact email, or college, case-insensitively.
    pub async fn list(
        &self,
        filters: &RegistrationFilters,
    ) -> Result<Vec<RegistrationWithRosterRow>, sqlx::Error> {
        let timer = QueryTimer::new("list_registrations");
        let result = sqlx::query_as::<_, RegistrationWithRosterRow>(&format!(
            r#"
            WITH roster AS (
                SELECT registration_id,
                       string_agg(name, ', ' ORDER BY id) AS participant_names,
                       count(*) AS participant_count
                FROM participants
                GROUP BY registration_id
            )
            SELECT {REGISTRATION_COLUMNS},
                   roster.participant_names,
                   COALESCE(roster.participant_count, 0) AS participant_count
            FROM registrations r
            LEFT JOIN roster ON roster.registration_id = r.id
            WHERE ($1::text IS NULL OR r.event_day = $1)
              AND ($2::text IS NULL OR r.event_code = $2)
              AND ($3::text IS NULL OR r.status = $3)
              AND ($4::text IS NULL
                   OR r.team_lead_name ILIKE '%' || $4 || '%'
                   OR r.email ILIKE '%' || $4 || '%'
                   OR r.college ILIKE '%' || $4 || '%')
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(&filters.day)
        .bind(&filters.event)
        .bind(&filters.status)
        .bind(&filters.search)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Fetch a set of registrations with aggregated rosters by id.
    pub async fn find_many_with_roster(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<RegistrationWithRosterRow>, sqlx::Error> {
        let timer = QueryTimer::new("find_registrations_with_roster");
        let result = sqlx::query_as::<_, RegistrationWithRosterRow>(&format!(
            r#"
            WITH roster AS (
                SELECT registration_id,
                       string_agg(name, ', ' ORDER BY id) AS participant_names,
                       count(*) AS participant_count
                FROM participants
                GROUP BY registration_id
            )
            SELECT {REGISTRATION_COLUMNS},
                   roster.participant_names,
                   COALESCE(roster.participant_count, 0) AS participant_count
            FROM registrations r
            LEFT JOIN roster ON roster.registration_id = r.id
            WHERE r.id = ANY($1)
            "#
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Applies an admin status decision, guarded on the expected current
    /// status. Approval forces `payment_status = 'completed'`; rejection
    /// stores the reason. Returns `None` when the row has moved since the
    /// caller read it (or vanished).
    pub async fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_registration_status");
        let forced_payment = (update.new_status == RegistrationStatus::Approved)
            .then(|| PaymentStatus::Completed.as_str());

        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            r#"
            UPDATE registrations
            SET status = $2,
                rejection_reason = COALESCE($3, rejection_reason),
                payment_status = COALESCE($4, payment_status),
                updated_at = NOW()
            WHERE id = $1 AND status = $5
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.new_status.as_str())
        .bind(&update.rejection_reason)
        .bind(forced_payment)
        .bind(update.expected_status.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Appends one line to the append-only verification notes log.
    ///
    /// Single atomic statement, so concurrent appends interleave rather than
    /// overwrite.
    pub async fn append_verification_note(
        &self,
        id: Uuid,
        line: &str,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("append_verification_note");
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET verification_notes = CASE
                    WHEN verification_notes IS NULL OR verification_notes = '' THEN $2
                    ELSE verification_notes || E'\n\n' || $2
                END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(line)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Participant-facing payment-proof update.
    pub async fn update_payment_info(
        &self,
        id: Uuid,
        upi_transaction_id: Option<&str>,
        payment_screenshot_url: Option<&str>,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_registration_payment_info");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            r#"
            UPDATE registrations
            SET upi_transaction_id = COALESCE($2, upi_transaction_id),
                payment_screenshot_url = COALESCE($3, payment_screenshot_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(upi_transaction_id)
        .bind(payment_screenshot_url)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Records the outcome of an email dispatch on the registration row.
    pub async fn mark_email_result(
        &self,
        id: Uuid,
        template_name: Option<&str>,
        succeeded: bool,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("mark_registration_email_result");
        sqlx::query(
            r#"
            UPDATE registrations
            SET email_status = $2,
                last_email_sent = COALESCE($3, last_email_sent),
                last_email_sent_at = CASE WHEN $2 = 'sent' THEN NOW() ELSE last_email_sent_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(if succeeded { "sent" } else { "failed" })
        .bind(template_name)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // RegistrationRepository queries require a database connection and are
    // covered by the integration tests in crates/api/tests.
}
