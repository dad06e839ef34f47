//! Email template and dispatch-log repository.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{EmailLogEntity, EmailTemplateEntity};
use crate::metrics::QueryTimer;
use domain::models::EmailLogStatus;

const TEMPLATE_COLUMNS: &str =
    "id, name, subject, content, variables, template_type, created_at, updated_at";

const LOG_COLUMNS: &str = r#"id, template_id, recipient_email, subject, content, status,
       error_message, bulk_email_id, registration_id, sent_at"#;

/// Input for a new email log row.
#[derive(Debug, Clone)]
pub struct NewEmailLog<'a> {
    pub template_id: Option<i64>,
    pub recipient_email: &'a str,
    pub subject: &'a str,
    pub content: &'a str,
    pub status: EmailLogStatus,
    pub error_message: Option<&'a str>,
    pub bulk_email_id: Option<i64>,
    pub registration_id: Option<Uuid>,
}

/// Repository for email template and log database operations.
#[derive(Clone)]
pub struct EmailRepository {
    pool: PgPool,
}

impl EmailRepository {
    /// Creates a new EmailRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a template. Duplicate names surface as a unique violation.
    pub async fn create_template(
        &self,
        name: &str,
        subject: &str,
        content: &str,
        variables: Option<&serde_json::Value>,
        template_type: &str,
    ) -> Result<EmailTemplateEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_email_template");
        let result = sqlx::query_as::<_, EmailTemplateEntity>(&format!(
            r#"
            INSERT INTO email_templates (name, subject, content, variables, template_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(subject)
        .bind(content)
        .bind(variables)
        .bind(template_type)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Updates a template in place.
    pub async fn update_template(
        &self,
        id: i64,
        name: &str,
        subject: &str,
        content: &str,
        variables: Option<&serde_json::Value>,
    ) -> Result<Option<EmailTemplateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_email_template");
        let result = sqlx::query_as::<_, EmailTemplateEntity>(&format!(
            r#"
            UPDATE email_templates
            SET name = $2, subject = $3, content = $4, variables = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(subject)
        .bind(content)
        .bind(variables)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a template by ID.
    pub async fn find_template(&self, id: i64) -> Result<Option<EmailTemplateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_email_template");
        let result = sqlx::query_as::<_, EmailTemplateEntity>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a template by its unique name.
    pub async fn find_template_by_name(
        &self,
        name: &str,
    ) -> Result<Option<EmailTemplateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_email_template_by_name");
        let result = sqlx::query_as::<_, EmailTemplateEntity>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List all templates ordered by name.
    pub async fn list_templates(&self) -> Result<Vec<EmailTemplateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_email_templates");
        let result = sqlx::query_as::<_, EmailTemplateEntity>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM email_templates ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Inserts one dispatch-log row and returns its id.
    pub async fn insert_log(&self, log: &NewEmailLog<'_>) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("insert_email_log");
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO email_logs (template_id, recipient_email, subject, content, status,
                                    error_message, bulk_email_id, registration_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(log.template_id)
        .bind(log.recipient_email)
        .bind(log.subject)
        .bind(log.content)
        .bind(log.status.as_str())
        .bind(log.error_message)
        .bind(log.bulk_email_id)
        .bind(log.registration_id)
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(id)
    }

    /// Updates a log row's status (bulk summary finalization).
    pub async fn update_log_status(
        &self,
        id: i64,
        status: EmailLogStatus,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_email_log_status");
        sqlx::query(
            r#"
            UPDATE email_logs
            SET status = $2, error_message = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    /// Lists dispatch logs, newest first, optionally filtered by status.
    pub async fn list_logs(
        &self,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EmailLogEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_email_logs");
        let result = sqlx::query_as::<_, EmailLogEntity>(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM email_logs
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY sent_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Counts dispatch logs, optionally filtered by status.
    pub async fn count_logs(&self, status: Option<&str>) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_email_logs");
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM email_logs WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(count)
    }
}
