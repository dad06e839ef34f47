//! Email routes: template CRUD, single and bulk sends, dispatch logs.
//!
//! All admin-gated.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminUser;
use crate::services::email::{BulkRecipient, BulkRecipientOutcome};
use domain::models::{EmailLog, EmailTemplate};
use domain::services::template::TemplateVars;
use shared::pagination::PageParams;

/// Request body for template creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    pub subject: String,
    pub content: String,
    pub variables: Option<serde_json::Value>,
    #[serde(default = "default_template_type")]
    pub template_type: String,
}

fn default_template_type() -> String {
    "notification".to_string()
}

/// Envelope for one template.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    pub success: bool,
    pub template: EmailTemplate,
}

/// POST /api/v1/email/templates
///
/// Template names are unique; a duplicate returns 409.
pub async fn create_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateResponse>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::Validation("Template name is required".to_string()));
    }

    let template = state
        .email
        .templates()
        .create_template(
            request.name.trim(),
            &request.subject,
            &request.content,
            request.variables.as_ref(),
            &request.template_type,
        )
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict(format!("Template '{}' already exists", request.name.trim()))
            }
            other => other,
        })?;

    Ok((
        StatusCode::CREATED,
        Json(TemplateResponse {
            success: true,
            template: template.into(),
        }),
    ))
}

/// Envelope for the template listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<EmailTemplate>,
}

/// GET /api/v1/email/templates
pub async fn list_templates(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<TemplateListResponse>, ApiError> {
    let templates = state.email.templates().list_templates().await?;

    Ok(Json(TemplateListResponse {
        success: true,
        templates: templates.into_iter().map(Into::into).collect(),
    }))
}

/// Request body for a template update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub name: String,
    pub subject: String,
    pub content: String,
    pub variables: Option<serde_json::Value>,
}

/// PUT /api/v1/email/templates/:id
pub async fn update_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = state
        .email
        .templates()
        .update_template(
            id,
            &request.name,
            &request.subject,
            &request.content,
            request.variables.as_ref(),
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Template not found".to_string()))?;

    Ok(Json(TemplateResponse {
        success: true,
        template: template.into(),
    }))
}

/// Request body for a single templated send.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub template_id: i64,
    pub to: String,
    #[serde(default)]
    pub variables: TemplateVars,
}

/// Envelope for a single send.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message: String,
    pub log_id: i64,
}

/// POST /api/v1/email/send
pub async fn send(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let template = state
        .email
        .templates()
        .find_template(request.template_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Email template not found".to_string()))?;

    let log_id = state
        .email
        .send_templated(&request.to, &template, &request.variables, None)
        .await?;

    Ok(Json(SendEmailResponse {
        success: true,
        message: "Email sent successfully".to_string(),
        log_id,
    }))
}

/// One recipient in a bulk send request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRecipientRequest {
    pub email: String,
    pub registration_id: Option<Uuid>,
    #[serde(default)]
    pub variables: TemplateVars,
}

/// Request body for a bulk send.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBulkRequest {
    pub template_id: i64,
    pub recipients: Vec<BulkRecipientRequest>,
}

/// Envelope for a bulk send report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBulkResponse {
    pub success: bool,
    pub total_sent: usize,
    pub total_failed: usize,
    pub results: Vec<BulkRecipientOutcome>,
}

/// POST /api/v1/email/send-bulk
///
/// Recipients are processed in batches of ten, concurrent within a batch;
/// each recipient is logged individually and a summary row closes the batch.
pub async fn send_bulk(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<SendBulkRequest>,
) -> Result<Json<SendBulkResponse>, ApiError> {
    if request.recipients.is_empty() {
        return Err(ApiError::Validation("No recipients provided".to_string()));
    }

    let template = state
        .email
        .templates()
        .find_template(request.template_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Email template not found".to_string()))?;

    let recipients: Vec<BulkRecipient> = request
        .recipients
        .into_iter()
        .map(|r| BulkRecipient {
            email: r.email,
            registration_id: r.registration_id,
            variables: r.variables,
        })
        .collect();

    let report = state.email.send_bulk(&template, &recipients).await?;

    Ok(Json(SendBulkResponse {
        success: true,
        total_sent: report.total_sent,
        total_failed: report.total_failed,
        results: report.results,
    }))
}

/// Query parameters for the log listing.
///
/// page/limit are kept as plain fields (serde_urlencoded cannot parse
/// numbers through a flattened struct).
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

impl LogsQuery {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Envelope for the dispatch-log listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub success: bool,
    pub logs: Vec<EmailLog>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// GET /api/v1/email/logs
pub async fn list_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let page = query.page_params();
    let logs = state
        .email
        .templates()
        .list_logs(query.status.as_deref(), page.limit(), page.offset())
        .await?;

    let total = state
        .email
        .templates()
        .count_logs(query.status.as_deref())
        .await?;

    Ok(Json(LogsResponse {
        success: true,
        logs: logs.into_iter().map(Into::into).collect(),
        total,
        page: page.page(),
        limit: page.limit(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_template_request_defaults_type() {
        let request: CreateTemplateRequest = serde_json::from_value(serde_json::json!({
            "name": "event_update",
            "subject": "Update for {{event}}",
            "content": "Hi {{name}}"
        }))
        .unwrap();
        assert_eq!(request.template_type, "notification");
    }

    #[test]
    fn test_send_bulk_request_shape() {
        let request: SendBulkRequest = serde_json::from_value(serde_json::json!({
            "templateId": 2,
            "recipients": [
                { "email": "a@x.example", "variables": { "name": "A" } },
                { "email": "b@x.example", "registrationId": Uuid::new_v4() }
            ]
        }))
        .unwrap();
        assert_eq!(request.recipients.len(), 2);
        assert!(request.recipients[1].variables.is_empty());
    }
}
