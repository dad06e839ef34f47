//! Registration routes: participant submission plus admin review actions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminUser;
use crate::services::registration::{BulkActionOutcome, RegistrationDetail, SubmitRegistration};
use domain::models::{EventInfo, Registration, RegistrationStatus, TemplateKind};
use domain::services::template::TemplateVars;
use persistence::repositories::RegistrationFilters;
use std::str::FromStr;

/// One participant entry in the submission payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantNameInput {
    #[serde(default)]
    pub name: String,
}

/// Request body for registration submission.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Event code is required"))]
    pub event_code: String,

    pub team_lead_name: Option<ParticipantNameInput>,

    #[validate(email(message = "A valid contact email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "WhatsApp number is required"))]
    pub whatsapp_number: String,

    pub alternate_phone: Option<String>,

    #[validate(length(min = 1, message = "College is required"))]
    pub college: String,

    pub payment_screenshot_url: Option<String>,
    pub upi_transaction_id: Option<String>,

    #[serde(default)]
    pub participant_names: Vec<ParticipantNameInput>,
}

/// Envelope for a single registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub success: bool,
    pub registration: RegistrationDetail,
}

/// POST /api/v1/participant/register
///
/// Public. Validates and persists a registration with its roster in one
/// transaction; returns 201 with the pending registration.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    request.validate()?;

    let input = SubmitRegistration {
        event_code: request.event_code,
        team_lead_name: request.team_lead_name.map(|p| p.name),
        email: request.email,
        whatsapp_number: request.whatsapp_number,
        alternate_phone: request.alternate_phone,
        college: request.college,
        payment_screenshot_url: request.payment_screenshot_url,
        upi_transaction_id: request.upi_transaction_id,
        participant_names: request.participant_names.into_iter().map(|p| p.name).collect(),
    };

    let detail = state.workflow.submit(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            success: true,
            registration: detail,
        }),
    ))
}

/// Envelope for the event catalog.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub success: bool,
    pub events: Vec<EventInfo>,
}

/// GET /api/v1/participant/events
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<EventsResponse>, ApiError> {
    let events = state.workflow.list_events().await?;
    Ok(Json(EventsResponse {
        success: true,
        events,
    }))
}

/// Listing filters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub day: Option<String>,
    pub event: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// A registration with its aggregated roster, as listed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationListItem {
    #[serde(flatten)]
    pub registration: Registration,
    pub participant_names: Option<String>,
    pub participant_count: i64,
}

/// Envelope for the registration listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationListResponse {
    pub success: bool,
    pub registrations: Vec<RegistrationListItem>,
}

/// GET /api/v1/participant/registrations
///
/// Admin. Optional day/event/status/search filters.
pub async fn list_registrations(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<RegistrationListResponse>, ApiError> {
    let filters = RegistrationFilters {
        day: query.day,
        event: query.event,
        status: query.status,
        search: query.search,
    };

    let rows = state.workflow.list(&filters).await?;

    let registrations = rows
        .into_iter()
        .map(|row| RegistrationListItem {
            registration: row.registration.into(),
            participant_names: row.participant_names,
            participant_count: row.participant_count,
        })
        .collect();

    Ok(Json(RegistrationListResponse {
        success: true,
        registrations,
    }))
}

/// GET /api/v1/participant/registration/:id
pub async fn get_registration(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let detail = state.workflow.get(id).await?;
    Ok(Json(RegistrationResponse {
        success: true,
        registration: detail,
    }))
}

/// Request body for a status decision.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: RegistrationStatus,
    pub reason: Option<String>,
}

/// Envelope for a status decision.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub message: String,
    pub registration: Registration,
}

/// POST /api/v1/participant/registration/:id/status
///
/// Admin. Approval forces payment completion; rejection requires a reason.
/// The notification email is dispatched after commit, best-effort.
pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let registration = state
        .workflow
        .update_status(id, request.status, request.reason)
        .await?;

    Ok(Json(UpdateStatusResponse {
        success: true,
        message: format!("Registration {} successfully", request.status),
        registration,
    }))
}

/// Request body for a verification note.
#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub note: String,
}

/// Plain acknowledgement envelope.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/v1/participant/registration/:id/note
pub async fn add_note(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AddNoteRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    state
        .workflow
        .add_verification_note(id, &request.note, &admin.0.email)
        .await?;

    Ok(Json(AckResponse {
        success: true,
        message: "Verification note added successfully".to_string(),
    }))
}

/// Request body for an email resend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendEmailRequest {
    pub template_type: String,
    pub reason: Option<String>,
}

/// POST /api/v1/participant/registration/:id/resend-email
pub async fn resend_email(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ResendEmailRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let kind = TemplateKind::from_str(&request.template_type)
        .map_err(|_| ApiError::Validation("Invalid email template type".to_string()))?;

    state
        .workflow
        .resend_email(id, kind, request.reason.as_deref())
        .await?;

    Ok(Json(AckResponse {
        success: true,
        message: format!("{} email resent successfully", request.template_type),
    }))
}

/// Request body for a payment-proof update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentInfoRequest {
    pub upi_transaction_id: Option<String>,
    pub payment_screenshot_url: Option<String>,
}

/// Envelope for a payment-proof update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentInfoResponse {
    pub success: bool,
    pub message: String,
    pub registration: Registration,
}

/// POST /api/v1/participant/registration/:id/payment
///
/// Public: participants attach their UPI reference and screenshot.
pub async fn update_payment_info(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentInfoRequest>,
) -> Result<Json<UpdatePaymentInfoResponse>, ApiError> {
    let registration = state
        .workflow
        .update_payment_info(
            id,
            request.upi_transaction_id.as_deref(),
            request.payment_screenshot_url.as_deref(),
        )
        .await?;

    Ok(Json(UpdatePaymentInfoResponse {
        success: true,
        message: "Payment information updated".to_string(),
        registration,
    }))
}

/// Request body for a bulk action.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionRequest {
    pub ids: Vec<Uuid>,
    pub template_id: i64,
    #[serde(default)]
    pub variables: TemplateVars,
}

/// Envelope for the per-id bulk outcomes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionResponse {
    pub success: bool,
    pub results: Vec<BulkActionOutcome>,
}

/// POST /api/v1/participant/bulk-action
///
/// Admin. One templated email per selected registration; outcomes are
/// independent.
pub async fn bulk_action(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<BulkActionRequest>,
) -> Result<Json<BulkActionResponse>, ApiError> {
    let results = state
        .workflow
        .bulk_action(&request.ids, request.template_id, request.variables)
        .await?;

    Ok(Json(BulkActionResponse {
        success: true,
        results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_deserializes_original_shape() {
        let json = serde_json::json!({
            "eventCode": "TALSUTRA",
            "teamLeadName": { "name": "Ravi" },
            "email": "ravi@college.example",
            "whatsappNumber": "9876543210",
            "college": "NIT",
            "participantNames": [
                { "name": "Ravi" },
                { "name": "Asha" }
            ]
        });

        let request: RegisterRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.event_code, "TALSUTRA");
        assert_eq!(request.team_lead_name.unwrap().name, "Ravi");
        assert_eq!(request.participant_names.len(), 2);
    }

    #[test]
    fn test_register_request_validates_email() {
        let request = RegisterRequest {
            event_code: "TALSUTRA".into(),
            team_lead_name: None,
            email: "not-an-email".into(),
            whatsapp_number: "9876543210".into(),
            alternate_phone: None,
            college: "NIT".into(),
            payment_screenshot_url: None,
            upi_transaction_id: None,
            participant_names: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_status_request_parses_status() {
        let json = serde_json::json!({ "status": "approved" });
        let request: UpdateStatusRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.status, RegistrationStatus::Approved);

        let json = serde_json::json!({ "status": "rejected", "reason": "blurry screenshot" });
        let request: UpdateStatusRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.status, RegistrationStatus::Rejected);
        assert_eq!(request.reason.as_deref(), Some("blurry screenshot"));
    }

    #[test]
    fn test_bulk_action_request_defaults_variables() {
        let json = serde_json::json!({
            "ids": [Uuid::new_v4()],
            "templateId": 3
        });
        let request: BulkActionRequest = serde_json::from_value(json).unwrap();
        assert!(request.variables.is_empty());
    }
}
