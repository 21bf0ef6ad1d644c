//! Contact API endpoints
//!
//! The public submission route and the admin triage routes. Submissions
//! are stored before the notification emails go out, so mail failures are
//! invisible to the visitor.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ContactResponse, PaginatedResponse};
use crate::models::ContactStatus;
use crate::services::contact::ContactInput;
use crate::services::notify_contact_best_effort;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

/// Request body for the public contact form
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    pub notes: Option<String>,
}

/// Public contact routes
pub fn public_router() -> Router<AppState> {
    Router::new().route("/", post(submit_contact))
}

/// Admin contact routes (behind `require_auth` + `require_admin`)
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts))
        .route("/{id}", get(get_contact).delete(delete_contact))
        .route("/{id}/status", put(set_status))
        .route("/{id}/notes", put(set_notes))
}

/// POST /api/v1/contact
async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = extract_ip_address(&headers).and_then(|s| s.parse().ok()) {
        if state.rate_limiter.is_contact_limited(ip).await {
            return Err(ApiError::rate_limited(
                "Too many submissions, try again later",
            ));
        }
        state.rate_limiter.record_contact_submission(ip).await;
    }

    let submission = state
        .contact_service
        .submit(ContactInput {
            name: body.name,
            email: body.email,
            phone: body.phone,
            message: body.message,
        })
        .await?;

    // Fire the emails without holding up the response
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        notify_contact_best_effort(&mailer, &submission).await;
    });

    Ok((StatusCode::CREATED, Json(json!({"success": true}))))
}

/// GET /api/v1/admin/contacts
async fn list_contacts(
    State(state): State<AppState>,
    Query(params): Query<ContactListParams>,
) -> Result<Json<PaginatedResponse<ContactResponse>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(|s| {
            s.parse::<ContactStatus>()
                .map_err(|_| ApiError::validation_error(format!("unknown status '{}'", s)))
        })
        .transpose()?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let (submissions, total) = state.contact_service.list(status, page, per_page).await?;

    Ok(Json(PaginatedResponse {
        items: submissions.iter().map(ContactResponse::from).collect(),
        total,
        page,
        per_page,
    }))
}

/// GET /api/v1/admin/contacts/{id}
///
/// Viewing a new submission marks it read.
async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ContactResponse>, ApiError> {
    let submission = state.contact_service.get_and_mark_read(id).await?;
    Ok(Json(ContactResponse::from(&submission)))
}

/// PUT /api/v1/admin/contacts/{id}/status
async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = body
        .status
        .parse::<ContactStatus>()
        .map_err(|_| ApiError::validation_error(format!("unknown status '{}'", body.status)))?;

    state.contact_service.set_status(id, status).await?;
    Ok(Json(json!({"success": true})))
}

/// PUT /api/v1/admin/contacts/{id}/notes
async fn set_notes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NotesRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.contact_service.set_notes(id, body.notes).await?;
    Ok(Json(json!({"success": true})))
}

/// DELETE /api/v1/admin/contacts/{id}
async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.contact_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Client IP from proxy headers.
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                return Some(ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}
