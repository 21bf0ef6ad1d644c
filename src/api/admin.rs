//! Admin user management API
//!
//! All routes sit behind `require_auth` + `require_admin`. The same
//! operations are available from the command line for bootstrap, before
//! any admin session exists.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::UserResponse;
use crate::models::UserRole;

/// Request body for creating a user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

/// Request body for changing a user's role
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

/// Request body for resetting a user's password
#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{username}", axum::routing::delete(delete_user))
        .route("/{username}/role", put(set_role))
        .route("/{username}/password", put(reset_password))
}

/// GET /api/v1/admin/users
async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.user_service.list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// POST /api/v1/admin/users
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let role = match body.role.as_deref() {
        None => UserRole::Editor,
        Some(value) => value
            .parse::<UserRole>()
            .map_err(|_| ApiError::validation_error(format!("unknown role '{}'", value)))?,
    };

    let user = state
        .user_service
        .create_user(&body.username, &body.email, &body.password, role)
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// DELETE /api/v1/admin/users/{username}
async fn delete_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    if admin.0.username == username {
        return Err(ApiError::validation_error("cannot delete your own account"));
    }
    state.user_service.delete_user(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/users/{username}/role
async fn set_role(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let role = body
        .role
        .parse::<UserRole>()
        .map_err(|_| ApiError::validation_error(format!("unknown role '{}'", body.role)))?;

    let user = state.user_service.set_role(&username, role).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// PUT /api/v1/admin/users/{username}/password
async fn reset_password(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(body): Json<PasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .user_service
        .reset_password(&username, &body.password)
        .await?;
    Ok(Json(json!({"success": true})))
}
