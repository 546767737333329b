//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: admin login and password change.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use startpage_core::store::StoreError;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Turns axum's body rejection into the API's JSON error shape.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/login - Exchange the admin password for a session token
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Password missing"),
        (status = 401, description = "Password is incorrect"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(body)?;

    // 1. Reject empty input before touching the store
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }

    // 2. Verify against the stored credentials
    let valid = state
        .documents
        .verify_admin_password(&req.password)
        .await
        .map_err(|e| {
            error!("Failed to verify admin password: {:?}", e);
            ApiError::from(e)
        })?;
    if !valid {
        warn!("Rejected login attempt with a wrong password");
        return Err(ApiError::Unauthorized("Password is incorrect".to_string()));
    }

    // 3. Issue a session token
    let token = state.sessions.create().await.map_err(|e| {
        error!("Failed to create session: {:?}", e);
        ApiError::from(e)
    })?;
    info!("Admin logged in");

    Ok(Json(LoginResponse {
        success: true,
        token,
    }))
}

/// POST /api/admin/password - Replace the admin password
#[utoipa::path(
    post,
    path = "/api/admin/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = SuccessResponse),
        (status = 400, description = "New password missing or too short"),
        (status = 401, description = "Missing session or wrong current password"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(body)?;
    if req.current_password.is_empty() {
        return Err(ApiError::BadRequest("Current password is required".to_string()));
    }

    // Length is enforced by the store.
    state
        .documents
        .change_password(&req.current_password, &req.new_password)
        .await
        .map_err(|e| {
            if matches!(e, StoreError::Port(_) | StoreError::Hash(_)) {
                error!("Failed to change password: {:?}", e);
            }
            ApiError::from(e)
        })?;

    Ok(Json(SuccessResponse { success: true }))
}
