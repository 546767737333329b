//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::web::state::AppState;

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware that validates the bearer token.
///
/// Missing, unknown and expired tokens all yield 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the Authorization header
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    // 2. Validate the session
    let valid = state.sessions.validate(token).await.map_err(|e| {
        error!("Failed to validate session: {:?}", e);
        ApiError::Unauthorized("Session could not be verified".to_string())
    })?;
    if !valid {
        debug!("Rejected invalid or expired token");
        return Err(ApiError::Unauthorized(
            "Session is invalid or has expired".to_string(),
        ));
    }

    // 3. Continue to the handler
    Ok(next.run(req).await)
}
