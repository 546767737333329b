//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is reported to HTTP clients.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use startpage_core::credentials::HashError;
use startpage_core::normalise::ValidationError;
use startpage_core::ports::PortError;
use startpage_core::store::StoreError;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed or incomplete client input.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    #[error("Not found")]
    NotFound,

    /// The weather provider failed after retries.
    #[error("Upstream error: {0}")]
    BadGateway(String),

    /// The weather provider did not answer in time.
    #[error("Upstream timed out")]
    UpstreamTimeout,

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    #[error("Credential error: {0}")]
    Hash(#[from] HashError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(v) => v.into(),
            StoreError::Port(p) => ApiError::Port(p),
            StoreError::Hash(h) => ApiError::Hash(h),
            StoreError::WrongPassword => ApiError::Unauthorized("Password is incorrect".to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamTimeout => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Config(_)
            | ApiError::Port(_)
            | ApiError::Hash(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the log; clients get a generic message.
        let message = match &self {
            ApiError::BadGateway(_) | ApiError::UpstreamTimeout => self.to_string(),
            _ if status.is_server_error() => {
                error!("Request failed: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(StoreError::WrongPassword).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::UpstreamTimeout.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::Port(PortError::Unexpected("disk".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_become_bad_requests() {
        let err: ApiError = ValidationError {
            field: "settings.siteName".into(),
            reason: "site name must not be empty".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "settings.siteName: site name must not be empty");
    }
}
