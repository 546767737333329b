//! crates/startpage_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to run unchanged against a filesystem, a key-value namespace, or test doubles.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::WeatherReport;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., file system, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Upstream service error: {message}")]
    Upstream { message: String, retryable: bool },
    #[error("Upstream request timed out")]
    Timeout,
}

impl PortError {
    /// An upstream failure worth retrying (5xx, connection reset).
    pub fn upstream_retryable(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable: true,
        }
    }

    /// An upstream failure that will not improve on retry (4xx, malformed payload).
    pub fn upstream_fatal(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the operation that produced this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortError::Upstream { retryable, .. } => *retryable,
            PortError::Timeout => true,
            _ => false,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The medium holding the single serialized document.
///
/// `write` must replace the whole document in one step: a concurrent `read`
/// observes either the previous or the new contents, never a mix.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Returns the raw stored text, or `None` when nothing has been stored yet.
    async fn read(&self) -> PortResult<Option<String>>;

    async fn write(&self, contents: String) -> PortResult<()>;
}

/// Issues and checks bearer tokens. Each token's lifecycle is independent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session and returns its opaque token.
    async fn create(&self) -> PortResult<String>;

    /// True iff a live session exists for `token`. The TTL is absolute; a
    /// successful validation never extends it.
    async fn validate(&self, token: &str) -> PortResult<bool>;

    /// Removes every session older than the TTL and returns how many went.
    async fn revoke_expired(&self) -> PortResult<usize>;
}

/// A flat string namespace with optional per-key expiry, modelled on edge KV bindings.
#[async_trait]
pub trait KeyValueNamespace: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> PortResult<()>;

    async fn delete(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Current conditions for a city name.
    async fn current(&self, city: &str) -> PortResult<WeatherReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(PortError::upstream_retryable("502 from geocoder").is_retryable());
        assert!(!PortError::upstream_fatal("404 from geocoder").is_retryable());
        assert!(PortError::Timeout.is_retryable());
        assert!(!PortError::NotFound("x".into()).is_retryable());
    }
}
