//! services/api/src/adapters/kv_sessions.rs
//!
//! Session store backed by a key-value namespace. Each session is one key
//! written with a native TTL, so there is nothing to sweep; the stored
//! creation time is still checked on use in case the namespace evicts late.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use startpage_core::clock::Clock;
use startpage_core::ports::{KeyValueNamespace, PortError, PortResult, SessionStore};
use std::sync::Arc;
use uuid::Uuid;

const KEY_PREFIX: &str = "session:";

pub struct KvSessionStore {
    kv: Arc<dyn KeyValueNamespace>,
    clock: Arc<dyn Clock>,
    ttl: std::time::Duration,
}

impl KvSessionStore {
    pub fn new(kv: Arc<dyn KeyValueNamespace>, ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock, ttl }
    }

    fn key(token: &str) -> String {
        format!("{KEY_PREFIX}{token}")
    }
}

#[async_trait]
impl SessionStore for KvSessionStore {
    async fn create(&self) -> PortResult<String> {
        let token = Uuid::new_v4().to_string();
        let created_at = self.clock.now().to_rfc3339();
        self.kv
            .put(&Self::key(&token), created_at, Some(self.ttl))
            .await?;
        Ok(token)
    }

    async fn validate(&self, token: &str) -> PortResult<bool> {
        // Tokens are UUIDs; anything else cannot name a stored key.
        if Uuid::parse_str(token).is_err() {
            return Ok(false);
        }
        let key = Self::key(token);
        let Some(created_at) = self.kv.get(&key).await? else {
            return Ok(false);
        };

        let ttl = Duration::from_std(self.ttl)
            .map_err(|e| PortError::Unexpected(format!("invalid session ttl: {e}")))?;
        let live = DateTime::parse_from_rfc3339(&created_at)
            .map(|at| self.clock.now() - at.with_timezone(&Utc) < ttl)
            .unwrap_or(false);
        if !live {
            self.kv.delete(&key).await?;
        }
        Ok(live)
    }

    async fn revoke_expired(&self) -> PortResult<usize> {
        Ok(0)
    }
}
