//! services/api/src/adapters/memory_sessions.rs
//!
//! In-process session store for the long-running server. Expired sessions are
//! dropped lazily on use and in bulk by a periodic sweeper task.

use async_trait::async_trait;
use chrono::Duration;
use startpage_core::clock::Clock;
use startpage_core::domain::SessionRecord;
use startpage_core::ports::{PortError, PortResult, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct InMemorySessionStore {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> PortResult<Self> {
        let ttl = Duration::from_std(ttl)
            .map_err(|e| PortError::Unexpected(format!("invalid session ttl: {e}")))?;
        Ok(Self {
            ttl,
            clock,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn is_live(&self, record: &SessionRecord) -> bool {
        self.clock.now() - record.created_at < self.ttl
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> PortResult<String> {
        let token = Uuid::new_v4().to_string();
        let now = self.clock.now();
        self.sessions.write().await.insert(
            token.clone(),
            SessionRecord {
                token: token.clone(),
                created_at: now,
                last_seen: now,
            },
        );
        debug!("Session created.");
        Ok(token)
    }

    async fn validate(&self, token: &str) -> PortResult<bool> {
        let mut sessions = self.sessions.write().await;
        let Some(record) = sessions.get_mut(token) else {
            return Ok(false);
        };
        if !self.is_live(record) {
            sessions.remove(token);
            debug!("Expired session rejected and removed.");
            return Ok(false);
        }
        // Bookkeeping only; the expiry stays anchored to `created_at`.
        record.last_seen = self.clock.now();
        Ok(true)
    }

    async fn revoke_expired(&self) -> PortResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = self.clock.now();
        sessions.retain(|_, record| now - record.created_at < self.ttl);
        Ok(before - sessions.len())
    }
}

/// Spawns a task that calls `revoke_expired` every `interval` until `cancel`
/// fires.
pub fn spawn_session_sweeper(
    store: Arc<dyn SessionStore>,
    interval: std::time::Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // `interval` panics on a zero period.
        let mut ticker = tokio::time::interval(interval.max(std::time::Duration::from_millis(1)));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Session sweeper stopped.");
                    break;
                }
                _ = ticker.tick() => match store.revoke_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Expired sessions swept."),
                    Err(e) => warn!("Session sweep failed: {}", e),
                },
            }
        }
    })
}
