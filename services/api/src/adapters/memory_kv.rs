//! services/api/src/adapters/memory_kv.rs
//!
//! An in-process implementation of the `KeyValueNamespace` port with per-key
//! expiry. Expired keys are evicted lazily when read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use startpage_core::clock::Clock;
use startpage_core::ports::{KeyValueNamespace, PortError, PortResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

pub struct MemoryKvNamespace {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryKvNamespace {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored keys, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl KeyValueNamespace for MemoryKvNamespace {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at.map_or(true, |at| now < at) => {
                    return Ok(Some(entry.value.clone()))
                }
                Some(_) => {}
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> PortResult<()> {
        let expires_at = match ttl {
            Some(ttl) => {
                let ttl = chrono::Duration::from_std(ttl)
                    .map_err(|e| PortError::Unexpected(format!("invalid ttl: {e}")))?;
                Some(self.clock.now() + ttl)
            }
            None => None,
        };
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
