//! services/api/src/adapters/kv_document.rs
//!
//! Stores the document under one fixed key of a key-value namespace. A single
//! `put` replaces the whole value.

use async_trait::async_trait;
use startpage_core::ports::{DocumentBackend, KeyValueNamespace, PortResult};
use std::sync::Arc;

pub struct KvDocumentBackend {
    kv: Arc<dyn KeyValueNamespace>,
    key: String,
}

impl KvDocumentBackend {
    pub fn new(kv: Arc<dyn KeyValueNamespace>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }
}

#[async_trait]
impl DocumentBackend for KvDocumentBackend {
    async fn read(&self) -> PortResult<Option<String>> {
        self.kv.get(&self.key).await
    }

    async fn write(&self, contents: String) -> PortResult<()> {
        self.kv.put(&self.key, contents, None).await
    }
}
