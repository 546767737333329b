//! crates/startpage_core/src/store.rs
//!
//! Load and save of the single document against any `DocumentBackend`.
//!
//! Nothing is cached between calls: every operation re-reads the backend,
//! which is the only source of truth. Concurrent writers are serialised only
//! by the backend's atomic replace, so the last `save` wins.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::credentials::{CredentialHasher, HashError};
use crate::domain::{AdminCredentials, Document};
use crate::events::{EventSink, RecoveryReason, StoreEvent};
use crate::mutation;
use crate::normalise::{Normaliser, ValidationError};
use crate::ports::{DocumentBackend, PortError};

/// Shortest password accepted by `change_password`.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid update: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Port(#[from] PortError),
    #[error("Credential error: {0}")]
    Hash(#[from] HashError),
    #[error("Password is incorrect")]
    WrongPassword,
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    normaliser: Normaliser,
    events: Arc<dyn EventSink>,
}

impl DocumentStore {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        normaliser: Normaliser,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            backend,
            normaliser,
            events,
        }
    }

    pub fn hasher(&self) -> &CredentialHasher {
        self.normaliser.hasher()
    }

    pub fn normaliser(&self) -> &Normaliser {
        &self.normaliser
    }

    /// Reads the document, healing it if needed.
    ///
    /// A missing or unparseable document is replaced by the default document;
    /// a parseable one is normalised and, if anything was repaired, written
    /// back before it is returned. Only backend I/O failures surface as errors.
    pub async fn load(&self) -> StoreResult<Document> {
        let Some(raw) = self.backend.read().await? else {
            return self.recover(RecoveryReason::Missing).await;
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => return self.recover(RecoveryReason::Corrupt(e.to_string())).await,
        };

        let normalised = self.normaliser.normalise(&value)?;
        if normalised.credentials_reset {
            self.emit_credentials_reset();
        }
        if normalised.mutated {
            self.events.emit(StoreEvent::DocumentRepaired {
                repairs: normalised.repairs,
            });
            self.save(&normalised.document).await?;
        }
        Ok(normalised.document)
    }

    /// Writes the whole document, credentials included, in a single backend write.
    pub async fn save(&self, document: &Document) -> StoreResult<()> {
        let contents = serde_json::to_string_pretty(document)
            .map_err(|e| PortError::Unexpected(format!("failed to serialize document: {e}")))?;
        self.backend.write(contents).await?;
        debug!("Document saved.");
        Ok(())
    }

    /// Validates `update` against the current document and persists the merge.
    /// A rejected update leaves the stored document untouched.
    pub async fn apply_update(&self, update: &Value) -> StoreResult<Document> {
        let current = self.load().await?;
        let next = mutation::apply_update(&current, update)?;
        self.save(&next).await?;
        info!(
            apps = next.apps.len(),
            bookmarks = next.bookmarks.len(),
            "Document updated."
        );
        Ok(next)
    }

    /// Checks `password` against the stored admin credentials.
    pub async fn verify_admin_password(&self, password: &str) -> StoreResult<bool> {
        let document = self.load().await?;
        self.verify_off_runtime(password, document.admin).await
    }

    /// Replaces the admin password after checking the current one.
    pub async fn change_password(&self, current: &str, new: &str) -> StoreResult<()> {
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError {
                field: "newPassword".to_string(),
                reason: format!("must be at least {MIN_PASSWORD_LEN} characters"),
            }
            .into());
        }

        let mut document = self.load().await?;
        if !self.verify_off_runtime(current, document.admin.clone()).await? {
            return Err(StoreError::WrongPassword);
        }
        let hasher = self.hasher().clone();
        let new = new.to_string();
        document.admin = tokio::task::spawn_blocking(move || hasher.derive_credentials(&new))
            .await
            .map_err(|e| PortError::Unexpected(format!("key derivation task failed: {e}")))??;
        self.save(&document).await?;
        info!("Admin password changed.");
        Ok(())
    }

    /// Increments the visitor counter and returns the new value.
    pub async fn record_visit(&self) -> StoreResult<u64> {
        let mut document = self.load().await?;
        document.stats.visitor_count = document.stats.visitor_count.saturating_add(1);
        self.save(&document).await?;
        Ok(document.stats.visitor_count)
    }

    /// Argon2 is CPU-bound; keep it off the async workers.
    async fn verify_off_runtime(
        &self,
        password: &str,
        credentials: AdminCredentials,
    ) -> StoreResult<bool> {
        let hasher = self.hasher().clone();
        let password = password.to_string();
        let valid =
            tokio::task::spawn_blocking(move || hasher.verify_credentials(&password, &credentials))
                .await
                .map_err(|e| PortError::Unexpected(format!("key derivation task failed: {e}")))?;
        Ok(valid)
    }

    async fn recover(&self, reason: RecoveryReason) -> StoreResult<Document> {
        let document = self.normaliser.default_document()?;
        self.events.emit(StoreEvent::DefaultDocumentCreated { reason });
        self.emit_credentials_reset();
        self.save(&document).await?;
        Ok(document)
    }

    fn emit_credentials_reset(&self) {
        self.events.emit(StoreEvent::CredentialsReset {
            default_password: self.normaliser.config().default_admin_password.clone(),
        });
    }
}
