//! crates/startpage_core/src/events.rs
//!
//! Structured events emitted when the document store heals itself, so that
//! operators (through logs) and tests (through a recording sink) can observe
//! credential resets and repairs.

use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryReason {
    /// Nothing was stored yet.
    Missing,
    /// The stored text was not valid JSON.
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    DefaultDocumentCreated { reason: RecoveryReason },
    /// The admin password now equals the configured default.
    CredentialsReset { default_password: String },
    DocumentRepaired { repairs: Vec<String> },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: StoreEvent);
}

/// Writes every event to the `tracing` log at WARN.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: StoreEvent) {
        match event {
            StoreEvent::DefaultDocumentCreated { reason } => match reason {
                RecoveryReason::Missing => {
                    warn!("No stored document found; created the default document.")
                }
                RecoveryReason::Corrupt(detail) => warn!(
                    error = %detail,
                    "Stored document could not be parsed; replaced it with the default document."
                ),
            },
            StoreEvent::CredentialsReset { default_password } => warn!(
                password = %default_password,
                "Admin credentials were missing or invalid and have been reset to the default password."
            ),
            StoreEvent::DocumentRepaired { repairs } => warn!(
                count = repairs.len(),
                repairs = ?repairs,
                "Stored document was repaired and written back."
            ),
        }
    }
}

/// Keeps events in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<StoreEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn credential_resets(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, StoreEvent::CredentialsReset { .. }))
            .count()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: StoreEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
