//! crates/startpage_core/src/mutation.rs
//!
//! The strict write path: validates a client's partial update and merges it
//! into the current document.

use serde_json::Value;

use crate::domain::{CollectionKind, Document};
use crate::normalise::{validate_collection, validate_settings, Checker, Strictness, ValidationError};

/// Validates `update` and produces the next full document.
///
/// - `settings` is required and must carry a non-blank `siteName`; its other
///   sub-fields keep their current values when omitted.
/// - `apps` / `bookmarks` replace the current collections when present and
///   must be arrays of items with a name and a url. Omitted collections are
///   kept unchanged.
/// - `stats` and `admin` are always carried over from `current`.
///
/// Nothing in `current` is modified; on error the caller persists nothing.
pub fn apply_update(current: &Document, update: &Value) -> Result<Document, ValidationError> {
    let Some(update) = update.as_object() else {
        return Err(ValidationError {
            field: "body".to_string(),
            reason: "request body must be a JSON object".to_string(),
        });
    };

    let mut c = Checker::new(Strictness::Strict);
    let settings = validate_settings(&mut c, update.get("settings"), &current.settings)?;

    let apps = match update.get("apps") {
        None => current.apps.clone(),
        raw => validate_collection(&mut c, raw, CollectionKind::Apps)?,
    };
    let bookmarks = match update.get("bookmarks") {
        None => current.bookmarks.clone(),
        raw => validate_collection(&mut c, raw, CollectionKind::Bookmarks)?,
    };

    Ok(Document {
        settings,
        apps,
        bookmarks,
        stats: current.stats.clone(),
        admin: current.admin.clone(),
    })
}
