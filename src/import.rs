//! Importing plaintext notes under the current session key
//!
//! Import is an explicit all-or-nothing user action: a locked session
//! fails the whole batch before anything is encrypted.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::codec;
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::note::{normalize_tags, NoteMeta, PlainNote, StoredNote, DEFAULT_TITLE};
use crate::vault::VaultSession;

/// Re-wrap plaintext notes for storage under the session's key.
pub fn reencrypt(session: &mut VaultSession, notes: Vec<PlainNote>) -> Result<Vec<StoredNote>> {
    session
        .ensure_unlocked()
        .map_err(|e| e.with_context("cannot import notes while the vault is locked"))?;

    let stored = notes
        .into_iter()
        .map(|note| codec::to_storage_form(session, note))
        .collect::<Result<Vec<_>>>()?;
    debug!(count = stored.len(), "re-encrypted notes");
    Ok(stored)
}

/// One entry of an import document. `content` is the only required field.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportEntry {
    content: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl ImportEntry {
    fn into_plain(self, owner_id: &str, now: DateTime<Utc>) -> PlainNote {
        let created_at = self.created_at.unwrap_or(now);
        PlainNote {
            meta: NoteMeta {
                id: Uuid::new_v4().to_string(),
                title: self
                    .title
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
                tags: normalize_tags(self.tags),
                created_at,
                updated_at: self.updated_at.unwrap_or(created_at),
                owner_id: owner_id.to_owned(),
            },
            content: Some(self.content),
        }
    }
}

/// Parse an import document of the form `{ "notes": [ ... ] }`.
///
/// Each entry is validated on its own and dropped if malformed. Valid
/// entries get fresh ids and are assigned to `owner_id`. A document with
/// no valid entries is rejected with [`ErrorKind::ImportEmpty`].
pub fn parse_document(json: &str, owner_id: &str) -> Result<Vec<PlainNote>> {
    let document: Value = serde_json::from_str(json).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Serialization,
            format!("import document is not valid JSON: {}", e),
            e,
        )
    })?;

    let Some(entries) = document.get("notes").and_then(Value::as_array) else {
        return Err(SealnoteError::invalid_input(
            "invalid import format: expected an object with a \"notes\" array",
        ));
    };

    let now = Utc::now();
    let total = entries.len();
    let notes: Vec<PlainNote> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match ImportEntry::deserialize(entry) {
            Ok(entry) => Some(entry.into_plain(owner_id, now)),
            Err(e) => {
                debug!(index, error = %e, "skipping malformed import entry");
                None
            }
        })
        .collect();

    if notes.is_empty() {
        return Err(SealnoteError::with_kind(
            ErrorCategory::User,
            ErrorKind::ImportEmpty,
            "no valid notes to import",
        ));
    }
    info!(valid = notes.len(), skipped = total - notes.len(), "parsed import document");
    Ok(notes)
}

/// Parse an import document and re-encrypt its valid entries.
pub fn import_document(
    session: &mut VaultSession,
    json: &str,
    owner_id: &str,
) -> Result<Vec<StoredNote>> {
    let notes = parse_document(json, owner_id)?;
    reencrypt(session, notes)
}
