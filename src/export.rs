//! Plaintext export documents
//!
//! Export is the one place where note content is intentionally serialized
//! in plaintext, for a user-initiated copy outside the vault. The document
//! shape is what [`import::parse_document`](crate::import::parse_document)
//! reads back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch;
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::note::{DisplayContent, DisplayNote, StoredNote};
use crate::vault::VaultSession;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedNote {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub notes: Vec<ExportedNote>,
}

impl ExportDocument {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Serialization,
                "failed to serialize export document",
                e,
            )
        })
    }
}

/// An export document plus the ids of notes left out of it.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub document: ExportDocument,
    /// Notes whose content could not be decrypted or was not loaded.
    pub skipped: Vec<String>,
}

/// Build an export from already reconciled notes.
pub fn build(notes: Vec<DisplayNote>) -> ExportOutcome {
    let mut exported = Vec::with_capacity(notes.len());
    let mut skipped = Vec::new();

    for note in notes {
        let (meta, content) = note.into_parts();
        match content {
            DisplayContent::Plaintext(text) => exported.push(ExportedNote {
                title: meta.title,
                content: text,
                tags: meta.tags,
                created_at: meta.created_at,
                updated_at: meta.updated_at,
            }),
            DisplayContent::Unavailable(_) | DisplayContent::Absent => skipped.push(meta.id),
        }
    }

    if !skipped.is_empty() {
        warn!(skipped = skipped.len(), "some notes were left out of the export");
    }
    info!(exported = exported.len(), "built export document");

    ExportOutcome {
        document: ExportDocument {
            exported_at: Utc::now(),
            notes: exported,
        },
        skipped,
    }
}

/// Decrypt detail-form notes and build an export from them.
pub fn export_notes(session: &mut VaultSession, notes: Vec<StoredNote>) -> Result<ExportOutcome> {
    let display = batch::reconcile(session, notes)?;
    Ok(build(display))
}
