//! Note records in their three shapes
//!
//! - [`StoredNote`]: wire form. `content` is an [`Envelope`], absent, or
//!   (when read back from a damaged store) whatever JSON was found there.
//!   This is the only shape a note store accepts or returns.
//! - [`PlainNote`]: plaintext content awaiting encryption (new notes,
//!   edits, imports).
//! - [`DisplayNote`]: the result of decrypting a stored note, where the
//!   content is plaintext, absent, or unavailable because decryption failed.
//!
//! Title, tags, timestamps and owner are plaintext metadata in every shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::aead::Envelope;
use crate::error::{ErrorKind, Result, SealnoteError};

/// Title given to notes created or imported without one
pub const DEFAULT_TITLE: &str = "Untitled";

/// Plaintext metadata shared by every note shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMeta {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: String,
}

impl NoteMeta {
    /// Metadata for a brand new note with a fresh id and both timestamps
    /// set to now. An empty title becomes [`DEFAULT_TITLE`].
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>, tags: Vec<String>) -> Self {
        let now = Utc::now();
        let title = title.into();
        Self {
            id: Uuid::new_v4().to_string(),
            title: if title.is_empty() {
                DEFAULT_TITLE.to_owned()
            } else {
                title
            },
            tags: normalize_tags(tags),
            created_at: now,
            updated_at: now,
            owner_id: owner_id.into(),
        }
    }
}

/// Trim each tag and drop the ones left empty.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Encrypted content as held by a store.
///
/// Anything that does not parse as an envelope is kept verbatim as
/// `Malformed`, so one damaged note neither hides the others nor gets
/// rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredContent {
    Sealed(Envelope),
    Malformed(Value),
}

impl StoredContent {
    /// The envelope, or the reason this content cannot be one.
    pub fn envelope(&self) -> Result<&Envelope> {
        match self {
            StoredContent::Sealed(envelope) => Ok(envelope),
            StoredContent::Malformed(raw) => Err(Envelope::from_wire_value(raw)
                .err()
                .unwrap_or_else(|| {
                    SealnoteError::invalid_input("stored content is not a valid envelope")
                })),
        }
    }

    pub fn sealed(&self) -> Option<&Envelope> {
        match self {
            StoredContent::Sealed(envelope) => Some(envelope),
            StoredContent::Malformed(_) => None,
        }
    }
}

impl From<Envelope> for StoredContent {
    fn from(envelope: Envelope) -> Self {
        StoredContent::Sealed(envelope)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNote {
    #[serde(flatten)]
    pub meta: NoteMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<StoredContent>,
}

impl StoredNote {
    /// The list projection of this note: same metadata, content omitted.
    pub fn projection(&self) -> StoredNote {
        StoredNote {
            meta: self.meta.clone(),
            content: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainNote {
    pub meta: NoteMeta,
    pub content: Option<String>,
}

impl PlainNote {
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            meta: NoteMeta::new(owner_id, title, tags),
            content: Some(content.into()),
        }
    }
}

/// Why a note's content could not be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionFailure {
    pub kind: Option<ErrorKind>,
    pub reason: String,
}

/// Outcome of decrypting one note's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayContent {
    /// The stored note carried no content (list projection).
    Absent,
    Plaintext(String),
    /// Decryption failed; the note is shown as unavailable.
    Unavailable(DecryptionFailure),
}

impl DisplayContent {
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            DisplayContent::Plaintext(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, DisplayContent::Absent)
    }
}

/// A decrypted (or flagged) note ready to show or export.
///
/// Serializes with `content` as a string, `null` when unavailable, or
/// omitted when absent, plus a `decryptionFailed` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNote {
    #[serde(flatten)]
    pub meta: NoteMeta,
    #[serde(
        skip_serializing_if = "DisplayContent::is_absent",
        serialize_with = "serialize_display_content"
    )]
    content: DisplayContent,
    decryption_failed: bool,
}

impl DisplayNote {
    pub(crate) fn new(meta: NoteMeta, content: DisplayContent) -> Self {
        let decryption_failed = matches!(content, DisplayContent::Unavailable(_));
        Self {
            meta,
            content,
            decryption_failed,
        }
    }

    pub fn content(&self) -> &DisplayContent {
        &self.content
    }

    pub fn decryption_failed(&self) -> bool {
        self.decryption_failed
    }

    pub fn into_parts(self) -> (NoteMeta, DisplayContent) {
        (self.meta, self.content)
    }
}

fn serialize_display_content<S: Serializer>(
    content: &DisplayContent,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match content {
        DisplayContent::Plaintext(text) => serializer.serialize_str(text),
        DisplayContent::Absent | DisplayContent::Unavailable(_) => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aead::{IV_LEN, TAG_LEN};

    fn meta() -> NoteMeta {
        NoteMeta::new("user-1", "Groceries", vec!["home".into(), "todo".into()])
    }

    #[test]
    fn test_new_meta_defaults() {
        let m = NoteMeta::new("user-1", "", vec![]);
        assert_eq!(m.title, DEFAULT_TITLE);
        assert_eq!(m.created_at, m.updated_at);
        assert!(Uuid::parse_str(&m.id).is_ok());
    }

    #[test]
    fn test_stored_note_omits_absent_content() {
        let note = StoredNote {
            meta: meta(),
            content: None,
        };
        let json = serde_json::to_value(&note).unwrap();

        assert!(json.get("content").is_none());
        assert_eq!(json["ownerId"], "user-1");
        assert_eq!(json["tags"], serde_json::json!(["home", "todo"]));
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_stored_note_json_round_trip() {
        let envelope =
            Envelope::from_parts(&[1u8; IV_LEN], vec![9, 8, 7], &[2u8; TAG_LEN]).unwrap();
        let note = StoredNote {
            meta: meta(),
            content: Some(envelope.into()),
        };

        let json = serde_json::to_string(&note).unwrap();
        let back: StoredNote = serde_json::from_str(&json).unwrap();

        assert_eq!(back, note);
        assert_eq!(back.projection().content, None);
    }

    #[test]
    fn test_damaged_content_is_kept_verbatim() {
        let mut json = serde_json::to_value(StoredNote {
            meta: meta(),
            content: None,
        })
        .unwrap();
        let raw = serde_json::json!({"iv": "00", "encrypted": "", "authTag": "0202"});
        json["content"] = raw.clone();

        let note: StoredNote = serde_json::from_value(json).unwrap();

        let content = note.content.as_ref().unwrap();
        assert_eq!(content, &StoredContent::Malformed(raw.clone()));
        assert!(content.sealed().is_none());
        assert!(content.envelope().unwrap_err().is_invalid_input());
        assert_eq!(serde_json::to_value(&note).unwrap()["content"], raw);
    }

    #[test]
    fn test_tags_are_trimmed() {
        let m = NoteMeta::new(
            "user-1",
            "t",
            vec![" work ".into(), "".into(), "  ".into(), "home".into()],
        );
        assert_eq!(m.tags, vec!["work".to_string(), "home".to_string()]);
    }

    #[test]
    fn test_display_note_serialization() {
        let ok = DisplayNote::new(meta(), DisplayContent::Plaintext("milk".into()));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["content"], "milk");
        assert_eq!(json["decryptionFailed"], false);

        let failed = DisplayNote::new(
            meta(),
            DisplayContent::Unavailable(DecryptionFailure {
                kind: Some(ErrorKind::AuthenticationFailed),
                reason: "bad tag".into(),
            }),
        );
        let json = serde_json::to_value(&failed).unwrap();
        assert!(json["content"].is_null());
        assert_eq!(json["decryptionFailed"], true);

        let absent = DisplayNote::new(meta(), DisplayContent::Absent);
        let json = serde_json::to_value(&absent).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["decryptionFailed"], false);
    }
}
