//! Mapping between plaintext notes and their wire form
//!
//! Only `content` is encrypted. Title, tags and timestamps stay plaintext
//! so stores can list and sort without a key.

use tracing::warn;

use crate::error::Result;
use crate::note::{
    DecryptionFailure, DisplayContent, DisplayNote, PlainNote, StoredContent, StoredNote,
};
use crate::vault::VaultSession;

/// Encrypt a note's content for storage. Notes without content pass
/// through unchanged.
pub fn to_storage_form(session: &mut VaultSession, note: PlainNote) -> Result<StoredNote> {
    let content = match note.content {
        Some(text) => Some(StoredContent::Sealed(session.encrypt(&text)?)),
        None => None,
    };
    Ok(StoredNote {
        meta: note.meta,
        content,
    })
}

/// Decrypt a stored note for display.
///
/// A note whose envelope fails to decrypt comes back flagged with
/// [`DisplayContent::Unavailable`] instead of an error. The only error
/// returned is [`ErrorKind::VaultLocked`](crate::error::ErrorKind::VaultLocked),
/// which concerns the session rather than this note. Notes without content
/// pass through without touching the session.
///
/// Content that never parsed as an envelope is flagged the same way, with
/// the parse error's kind.
pub fn to_display_form(session: &mut VaultSession, note: StoredNote) -> Result<DisplayNote> {
    let Some(stored) = note.content else {
        return Ok(DisplayNote::new(note.meta, DisplayContent::Absent));
    };
    session.ensure_unlocked()?;

    let content = match stored.envelope().and_then(|envelope| session.decrypt(envelope)) {
        Ok(text) => DisplayContent::Plaintext(text),
        Err(e) if e.is_vault_locked() => return Err(e),
        Err(e) => {
            warn!(note_id = %note.meta.id, kind = ?e.kind, "note content could not be decrypted");
            DisplayContent::Unavailable(DecryptionFailure {
                kind: e.kind,
                reason: e.message().to_owned(),
            })
        }
    };
    Ok(DisplayNote::new(note.meta, content))
}
