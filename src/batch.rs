//! Decrypting collections of notes with per-item failure isolation
//!
//! A corrupt or wrong-key note yields a flagged entry in the output rather
//! than aborting the batch: the output always has one entry per input
//! entry, in the same order.

use tracing::{debug, info};

use crate::codec;
use crate::error::Result;
use crate::note::{DisplayContent, DisplayNote, StoredNote};
use crate::vault::VaultSession;

/// Counts of each outcome in a reconciled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub decrypted: usize,
    pub failed: usize,
    pub absent: usize,
}

impl ReconcileSummary {
    pub fn of(notes: &[DisplayNote]) -> Self {
        notes
            .iter()
            .fold(Self::default(), |mut summary, note| {
                match note.content() {
                    DisplayContent::Plaintext(_) => summary.decrypted += 1,
                    DisplayContent::Unavailable(_) => summary.failed += 1,
                    DisplayContent::Absent => summary.absent += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.decrypted + self.failed + self.absent
    }
}

/// Decrypt every note independently.
///
/// If any note carries content the session must be unlocked; a locked
/// session fails the whole call with
/// [`ErrorKind::VaultLocked`](crate::error::ErrorKind::VaultLocked) before
/// any note is processed. Per-note decryption failures never fail the call.
pub fn reconcile(session: &mut VaultSession, notes: Vec<StoredNote>) -> Result<Vec<DisplayNote>> {
    if notes.iter().any(|note| note.content.is_some()) {
        session.ensure_unlocked()?;
    }

    let display = notes
        .into_iter()
        .map(|note| codec::to_display_form(session, note))
        .collect::<Result<Vec<_>>>()?;

    let summary = ReconcileSummary::of(&display);
    if summary.failed > 0 {
        info!(
            total = summary.total(),
            failed = summary.failed,
            "reconciled notes with decryption failures"
        );
    } else {
        debug!(
            total = summary.total(),
            decrypted = summary.decrypted,
            absent = summary.absent,
            "reconciled notes"
        );
    }
    Ok(display)
}
