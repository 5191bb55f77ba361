//! The operations behind the `sealnote` command line
//!
//! Each command runs against one store and one user, prompts for the
//! password only when it has to touch note content, and writes its
//! human-readable output to the supplied writer.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::batch;
use crate::codec;
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::export;
use crate::file_ops;
use crate::import;
use crate::note::{DisplayContent, PlainNote};
use crate::password::{PasswordReader, read_password};
use crate::store::{self, NoteStore, NoteUpdate, SaltStore};
use crate::vault::{SessionPolicy, VaultSession};

/// Shown in place of content that failed to decrypt
pub const UNAVAILABLE_MARKER: &str = "[content unavailable: decryption failed]";

pub struct Context<S> {
    pub store: S,
    pub user_id: String,
    pub policy: SessionPolicy,
    pub reader: Box<dyn PasswordReader>,
}

impl<S: SaltStore + NoteStore> Context<S> {
    /// Ask for the password and unlock a session for this user.
    fn unlock(&mut self) -> Result<VaultSession> {
        let salt = self.store.load_salt(&self.user_id)?.ok_or_else(|| {
            SealnoteError::with_kind(
                ErrorCategory::User,
                ErrorKind::NotFound,
                format!(
                    "encryption is not set up for user {}; run `sealnote init` first",
                    self.user_id
                ),
            )
        })?;
        let password = read_password(&mut *self.reader)?;
        let mut session = VaultSession::new(self.policy);
        session.unlock(&password, &salt);
        Ok(session)
    }

    pub fn init(&mut self, out: &mut dyn Write) -> Result<()> {
        let existed = self.store.load_salt(&self.user_id)?.is_some();
        store::setup_salt(&mut self.store, &self.user_id)?;
        if existed {
            write_line(out, format!("encryption already set up for user {}", self.user_id))
        } else {
            write_line(out, format!("encryption set up for user {}", self.user_id))
        }
    }

    pub fn add(
        &mut self,
        title: &str,
        tags: Vec<String>,
        content: String,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut session = self.unlock()?;
        let plain = PlainNote::new(self.user_id.as_str(), title, content, tags);
        let stored = codec::to_storage_form(&mut session, plain)?;
        session.lock();

        let stored = self.store.insert(stored)?;
        info!(note_id = %stored.meta.id, "added note");
        write_line(out, stored.meta.id)
    }

    /// List titles and tags, optionally only those whose title contains
    /// `search` (case-insensitive). Needs no password: list projections
    /// carry no content.
    pub fn list(&mut self, search: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let needle = search.map(str::to_lowercase);
        for note in self.store.list(&self.user_id)? {
            let matches = needle
                .as_deref()
                .is_none_or(|needle| note.meta.title.to_lowercase().contains(needle));
            if !matches {
                continue;
            }
            let tags = if note.meta.tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", note.meta.tags.join(", "))
            };
            write_line(
                out,
                format!(
                    "{}  {}  {}{}",
                    note.meta.id,
                    note.meta.updated_at.format("%Y-%m-%d %H:%M"),
                    note.meta.title,
                    tags
                ),
            )?;
        }
        Ok(())
    }

    pub fn show(&mut self, id: &str, out: &mut dyn Write) -> Result<()> {
        let stored = self.store.get(&self.user_id, id)?;
        let mut session = self.unlock()?;
        let note = codec::to_display_form(&mut session, stored)?;
        session.lock();

        write_line(out, format!("# {}", note.meta.title))?;
        if !note.meta.tags.is_empty() {
            write_line(out, format!("tags: {}", note.meta.tags.join(", ")))?;
        }
        match note.content() {
            DisplayContent::Plaintext(text) => write_line(out, text),
            DisplayContent::Unavailable(_) => write_line(out, UNAVAILABLE_MARKER),
            DisplayContent::Absent => Ok(()),
        }
    }

    pub fn edit(
        &mut self,
        id: &str,
        title: Option<String>,
        tags: Option<Vec<String>>,
        content: Option<String>,
    ) -> Result<()> {
        // Fail on a missing note before asking for a password.
        self.store.get(&self.user_id, id)?;

        let content = match content {
            Some(text) => {
                let mut session = self.unlock()?;
                let envelope = session.encrypt(&text)?;
                session.lock();
                Some(envelope)
            }
            None => None,
        };
        self.store
            .update(&self.user_id, id, NoteUpdate {
                title,
                content,
                tags,
            })?;
        info!(note_id = id, "updated note");
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.store.delete(&self.user_id, id)?;
        info!(note_id = id, "deleted note");
        Ok(())
    }

    /// Decrypt every note and write a plaintext export to `output`.
    pub fn export(&mut self, output: &Path, out: &mut dyn Write) -> Result<()> {
        let mut detailed = Vec::new();
        for projection in self.store.list(&self.user_id)? {
            detailed.push(self.store.get(&self.user_id, &projection.meta.id)?);
        }

        let mut session = self.unlock()?;
        let display = batch::reconcile(&mut session, detailed)?;
        session.lock();

        let outcome = export::build(display);
        let json = outcome.document.to_json_pretty()?;
        file_ops::write_file_atomic(output, json.as_bytes())
            .map_err(|e| e.with_context(format!("failed to write export to {}", output.display())))?;

        write_line(
            out,
            format!(
                "exported {} notes to {}",
                outcome.document.notes.len(),
                output.display()
            ),
        )?;
        for id in &outcome.skipped {
            write_line(out, format!("skipped {}: {}", id, UNAVAILABLE_MARKER))?;
        }
        Ok(())
    }

    /// Re-encrypt the notes of a plaintext export under this user's key.
    pub fn import(&mut self, input: &Path, out: &mut dyn Write) -> Result<()> {
        let json = file_ops::read_text(input)?;
        let notes = import::parse_document(&json, &self.user_id)?;

        let mut session = self.unlock()?;
        let stored = import::reencrypt(&mut session, notes)?;
        session.lock();

        let count = self.store.insert_many(stored)?;
        write_line(out, format!("imported {} notes", count))
    }
}

fn write_line(out: &mut dyn Write, line: impl AsRef<str>) -> Result<()> {
    writeln!(out, "{}", line.as_ref()).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write output",
            e,
        )
    })
}
