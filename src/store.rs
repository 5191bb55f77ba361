//! Storage collaborators
//!
//! Stores only ever see wire-form notes ([`StoredNote`]) and salts. They
//! scope every read and write by owner id, and have no way to decrypt
//! content.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::aead::Envelope;
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::file_ops;
use crate::kdf::Salt;
use crate::note::{normalize_tags, StoredContent, StoredNote, DEFAULT_TITLE};

/// Per-user salt lookup and one-time setup.
pub trait SaltStore {
    /// The user's salt, or `None` if key setup has not happened yet.
    fn load_salt(&self, user_id: &str) -> Result<Option<Salt>>;

    /// Persist `salt` for `user_id` unless one is already stored.
    ///
    /// Returns the salt that is in effect afterwards, which is the
    /// previously stored one if setup already happened.
    fn store_salt_once(&mut self, user_id: &str, salt: &Salt) -> Result<Salt>;
}

/// Changes applied by [`NoteStore::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<Envelope>,
    pub tags: Option<Vec<String>>,
}

/// Owner-scoped storage of wire-form notes.
///
/// A note owned by someone else behaves exactly like a missing note.
pub trait NoteStore {
    /// List projections (no content), most recently updated first.
    fn list(&self, owner_id: &str) -> Result<Vec<StoredNote>>;

    /// Detail form of one note, content included.
    fn get(&self, owner_id: &str, id: &str) -> Result<StoredNote>;

    fn insert(&mut self, note: StoredNote) -> Result<StoredNote>;

    /// Insert a batch; returns how many were stored.
    fn insert_many(&mut self, notes: Vec<StoredNote>) -> Result<usize>;

    fn update(&mut self, owner_id: &str, id: &str, update: NoteUpdate) -> Result<StoredNote>;

    fn delete(&mut self, owner_id: &str, id: &str) -> Result<()>;
}

/// Return the user's salt, generating and storing one on first use.
pub fn setup_salt(store: &mut dyn SaltStore, user_id: &str) -> Result<Salt> {
    if let Some(salt) = store.load_salt(user_id)? {
        return Ok(salt);
    }
    let salt = store.store_salt_once(user_id, &Salt::generate())?;
    debug!(user_id, "stored new encryption salt");
    Ok(salt)
}

fn not_found(id: &str) -> SealnoteError {
    SealnoteError::with_kind(
        ErrorCategory::User,
        ErrorKind::NotFound,
        format!("note {} not found", id),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    encryption_salt: Salt,
}

/// On-disk layout of a [`JsonFileStore`]. Notes stay raw JSON here and
/// are parsed one at a time.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    notes: Vec<Value>,
}

/// The complete contents of a store.
#[derive(Debug, Clone, Default)]
struct StoreData {
    users: BTreeMap<String, UserRecord>,
    notes: Vec<StoredNote>,
    /// File entries that are not notes at all. Never listed, written back
    /// untouched.
    unreadable: Vec<Value>,
}

impl From<StoreFile> for StoreData {
    fn from(file: StoreFile) -> Self {
        let mut notes = Vec::with_capacity(file.notes.len());
        let mut unreadable = Vec::new();
        for (index, entry) in file.notes.into_iter().enumerate() {
            match StoredNote::deserialize(&entry) {
                Ok(note) => notes.push(note),
                Err(e) => {
                    warn!(index, error = %e, "skipping unreadable note entry");
                    unreadable.push(entry);
                }
            }
        }
        Self {
            users: file.users,
            notes,
            unreadable,
        }
    }
}

impl StoreData {
    fn to_file(&self) -> Result<StoreFile> {
        let mut notes = self
            .notes
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                SealnoteError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Serialization,
                    "failed to serialize notes",
                    e,
                )
            })?;
        notes.extend(self.unreadable.iter().cloned());
        Ok(StoreFile {
            users: self.users.clone(),
            notes,
        })
    }

    fn load_salt(&self, user_id: &str) -> Option<Salt> {
        self.users.get(user_id).map(|u| u.encryption_salt)
    }

    fn store_salt_once(&mut self, user_id: &str, salt: &Salt) -> Salt {
        let record = self
            .users
            .entry(user_id.to_owned())
            .or_insert_with(|| UserRecord {
                encryption_salt: *salt,
            });
        if record.encryption_salt != *salt {
            warn!(user_id, "salt already set up; keeping the existing one");
        }
        record.encryption_salt
    }

    fn list(&self, owner_id: &str) -> Vec<StoredNote> {
        let mut notes: Vec<StoredNote> = self
            .notes
            .iter()
            .filter(|n| n.meta.owner_id == owner_id)
            .map(StoredNote::projection)
            .collect();
        notes.sort_by(|a, b| b.meta.updated_at.cmp(&a.meta.updated_at));
        notes
    }

    fn position(&self, owner_id: &str, id: &str) -> Result<usize> {
        self.notes
            .iter()
            .position(|n| n.meta.id == id && n.meta.owner_id == owner_id)
            .ok_or_else(|| not_found(id))
    }

    fn get(&self, owner_id: &str, id: &str) -> Result<StoredNote> {
        let index = self.position(owner_id, id)?;
        Ok(self.notes[index].clone())
    }

    fn insert(&mut self, note: StoredNote) -> Result<StoredNote> {
        if self.notes.iter().any(|n| n.meta.id == note.meta.id) {
            return Err(SealnoteError::invalid_input(format!(
                "note {} already exists",
                note.meta.id
            )));
        }
        self.notes.push(note.clone());
        Ok(note)
    }

    fn update(&mut self, owner_id: &str, id: &str, update: NoteUpdate) -> Result<StoredNote> {
        let index = self.position(owner_id, id)?;
        let note = &mut self.notes[index];
        if let Some(title) = update.title {
            note.meta.title = if title.is_empty() {
                DEFAULT_TITLE.to_owned()
            } else {
                title
            };
        }
        if let Some(content) = update.content {
            note.content = Some(StoredContent::Sealed(content));
        }
        if let Some(tags) = update.tags {
            note.meta.tags = normalize_tags(tags);
        }
        note.meta.updated_at = Utc::now();
        Ok(note.clone())
    }

    fn delete(&mut self, owner_id: &str, id: &str) -> Result<()> {
        let index = self.position(owner_id, id)?;
        self.notes.remove(index);
        Ok(())
    }
}

/// A store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: StoreData,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaltStore for MemoryStore {
    fn load_salt(&self, user_id: &str) -> Result<Option<Salt>> {
        Ok(self.data.load_salt(user_id))
    }

    fn store_salt_once(&mut self, user_id: &str, salt: &Salt) -> Result<Salt> {
        Ok(self.data.store_salt_once(user_id, salt))
    }
}

impl NoteStore for MemoryStore {
    fn list(&self, owner_id: &str) -> Result<Vec<StoredNote>> {
        Ok(self.data.list(owner_id))
    }

    fn get(&self, owner_id: &str, id: &str) -> Result<StoredNote> {
        self.data.get(owner_id, id)
    }

    fn insert(&mut self, note: StoredNote) -> Result<StoredNote> {
        self.data.insert(note)
    }

    fn insert_many(&mut self, notes: Vec<StoredNote>) -> Result<usize> {
        let count = notes.len();
        for note in notes {
            self.data.insert(note)?;
        }
        Ok(count)
    }

    fn update(&mut self, owner_id: &str, id: &str, update: NoteUpdate) -> Result<StoredNote> {
        self.data.update(owner_id, id, update)
    }

    fn delete(&mut self, owner_id: &str, id: &str) -> Result<()> {
        self.data.delete(owner_id, id)
    }
}

/// A store kept in a single JSON file.
///
/// Every mutation rewrites the file atomically. Only salts and wire-form
/// notes are ever written. A note entry that cannot be read is skipped on
/// load and written back as it was.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreData> {
        let Some(text) = file_ops::read_text_if_exists(&self.path)? else {
            return Ok(StoreData::default());
        };
        let file: StoreFile = serde_json::from_str(&text).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Serialization,
                format!("{} is not a valid sealnote store", self.path.display()),
                e,
            )
        })?;
        Ok(file.into())
    }

    fn save(&self, data: &StoreData) -> Result<()> {
        let text = serde_json::to_string_pretty(&data.to_file()?).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Serialization,
                "failed to serialize store",
                e,
            )
        })?;
        file_ops::write_file_atomic(&self.path, text.as_bytes())
            .map_err(|e| e.with_context(format!("failed to write {}", self.path.display())))
    }

    fn modify<T>(&mut self, change: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let mut data = self.load()?;
        let result = change(&mut data)?;
        self.save(&data)?;
        Ok(result)
    }
}

impl SaltStore for JsonFileStore {
    fn load_salt(&self, user_id: &str) -> Result<Option<Salt>> {
        Ok(self.load()?.load_salt(user_id))
    }

    fn store_salt_once(&mut self, user_id: &str, salt: &Salt) -> Result<Salt> {
        self.modify(|data| Ok(data.store_salt_once(user_id, salt)))
    }
}

impl NoteStore for JsonFileStore {
    fn list(&self, owner_id: &str) -> Result<Vec<StoredNote>> {
        Ok(self.load()?.list(owner_id))
    }

    fn get(&self, owner_id: &str, id: &str) -> Result<StoredNote> {
        self.load()?.get(owner_id, id)
    }

    fn insert(&mut self, note: StoredNote) -> Result<StoredNote> {
        self.modify(|data| data.insert(note))
    }

    fn insert_many(&mut self, notes: Vec<StoredNote>) -> Result<usize> {
        self.modify(|data| {
            let count = notes.len();
            for note in notes {
                data.insert(note)?;
            }
            Ok(count)
        })
    }

    fn update(&mut self, owner_id: &str, id: &str, update: NoteUpdate) -> Result<StoredNote> {
        self.modify(|data| data.update(owner_id, id, update))
    }

    fn delete(&mut self, owner_id: &str, id: &str) -> Result<()> {
        self.modify(|data| data.delete(owner_id, id))
    }
}
