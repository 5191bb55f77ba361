//! sealnote - password-protected notes with client-side envelope encryption
//!
//! Note bodies are encrypted with AES-256-GCM under a key derived from the
//! user's password and a per-user salt (PBKDF2-HMAC-SHA-512). Storage only
//! ever sees [`Envelope`]s; titles, tags and timestamps stay plaintext.
//!
//! ```no_run
//! use sealnote::{Password, Salt, SessionPolicy, VaultSession};
//!
//! # fn main() -> sealnote::Result<()> {
//! let password = Password::new("correcthorsebattery")?;
//! let salt = Salt::from_hex("00112233445566778899aabbccddeeff")?;
//!
//! let mut session = VaultSession::new(SessionPolicy::default());
//! session.unlock(&password, &salt);
//! let envelope = session.encrypt("Buy milk")?;
//! assert_eq!(session.decrypt(&envelope)?, "Buy milk");
//! session.lock();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod aead;
pub mod batch;
pub mod codec;
pub mod commands;
pub mod error;
pub mod export;
pub mod file_ops;
pub mod import;
pub mod kdf;
pub mod note;
pub mod password;
pub mod store;
pub mod vault;

pub use aead::Envelope;
pub use error::{ErrorCategory, ErrorKind, Result, SealnoteError};
pub use kdf::{DerivedKey, Password, Salt};
pub use note::{DisplayContent, DisplayNote, NoteMeta, PlainNote, StoredContent, StoredNote};
pub use vault::{SessionPolicy, VaultSession};
