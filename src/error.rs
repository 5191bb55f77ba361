//! Error type shared by every sealnote module

use std::error::Error as StdError;

use thiserror::Error;

/// Who is most likely at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Not attributable to the caller. This includes failures that might
    /// still stem from user action when sealnote cannot tell.
    Internal,

    /// Bad input, a wrong password, a locked vault, or a missing record.
    User,
}

/// Specific condition, for callers that branch on what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Rejected before any cryptographic work: short password, wrong-length
    /// salt, malformed envelope shape or an unusable import document.
    InvalidInput,
    /// Hex decoding of a salt or envelope field failed.
    EncodingInvalid,
    /// Tag verification failed: wrong key (wrong password), tampering or
    /// corruption. No plaintext is ever released alongside this kind.
    AuthenticationFailed,
    /// A cryptographic operation was attempted while no key is held.
    VaultLocked,
    /// The AES-GCM primitive refused to seal data.
    CipherFailure,
    /// JSON encoding or decoding of a document failed.
    Serialization,
    /// An import document held no usable note entries.
    ImportEmpty,
    /// The requested record does not exist for this owner.
    NotFound,
    /// Password could not be obtained from the configured reader.
    PasswordUnavailable,
    /// Unexpected state reached within sealnote logic.
    InternalInvariant,
    /// Reading or writing a file, stdin or stdout failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct SealnoteError {
    pub category: ErrorCategory,
    /// Not every error is tagged; callers matching on this must allow
    /// for `None`.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl SealnoteError {
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Like [`with_kind`](Self::with_kind), keeping the underlying error
    /// as the source.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::User, ErrorKind::InvalidInput, msg)
    }

    pub fn vault_locked() -> Self {
        Self::with_kind(
            ErrorCategory::User,
            ErrorKind::VaultLocked,
            "vault is locked; unlock it with your password first",
        )
    }

    /// Deliberately vague: a wrong key and a modified ciphertext are
    /// indistinguishable.
    pub fn authentication_failed() -> Self {
        Self::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "corrupt input, tampered-with data, or wrong password",
        )
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind == Some(ErrorKind::InvalidInput)
    }

    pub fn is_authentication_failure(&self) -> bool {
        self.kind == Some(ErrorKind::AuthenticationFailed)
    }

    pub fn is_vault_locked(&self) -> bool {
        self.kind == Some(ErrorKind::VaultLocked)
    }

    /// Replace the message, keeping category and kind. The original error
    /// becomes the source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        Self {
            category: self.category,
            kind: self.kind,
            msg: msg.into(),
            source: Some(Box::new(self)),
        }
    }
}

pub type Result<T> = std::result::Result<T, SealnoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_kind_and_category() {
        let err = SealnoteError::vault_locked().with_context("failed to export notes");

        assert_eq!(err.category, ErrorCategory::User);
        assert!(err.is_vault_locked());
        assert_eq!(err.message(), "failed to export notes");
        assert!(err.source_error().is_some());
    }

    #[test]
    fn test_kind_predicates() {
        assert!(SealnoteError::invalid_input("short").is_invalid_input());
        assert!(SealnoteError::authentication_failed().is_authentication_failure());
        let io = SealnoteError::with_kind(ErrorCategory::Internal, ErrorKind::Io, "boom");
        assert!(!io.is_vault_locked());
        assert!(!io.is_authentication_failure());
    }
}
