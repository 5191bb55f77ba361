//! Password-based key derivation
//!
//! Turns a user password and the per-user 16-byte salt into the 32-byte
//! AES-256 key using PBKDF2 with HMAC-SHA-512. The derivation is
//! deterministic so the same key can be re-derived every session without
//! ever being stored.

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};

/// Length of the per-user salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Shortest password accepted, counted in characters rather than bytes
pub const MIN_PASSWORD_CHARS: usize = 8;

/// A validated user password, wiped from memory on drop.
pub struct Password(Zeroizing<String>);

impl Password {
    /// Validates the minimum length before any derivation is attempted.
    pub fn new(password: impl Into<String>) -> Result<Self> {
        let password = Zeroizing::new(password.into());
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(SealnoteError::invalid_input(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }
        Ok(Self(password))
    }

    /// Builds a password from raw bytes as produced by a
    /// [`PasswordReader`](crate::password::PasswordReader).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidInput,
                "password is not valid UTF-8",
                e,
            )
        })?;
        Self::new(text)
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// The per-user salt. Hex encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Fresh salt from the OS RNG, used once at first setup.
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let salt: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            SealnoteError::invalid_input(format!(
                "salt must be {} bytes, got {}",
                SALT_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(salt))
    }

    /// Parses the wire form. Upper and lower case hex digits are accepted.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim()).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::EncodingInvalid,
                format!("salt is not valid hex: {}", e),
                e,
            )
        })?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt([REDACTED])")
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Salt::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

/// A key derived from a password.
///
/// Key material is zeroized from memory when dropped. The type is neither
/// `Clone` nor serializable; a [`VaultSession`](crate::vault::VaultSession)
/// is its only long-lived owner.
#[derive(ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { key: bytes }
    }

    /// Get a reference to the raw key bytes.
    ///
    /// Avoid storing or logging this value.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the 32-byte note key from a password and salt.
///
/// Same password and salt always produce the same key.
pub fn derive(password: &Password, salt: &Salt) -> DerivedKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS, &mut key);
    let derived = DerivedKey::from_bytes(key);
    // Wipe the stack copy; `derived` owns the only remaining one.
    key.zeroize();
    derived
}

/// Validating entry point for untyped callers: checks the password length
/// and salt length before doing any work.
pub fn derive_from_parts(password: &str, salt: &[u8]) -> Result<DerivedKey> {
    let password = Password::new(password)?;
    let salt = Salt::from_slice(salt)?;
    Ok(derive(&password, &salt))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETUP_SALT: &str = "00112233445566778899aabbccddeeff";

    #[test]
    fn test_known_key() {
        let password = Password::new("correcthorsebattery").unwrap();
        let salt = Salt::from_hex(SETUP_SALT).unwrap();

        let key = derive(&password, &salt);

        assert_eq!(
            hex::encode(key.as_bytes()),
            "f8cdd8084deaea37062628bcc00c893ac6b94294d25e4c8911c195ff788a9fd8"
        );
    }

    #[test]
    fn test_deterministic() {
        let password = Password::new("password1234").unwrap();
        let salt = Salt::from_bytes([0x11; SALT_LEN]);

        let k1 = derive(&password, &salt);
        let k2 = derive(&password, &salt);

        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_salt_changes_key() {
        let password = Password::new("password1234").unwrap();

        let k1 = derive(&password, &Salt::from_bytes([0x11; SALT_LEN]));
        let k2 = derive(&password, &Salt::from_bytes([0x12; SALT_LEN]));

        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_short_password_rejected() {
        let err = Password::new("1234567").expect_err("expected short password error");
        assert_eq!(err.kind, Some(ErrorKind::InvalidInput));

        let err = Password::new("").expect_err("expected empty password error");
        assert_eq!(err.kind, Some(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_password_length_counts_characters() {
        // 4 characters, 8 bytes
        assert!(Password::new("ğüöç").is_err());
        assert!(Password::new("ğüöçğüöç").is_ok());
    }

    #[test]
    fn test_password_from_non_utf8_bytes() {
        let err = Password::from_bytes(&[0xff, 0xfe, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05])
            .expect_err("expected utf-8 error");
        assert_eq!(err.kind, Some(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_salt_hex() {
        let salt = Salt::from_hex("00112233445566778899AABBCCDDEEFF").unwrap();
        assert_eq!(salt.to_hex(), SETUP_SALT);
    }

    #[test]
    fn test_salt_wrong_length() {
        let err = Salt::from_hex("0011").expect_err("expected wrong-length salt error");
        assert_eq!(err.kind, Some(ErrorKind::InvalidInput));

        let err = derive_from_parts("password1234", &[0u8; 15])
            .expect_err("expected wrong-length salt error");
        assert_eq!(err.kind, Some(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_salt_bad_hex() {
        let err = Salt::from_hex("zz112233445566778899aabbccddeeff")
            .expect_err("expected hex decode error");
        assert_eq!(err.kind, Some(ErrorKind::EncodingInvalid));
    }

    #[test]
    fn test_generated_salts_differ() {
        assert_ne!(Salt::generate(), Salt::generate());
    }

    #[test]
    fn test_salt_serde() {
        let salt = Salt::from_hex(SETUP_SALT).unwrap();
        let json = serde_json::to_string(&salt).unwrap();
        assert_eq!(json, format!("\"{}\"", SETUP_SALT));
        let back: Salt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, salt);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let password = Password::new("correcthorsebattery").unwrap();
        let salt = Salt::from_hex(SETUP_SALT).unwrap();
        let key = derive(&password, &salt);

        assert!(!format!("{:?}", password).contains("correcthorse"));
        assert!(!format!("{:?}", salt).contains("0011"));
        assert!(format!("{:?}", key).contains("REDACTED"));
    }
}
