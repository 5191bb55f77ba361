//! Authenticated encryption of note bodies using AES-256-GCM
//!
//! Every call to [`encrypt`] draws a fresh random 16-byte IV, runs
//! AES-256-GCM over the UTF-8 plaintext and returns an [`Envelope`]
//! holding the IV, the ciphertext and the detached 16-byte tag.
//! [`decrypt`] verifies the tag before any plaintext is released.
//!
//! The JSON wire form of an envelope is:
//!
//! ```json
//! { "iv": "<32 hex>", "encrypted": "<hex>", "authTag": "<32 hex>" }
//! ```

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::kdf::DerivedKey;

/// Length of the IV in bytes
pub const IV_LEN: usize = 16;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// A self-contained ciphertext: the only form in which note content
/// leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeWire", into = "EnvelopeWire")]
pub struct Envelope {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
    auth_tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Reassembles an envelope, rejecting wrong-length IV or tag.
    pub fn from_parts(iv: &[u8], ciphertext: Vec<u8>, auth_tag: &[u8]) -> Result<Self> {
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| {
            SealnoteError::invalid_input(format!(
                "envelope iv must be {} bytes, got {}",
                IV_LEN,
                iv.len()
            ))
        })?;
        let auth_tag: [u8; TAG_LEN] = auth_tag.try_into().map_err(|_| {
            SealnoteError::invalid_input(format!(
                "envelope authTag must be {} bytes, got {}",
                TAG_LEN,
                auth_tag.len()
            ))
        })?;
        Ok(Self {
            iv,
            ciphertext,
            auth_tag,
        })
    }

    /// Parses the three hex fields of the wire form.
    pub fn from_hex(iv: &str, encrypted: &str, auth_tag: &str) -> Result<Self> {
        Self::from_parts(
            &decode_field("iv", iv)?,
            decode_field("encrypted", encrypted)?,
            &decode_field("authTag", auth_tag)?,
        )
    }

    /// Parses an already decoded JSON value of the wire form, reporting
    /// exactly what is wrong with it.
    pub fn from_wire_value(value: &Value) -> Result<Self> {
        let wire = EnvelopeWire::deserialize(value).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidInput,
                format!("content is not an envelope: {}", e),
                e,
            )
        })?;
        Envelope::try_from(wire)
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn auth_tag(&self) -> &[u8; TAG_LEN] {
        &self.auth_tag
    }
}

fn decode_field(name: &str, encoded: &str) -> Result<Vec<u8>> {
    hex::decode(encoded).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::EncodingInvalid,
            format!("envelope field {} is not valid hex: {}", name, e),
            e,
        )
    })
}

#[derive(Serialize, Deserialize)]
struct EnvelopeWire {
    iv: String,
    encrypted: String,
    #[serde(rename = "authTag")]
    auth_tag: String,
}

impl TryFrom<EnvelopeWire> for Envelope {
    type Error = SealnoteError;

    fn try_from(wire: EnvelopeWire) -> Result<Self> {
        Envelope::from_hex(&wire.iv, &wire.encrypted, &wire.auth_tag)
    }
}

impl From<Envelope> for EnvelopeWire {
    fn from(envelope: Envelope) -> Self {
        Self {
            iv: hex::encode(envelope.iv),
            encrypted: hex::encode(&envelope.ciphertext),
            auth_tag: hex::encode(envelope.auth_tag),
        }
    }
}

fn cipher(key: &DerivedKey) -> Result<Aes256Gcm16> {
    Aes256Gcm16::new_from_slice(key.as_bytes()).map_err(|_| {
        SealnoteError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "derived key has the wrong length for AES-256",
        )
    })
}

/// Encrypt plaintext under `key` with a fresh random IV.
pub fn encrypt(plaintext: &str, key: &DerivedKey) -> Result<Envelope> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    encrypt_with_iv(plaintext, key, &iv)
}

/// Encrypt with a caller-chosen IV. Exists for known-answer tests.
///
/// Two envelopes under one key with the same IV leak the XOR of their
/// plaintexts and allow tag forgery. Use [`encrypt`] for real data.
pub fn encrypt_with_iv(plaintext: &str, key: &DerivedKey, iv: &[u8; IV_LEN]) -> Result<Envelope> {
    let cipher = cipher(key)?;

    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), b"", &mut buffer)
        .map_err(|_| {
            SealnoteError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::CipherFailure,
                "encryption failed",
            )
        })?;

    let mut auth_tag = [0u8; TAG_LEN];
    auth_tag.copy_from_slice(&tag);

    Ok(Envelope {
        iv: *iv,
        ciphertext: buffer,
        auth_tag,
    })
}

/// Decrypt an envelope under `key`.
///
/// Fails with [`ErrorKind::AuthenticationFailed`] when the tag does not
/// verify; in that case nothing derived from the ciphertext is returned.
pub fn decrypt(envelope: &Envelope, key: &DerivedKey) -> Result<String> {
    let cipher = cipher(key)?;

    let mut buffer = Zeroizing::new(envelope.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&envelope.iv),
            b"",
            &mut buffer,
            GenericArray::from_slice(&envelope.auth_tag),
        )
        .map_err(|_| SealnoteError::authentication_failed())?;

    let text = std::str::from_utf8(&buffer).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InvalidInput,
            "decrypted content is not valid UTF-8",
            e,
        )
    })?;
    Ok(text.to_owned())
}
