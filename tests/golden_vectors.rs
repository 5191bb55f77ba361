//! Golden test vector validation
//!
//! Each vector pins the full pipeline: PBKDF2 key derivation from the
//! password and hex salt, then AES-256-GCM with a 16-byte IV. The JSON
//! fields use the same names as the stored envelope.

use serde::Deserialize;

use sealnote::aead::{self, Envelope};
use sealnote::kdf::{self, Password, Salt};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoldenVector {
    password: String,
    salt: String,
    key: String,
    iv: String,
    plaintext: String,
    encrypted: String,
    auth_tag: String,
    comment: String,
}

fn load_golden_vectors() -> serde_json::Result<Vec<GoldenVector>> {
    let json_data = include_str!("../testdata/golden-vectors.json");
    serde_json::from_str(json_data)
}

/// Run golden vector tests on specified indices
///
/// If `indices` is None, tests all vectors.
fn run_golden_vector_tests(indices: Option<&[usize]>) {
    let vectors = load_golden_vectors().expect("failed to load golden vectors");

    let selected: Vec<usize> = match indices {
        Some(idx) => {
            for &i in idx {
                assert!(
                    i < vectors.len(),
                    "Index {} is out of bounds (only {} vectors available)",
                    i,
                    vectors.len()
                );
            }
            idx.to_vec()
        }
        None => (0..vectors.len()).collect(),
    };
    println!("Testing {} golden vectors", selected.len());

    let mut passed = 0;
    let mut failed = 0;

    for i in selected {
        let vector = &vectors[i];
        match check_vector(vector) {
            Ok(()) => passed += 1,
            Err(reason) => {
                eprintln!("Vector {}: FAILED - {}", i, reason);
                eprintln!("  Comment: {}", vector.comment);
                failed += 1;
            }
        }
    }

    println!(
        "Results: {} passed, {} failed out of {} total",
        passed,
        failed,
        passed + failed
    );

    assert_eq!(failed, 0, "Some golden vectors failed validation");
    assert!(passed > 0, "No golden vectors were tested");
}

fn check_vector(vector: &GoldenVector) -> Result<(), String> {
    let password = Password::new(vector.password.as_str()).map_err(|e| e.to_string())?;
    let salt = Salt::from_hex(&vector.salt).map_err(|e| e.to_string())?;

    let key = kdf::derive(&password, &salt);
    if hex::encode(key.as_bytes()) != vector.key {
        return Err(format!(
            "key mismatch: expected {}, got {}",
            vector.key,
            hex::encode(key.as_bytes())
        ));
    }

    let iv: [u8; aead::IV_LEN] = hex::decode(&vector.iv)
        .map_err(|e| e.to_string())?
        .try_into()
        .map_err(|_| "IV must be 16 bytes".to_owned())?;
    let envelope = aead::encrypt_with_iv(&vector.plaintext, &key, &iv).map_err(|e| e.to_string())?;
    if hex::encode(envelope.ciphertext()) != vector.encrypted {
        return Err(format!(
            "ciphertext mismatch: expected {}, got {}",
            vector.encrypted,
            hex::encode(envelope.ciphertext())
        ));
    }
    if hex::encode(envelope.auth_tag()) != vector.auth_tag {
        return Err(format!(
            "tag mismatch: expected {}, got {}",
            vector.auth_tag,
            hex::encode(envelope.auth_tag())
        ));
    }

    // Decrypt from the recorded fields, not from our own output.
    let recorded =
        Envelope::from_hex(&vector.iv, &vector.encrypted, &vector.auth_tag).map_err(|e| e.to_string())?;
    let decrypted = aead::decrypt(&recorded, &key).map_err(|e| e.to_string())?;
    if decrypted != vector.plaintext {
        return Err(format!(
            "plaintext mismatch: expected length {}, got {}",
            vector.plaintext.len(),
            decrypted.len()
        ));
    }

    Ok(())
}

/// A small subset for regular testing. PBKDF2 at 100k rounds adds up.
#[test]
fn test_golden_vectors_subset() {
    // Basic text, empty content, non-ASCII
    run_golden_vector_tests(Some(&[0, 1, 3]));
}

/// Run with: cargo test test_all_golden_vectors -- --ignored
#[test]
#[ignore]
fn test_all_golden_vectors() {
    run_golden_vector_tests(None);
}

#[test]
fn test_golden_vector_rejects_wrong_password() {
    let vectors = load_golden_vectors().expect("failed to load golden vectors");
    let vector = &vectors[0];

    let wrong = Password::new("correcthorsebatterz").unwrap();
    let salt = Salt::from_hex(&vector.salt).unwrap();
    let key = kdf::derive(&wrong, &salt);

    let envelope = Envelope::from_hex(&vector.iv, &vector.encrypted, &vector.auth_tag).unwrap();
    let err = aead::decrypt(&envelope, &key).expect_err("expected authentication failure");
    assert!(err.is_authentication_failure());
}
