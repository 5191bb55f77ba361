//! End-to-end workflows through the library API

use std::time::Duration;

use sealnote::batch::{self, ReconcileSummary};
use sealnote::codec;
use sealnote::export;
use sealnote::import;
use sealnote::store::{self, JsonFileStore, MemoryStore, NoteStore, SaltStore};
use sealnote::{
    DisplayContent, ErrorKind, Password, PlainNote, Salt, SessionPolicy, VaultSession,
};
use tempfile::TempDir;

const PASSWORD: &str = "correcthorsebattery";

fn unlocked(password: &str, salt: &Salt) -> VaultSession {
    let mut session = VaultSession::new(SessionPolicy::never_expire());
    session.unlock(&Password::new(password).unwrap(), salt);
    session
}

#[test]
fn test_setup_add_and_read_back() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = JsonFileStore::open(temp_dir.path().join("vault.json"));

    let salt = store::setup_salt(&mut store, "alice").unwrap();
    assert_eq!(store.load_salt("alice").unwrap(), Some(salt));

    let mut session = unlocked(PASSWORD, &salt);
    let note = PlainNote::new("alice", "Groceries", "Buy milk", vec!["home".into()]);
    let stored = codec::to_storage_form(&mut session, note).unwrap();
    let id = store.insert(stored).unwrap().meta.id;

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(!raw.contains("Buy milk"));

    // A later session with the same password and salt reads it back.
    drop(session);
    let mut session = unlocked(PASSWORD, &store.load_salt("alice").unwrap().unwrap());
    let shown = codec::to_display_form(&mut session, store.get("alice", &id).unwrap()).unwrap();
    assert_eq!(shown.content().plaintext(), Some("Buy milk"));
    assert_eq!(shown.meta.title, "Groceries");
}

#[test]
fn test_export_then_import_for_another_user() {
    let mut store = MemoryStore::new();
    let alice_salt = store::setup_salt(&mut store, "alice").unwrap();
    let bob_salt = store::setup_salt(&mut store, "bob").unwrap();
    assert_ne!(alice_salt, bob_salt);

    let mut alice = unlocked(PASSWORD, &alice_salt);
    for (title, body) in [("Plans", "secret plan"), ("Empty", "")] {
        let note = PlainNote::new("alice", title, body, vec![]);
        store
            .insert(codec::to_storage_form(&mut alice, note).unwrap())
            .unwrap();
    }

    let detailed: Vec<_> = store
        .list("alice")
        .unwrap()
        .iter()
        .map(|n| store.get("alice", &n.meta.id).unwrap())
        .collect();
    let outcome = export::export_notes(&mut alice, detailed).unwrap();
    assert!(outcome.skipped.is_empty());
    let json = outcome.document.to_json_pretty().unwrap();

    let mut bob = unlocked("bob's own password", &bob_salt);
    let imported = import::import_document(&mut bob, &json, "bob").unwrap();
    assert_eq!(imported.len(), 2);
    assert_eq!(store.insert_many(imported).unwrap(), 2);

    let bob_notes: Vec<_> = store
        .list("bob")
        .unwrap()
        .iter()
        .map(|n| store.get("bob", &n.meta.id).unwrap())
        .collect();
    let alice_ids: Vec<_> = store
        .list("alice")
        .unwrap()
        .into_iter()
        .map(|n| n.meta.id)
        .collect();
    for note in &bob_notes {
        assert_eq!(note.meta.owner_id, "bob");
        assert!(!alice_ids.contains(&note.meta.id));
    }

    let display = batch::reconcile(&mut bob, bob_notes.clone()).unwrap();
    let mut bodies: Vec<_> = display
        .iter()
        .filter_map(|n| n.content().plaintext())
        .collect();
    bodies.sort();
    assert_eq!(bodies, vec!["", "secret plan"]);

    // Alice's key cannot read Bob's copies.
    let display = batch::reconcile(&mut alice, bob_notes).unwrap();
    assert!(display.iter().all(|n| n.decryption_failed()));
}

#[test]
fn test_batch_isolates_corrupt_note() {
    let salt = Salt::generate();
    let mut session = unlocked(PASSWORD, &salt);

    let mut notes: Vec<_> = (0..5)
        .map(|i| {
            let note = PlainNote::new("alice", format!("note {}", i), format!("body {}", i), vec![]);
            codec::to_storage_form(&mut session, note).unwrap()
        })
        .collect();
    // Splice another note's tag onto the third note.
    let foreign_tag = *notes[0].content.as_ref().unwrap().sealed().unwrap().auth_tag();
    let victim = notes[2].content.take().unwrap();
    let victim = victim.sealed().unwrap();
    notes[2].content = Some(
        sealnote::Envelope::from_parts(victim.iv(), victim.ciphertext().to_vec(), &foreign_tag)
            .unwrap()
            .into(),
    );

    let display = batch::reconcile(&mut session, notes).unwrap();
    let summary = ReconcileSummary::of(&display);
    assert_eq!(summary.decrypted, 4);
    assert_eq!(summary.failed, 1);
    assert!(matches!(display[2].content(), DisplayContent::Unavailable(_)));
    assert_eq!(display[4].content().plaintext(), Some("body 4"));
}

#[test]
fn test_idle_session_refuses_work() {
    let salt = Salt::generate();
    let mut session = VaultSession::new(SessionPolicy::idle_after(Duration::ZERO));
    session.unlock(&Password::new(PASSWORD).unwrap(), &salt);

    let err = session.encrypt("Buy milk").expect_err("expected locked vault");
    assert_eq!(err.kind, Some(ErrorKind::VaultLocked));
    assert!(!session.is_unlocked());

    let note = PlainNote::new("alice", "t", "x", vec![]);
    let err = import::reencrypt(&mut session, vec![note]).expect_err("expected locked vault");
    assert!(err.is_vault_locked());
}
