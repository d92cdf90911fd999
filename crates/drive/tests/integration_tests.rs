//! Integration tests for the drive crate
//!
//! These run complete backups against the in-memory remote store and check
//! what ends up on disk between runs.

use chrono::Utc;
use drive::models::{GOOGLE_DOC, GOOGLE_FORM, GOOGLE_PRESENTATION, GOOGLE_SPREADSHEET};
use drive::{
    DocumentId, InMemoryRemoteStore, ManifestStore, RemoteDocument, RetryPolicy, SyncEngine,
    SyncError, SyncOptions, SyncPhase,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn options() -> SyncOptions {
    SyncOptions {
        retry: RetryPolicy::immediate(10),
        ..SyncOptions::default()
    }
}

fn run(store: &InMemoryRemoteStore, destination: &Path) -> Result<drive::SyncStats, SyncError> {
    SyncEngine::new(store, destination, options()).run()
}

/// A small Drive: two nested project folders, a shared folder outside the
/// tree, and one document of every exportable kind
fn sample_drive() -> InMemoryRemoteStore {
    let store = InMemoryRemoteStore::new().with_page_size(2);
    let root = store.root_id().as_str().to_string();

    store.add_folder("projects", "Projects", &[&root]);
    store.add_folder("apollo", "Apollo", &["projects"]);
    store.add_folder("shared", "From: Alice", &[]);

    store.add_document(
        RemoteDocument::new("doc", "Design/Notes", GOOGLE_DOC)
            .with_version(10)
            .with_parents(["apollo"]),
    );
    store.add_document(
        RemoteDocument::new("sheet", "Budget", GOOGLE_SPREADSHEET)
            .with_version(3)
            .with_parents(["apollo"]),
    );
    store.add_document(
        RemoteDocument::new("deck", "Kickoff", GOOGLE_PRESENTATION)
            .with_version(1)
            .with_owner("alice@example.com")
            .with_parents(["shared"]),
    );
    store.add_document(RemoteDocument::new("form", "..", GOOGLE_FORM).with_version(2));
    store.add_document(RemoteDocument::new("pdf", "scan.pdf", "application/pdf"));
    store.add_trashed_document(RemoteDocument::new("old", "Old", GOOGLE_DOC));
    store
}

#[test]
fn test_full_backup_layout() {
    let dir = TempDir::new().unwrap();
    let store = sample_drive();

    let stats = run(&store, dir.path()).unwrap();

    assert_eq!(stats.documents_listed, 4);
    assert_eq!(stats.documents_downloaded, 4);
    assert!(dir.path().join("Drive/Projects/Apollo/Design_Notes.docx").exists());
    assert!(dir.path().join("Drive/Projects/Apollo/Budget.xlsx").exists());
    assert!(dir.path().join("Unorganized/From_ Alice/Kickoff.pptx").exists());
    assert!(dir.path().join("Unorganized/__.zip").exists());
    assert!(!dir.path().join("Drive/Old.docx").exists());

    let manifest = ManifestStore::new(dir.path()).load().unwrap();
    assert_eq!(manifest.len(), 4);
    let deck = manifest.get(&DocumentId::new("deck")).unwrap();
    assert_eq!(deck.owner, "alice@example.com");
    assert_eq!(
        deck.parent_names,
        vec![vec!["Unorganized".to_string(), "From: Alice".to_string()]]
    );
}

#[test]
fn test_second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = sample_drive();

    run(&store, dir.path()).unwrap();
    let first = ManifestStore::new(dir.path()).load().unwrap();

    store.reset_counters();
    let stats = run(&store, dir.path()).unwrap();
    let second = ManifestStore::new(dir.path()).load().unwrap();

    assert_eq!(stats.documents_downloaded, 0);
    assert_eq!(stats.documents_skipped, 4);
    assert!(store.exports().is_empty());
    assert_eq!(first.entries, second.entries);
    assert!(second.timestamp >= first.timestamp);
}

#[test]
fn test_only_changed_versions_are_exported() {
    let dir = TempDir::new().unwrap();
    let store = sample_drive();
    run(&store, dir.path()).unwrap();

    store.update_document("sheet", |d| d.version = 4).unwrap();
    store
        .update_document("doc", |d| d.modified_time = Utc::now())
        .unwrap();
    store.set_content("sheet", "new numbers");
    store.reset_counters();

    let stats = run(&store, dir.path()).unwrap();

    assert_eq!(stats.documents_downloaded, 1);
    assert_eq!(stats.bytes_downloaded, "new numbers".len() as u64);
    let exported: Vec<_> = store.exports().into_iter().map(|(id, _)| id).collect();
    assert_eq!(exported, vec![DocumentId::new("sheet")]);
    assert_eq!(
        fs::read_to_string(dir.path().join("Drive/Projects/Apollo/Budget.xlsx")).unwrap(),
        "new numbers"
    );
}

#[test]
fn test_export_failure_leaves_manifest_untouched() {
    let dir = TempDir::new().unwrap();
    let store = sample_drive();
    run(&store, dir.path()).unwrap();
    let manifest_path = ManifestStore::new(dir.path()).path().to_path_buf();
    let before = fs::read(&manifest_path).unwrap();

    // Two changed documents; the second one fails to export
    store.update_document("doc", |d| d.version = 11).unwrap();
    store.update_document("deck", |d| d.version = 2).unwrap();
    store.fail_exports_of("deck");

    let mut engine = SyncEngine::new(&store, dir.path(), options());
    let err = engine.run().unwrap_err();

    assert!(matches!(err, SyncError::Export { ref id, .. } if id.as_str() == "deck"));
    assert_eq!(engine.phase(), SyncPhase::Failed);
    assert_eq!(fs::read(&manifest_path).unwrap(), before);

    // The next run picks both documents up again
    store.clear_export_failure("deck");
    store.reset_counters();
    let stats = run(&store, dir.path()).unwrap();
    assert_eq!(stats.documents_downloaded, 2);

    let manifest = ManifestStore::new(dir.path()).load().unwrap();
    assert_eq!(manifest.get(&DocumentId::new("doc")).unwrap().version, 11);
    assert_eq!(manifest.get(&DocumentId::new("deck")).unwrap().version, 2);
}

#[test]
fn test_listing_retry_exhaustion_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = sample_drive();
    store.fail_next_list_calls(10);

    let err = run(&store, dir.path()).unwrap_err();

    assert!(matches!(err, SyncError::RemoteList { attempts: 10, .. }));
    assert!(store.exports().is_empty());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_listing_recovers_within_retry_budget() {
    let dir = TempDir::new().unwrap();
    let store = sample_drive();
    store.fail_next_list_calls(9);

    let stats = run(&store, dir.path()).unwrap();
    assert_eq!(stats.documents_listed, 4);
}

#[test]
fn test_ancestors_are_looked_up_once_per_run() {
    let dir = TempDir::new().unwrap();
    let store = sample_drive();
    for i in 0..5 {
        store.add_document(
            RemoteDocument::new(format!("extra{}", i), format!("Extra {}", i), GOOGLE_DOC)
                .with_parents(["apollo"]),
        );
    }

    run(&store, dir.path()).unwrap();

    let mut lookups: Vec<_> = store
        .metadata_lookups()
        .into_iter()
        .map(|id| id.0)
        .collect();
    lookups.sort();
    let root = store.root_id().as_str().to_string();
    let mut expected = vec![
        "apollo".to_string(),
        "projects".to_string(),
        root,
        "shared".to_string(),
    ];
    expected.sort();
    assert_eq!(lookups, expected);
}

#[test]
fn test_corrupt_manifest_aborts_before_listing() {
    let dir = TempDir::new().unwrap();
    let store = sample_drive();
    fs::write(dir.path().join("manifest.json"), "not json").unwrap();

    let err = run(&store, dir.path()).unwrap_err();

    assert!(matches!(err, SyncError::ManifestCorrupt { .. }));
    assert_eq!(store.list_calls(), 0);
    assert_eq!(
        fs::read_to_string(dir.path().join("manifest.json")).unwrap(),
        "not json"
    );
}
