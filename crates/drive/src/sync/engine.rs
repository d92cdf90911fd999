//! Incremental backup run
//!
//! A run lists every exportable document, skips those whose version is
//! already in the previous manifest, exports the rest, and only then
//! replaces the manifest. Any failure ends the run before the manifest is
//! written, so the manifest on disk always describes files that exist.

use anyhow::Context;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::lister::{RemoteLister, RetryPolicy};
use super::resolver::ParentPathResolver;
use crate::error::{SyncError, SyncResult};
use crate::models::{ExportFormat, Manifest, RemoteDocument};
use crate::storage::{ManifestStore, RemoteStore};

/// Tunables for a backup run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Retry policy for listing pages
    pub retry: RetryPolicy,
    /// Top-level directory name for documents in the user's folder tree
    pub root_label: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            root_label: "Drive".to_string(),
        }
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Listing,
    Downloading,
    Finalizing,
    Completed,
    Failed,
}

/// Statistics from a backup run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    /// Number of exportable documents listed
    pub documents_listed: usize,
    /// Number of documents exported in this run
    pub documents_downloaded: usize,
    /// Number of documents unchanged since the last run
    pub documents_skipped: usize,
    /// Bytes written for exported documents
    pub bytes_downloaded: u64,
    /// Duration of the run
    pub duration_ms: u64,
}

/// Backs up one remote store into one destination directory
pub struct SyncEngine<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    destination: PathBuf,
    manifests: ManifestStore,
    options: SyncOptions,
    phase: SyncPhase,
}

impl<'a, S: RemoteStore + ?Sized> SyncEngine<'a, S> {
    pub fn new(store: &'a S, destination: impl Into<PathBuf>, options: SyncOptions) -> Self {
        let destination = destination.into();
        Self {
            store,
            manifests: ManifestStore::new(&destination),
            destination,
            options,
            phase: SyncPhase::Idle,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Run a backup
    pub fn run(&mut self) -> SyncResult<SyncStats> {
        self.run_with_progress(|_| {})
    }

    /// Run a backup, reporting the running document count while listing
    pub fn run_with_progress<F>(&mut self, progress: F) -> SyncResult<SyncStats>
    where
        F: FnMut(usize),
    {
        let result = self.execute(progress);
        match &result {
            Ok(_) => self.enter(SyncPhase::Completed),
            Err(e) => {
                log::debug!("Backup failed: {}", e);
                self.enter(SyncPhase::Failed);
            }
        }
        result
    }

    fn execute<F>(&mut self, progress: F) -> SyncResult<SyncStats>
    where
        F: FnMut(usize),
    {
        let start = Instant::now();
        let mut stats = SyncStats::default();

        let previous = self.manifests.load()?;
        if !previous.is_empty() {
            log::info!(
                "Last backup {} ({} documents)",
                previous.timestamp,
                previous.len()
            );
        }

        // 1. List everything before touching the disk
        self.enter(SyncPhase::Listing);
        let mut resolver = ParentPathResolver::for_root(self.store, &self.options.root_label)?;
        let documents =
            RemoteLister::new(self.store, self.options.retry).list_exportable(progress)?;
        stats.documents_listed = documents.len();

        // 2. Diff against the previous manifest and export what changed
        self.enter(SyncPhase::Downloading);
        let mut manifest = Manifest::new();
        for document in &documents {
            let resolved = resolver.resolve_document(document)?;

            if let Some(entry) = previous.unchanged_entry(document) {
                log::info!(
                    "Skipping {} - unchanged from last backup",
                    entry.download_path.display()
                );
                manifest.carry_over(entry);
                stats.documents_skipped += 1;
                continue;
            }

            let format = document.export_format().ok_or_else(|| {
                export_error(
                    document,
                    anyhow::anyhow!("No export format for {}", document.mime_type),
                )
            })?;
            let relative = resolved.canonical_file(&document.name, format.extension);

            log::info!("Downloading {}", relative.display());
            stats.bytes_downloaded += self
                .export_document(document, format, &relative)
                .map_err(|cause| export_error(document, cause))?;
            stats.documents_downloaded += 1;

            manifest.record_download(document, resolved.into_chains(), relative);
        }

        // 3. Commit
        self.enter(SyncPhase::Finalizing);
        self.manifests.save(&manifest)?;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "Backup complete: {} listed, {} downloaded, {} unchanged in {}ms",
            stats.documents_listed,
            stats.documents_downloaded,
            stats.documents_skipped,
            stats.duration_ms
        );
        Ok(stats)
    }

    /// Export one document to `relative` under the destination
    fn export_document(
        &self,
        document: &RemoteDocument,
        format: &ExportFormat,
        relative: &Path,
    ) -> anyhow::Result<u64> {
        let target = self.destination.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut content = self.store.export(&document.id, format.export_mime_type)?;
        write_atomically(&mut content, &target)
            .with_context(|| format!("Failed to write {}", target.display()))
    }

    fn enter(&mut self, phase: SyncPhase) {
        log::debug!("Sync phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

fn export_error(document: &RemoteDocument, cause: anyhow::Error) -> SyncError {
    SyncError::Export {
        id: document.id.clone(),
        name: document.name.clone(),
        cause,
    }
}

/// Stream `content` into a sibling temp file, then rename it over `target`
fn write_atomically(content: &mut dyn Read, target: &Path) -> io::Result<u64> {
    let mut temp_name = target.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".part");
    let temp_path = target.with_file_name(temp_name);
    if temp_path.exists() {
        log::debug!("Replacing leftover {}", temp_path.display());
    }

    let written = File::create(&temp_path).and_then(|mut file| {
        let bytes = io::copy(content, &mut file)?;
        file.sync_all()?;
        Ok(bytes)
    });

    match written.and_then(|bytes| fs::rename(&temp_path, target).map(|()| bytes)) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentId, GOOGLE_DOC, GOOGLE_SPREADSHEET};
    use crate::storage::InMemoryRemoteStore;
    use tempfile::tempdir;

    fn options() -> SyncOptions {
        SyncOptions {
            retry: RetryPolicy::immediate(10),
            ..SyncOptions::default()
        }
    }

    fn store_with_folder() -> InMemoryRemoteStore {
        let store = InMemoryRemoteStore::new();
        let root = store.root_id().as_str().to_string();
        store.add_folder("work", "Work", &[&root]);
        store
    }

    #[test]
    fn test_first_run_downloads_everything() {
        let dir = tempdir().unwrap();
        let store = store_with_folder();
        store.add_document(RemoteDocument::new("d1", "Plan", GOOGLE_DOC).with_parents(["work"]));
        store.add_document(RemoteDocument::new("d2", "Budget", GOOGLE_SPREADSHEET));
        store.set_content("d1", "plan bytes");

        let mut engine = SyncEngine::new(&store, dir.path(), options());
        let stats = engine.run().unwrap();

        assert_eq!(engine.phase(), SyncPhase::Completed);
        assert_eq!(stats.documents_listed, 2);
        assert_eq!(stats.documents_downloaded, 2);
        assert_eq!(stats.documents_skipped, 0);

        let plan = dir.path().join("Drive/Work/Plan.docx");
        assert_eq!(fs::read_to_string(plan).unwrap(), "plan bytes");
        assert!(dir.path().join("Unorganized/Budget.xlsx").exists());

        let manifest = ManifestStore::new(dir.path()).load().unwrap();
        let entry = manifest.get(&DocumentId::new("d1")).unwrap();
        assert_eq!(entry.download_path, PathBuf::from("Drive/Work/Plan.docx"));
        assert_eq!(entry.parent_names, vec![vec!["Drive".to_string(), "Work".to_string()]]);
    }

    #[test]
    fn test_export_uses_mapped_mime_type() {
        let dir = tempdir().unwrap();
        let store = InMemoryRemoteStore::new();
        store.add_document(RemoteDocument::new("s", "Sheet", GOOGLE_SPREADSHEET));

        SyncEngine::new(&store, dir.path(), options()).run().unwrap();

        let exports = store.exports();
        assert_eq!(exports.len(), 1);
        assert_eq!(
            exports[0].1,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn test_new_version_is_downloaded_again() {
        let dir = tempdir().unwrap();
        let store = InMemoryRemoteStore::new();
        store.add_document(RemoteDocument::new("d1", "Plan", GOOGLE_DOC).with_version(5));
        SyncEngine::new(&store, dir.path(), options()).run().unwrap();

        store.update_document("d1", |d| d.version = 6).unwrap();
        store.reset_counters();
        let stats = SyncEngine::new(&store, dir.path(), options()).run().unwrap();

        assert_eq!(stats.documents_downloaded, 1);
        assert_eq!(store.exports().len(), 1);
        let manifest = ManifestStore::new(dir.path()).load().unwrap();
        assert_eq!(manifest.get(&DocumentId::new("d1")).unwrap().version, 6);
    }

    #[test]
    fn test_rename_without_new_version_is_skipped() {
        let dir = tempdir().unwrap();
        let store = InMemoryRemoteStore::new();
        store.add_document(RemoteDocument::new("d1", "Plan", GOOGLE_DOC).with_version(5));
        SyncEngine::new(&store, dir.path(), options()).run().unwrap();

        store.update_document("d1", |d| d.name = "Renamed".to_string()).unwrap();
        store.reset_counters();
        let stats = SyncEngine::new(&store, dir.path(), options()).run().unwrap();

        assert_eq!(stats.documents_skipped, 1);
        assert!(store.exports().is_empty());
        let manifest = ManifestStore::new(dir.path()).load().unwrap();
        let entry = manifest.get(&DocumentId::new("d1")).unwrap();
        assert_eq!(entry.name, "Plan");
        assert_eq!(entry.download_path, PathBuf::from("Unorganized/Plan.docx"));
    }

    #[test]
    fn test_listing_failure_writes_no_manifest() {
        let dir = tempdir().unwrap();
        let store = InMemoryRemoteStore::new();
        store.add_document(RemoteDocument::new("d1", "Plan", GOOGLE_DOC));
        store.fail_next_list_calls(10);

        let mut engine = SyncEngine::new(&store, dir.path(), options());
        let err = engine.run().unwrap_err();

        assert!(matches!(err, SyncError::RemoteList { .. }));
        assert_eq!(engine.phase(), SyncPhase::Failed);
        assert!(!ManifestStore::new(dir.path()).path().exists());
    }

    #[test]
    fn test_multi_parent_document_downloads_first_path_only() {
        let dir = tempdir().unwrap();
        let store = InMemoryRemoteStore::new();
        let root = store.root_id().as_str().to_string();
        store.add_folder("p1", "Folder1", &[&root]);
        store.add_folder("p2", "Folder2", &[&root]);
        store.add_document(RemoteDocument::new("d", "Doc", GOOGLE_DOC).with_parents(["p1", "p2"]));

        SyncEngine::new(&store, dir.path(), options()).run().unwrap();

        assert!(dir.path().join("Drive/Folder1/Doc.docx").exists());
        assert!(!dir.path().join("Drive/Folder2").exists());

        let manifest = ManifestStore::new(dir.path()).load().unwrap();
        let entry = manifest.get(&DocumentId::new("d")).unwrap();
        assert_eq!(entry.parent_names.len(), 2);
        assert_eq!(entry.parent_names[1], vec!["Drive".to_string(), "Folder2".to_string()]);
    }

    #[test]
    fn test_ambiguous_folder_fails_run() {
        let dir = tempdir().unwrap();
        let store = InMemoryRemoteStore::new();
        let root = store.root_id().as_str().to_string();
        store.add_folder("x", "X", &[&root]);
        store.add_folder("y", "Y", &[&root]);
        store.add_folder("both", "Both", &["x", "y"]);
        store.add_document(RemoteDocument::new("d", "Doc", GOOGLE_DOC).with_parents(["both"]));

        let err = SyncEngine::new(&store, dir.path(), options()).run().unwrap_err();

        assert!(err.is_structural());
        assert!(store.exports().is_empty());
        assert!(!ManifestStore::new(dir.path()).path().exists());
    }

    #[test]
    fn test_write_atomically_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.docx");

        let bytes = write_atomically(&mut "content".as_bytes(), &target).unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(fs::read_to_string(&target).unwrap(), "content");
        assert!(!dir.path().join("out.docx.part").exists());
    }

    /// Yields some bytes, then fails
    struct BrokenStream {
        sent: bool,
    }

    impl Read for BrokenStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream reset"));
            }
            self.sent = true;
            let chunk = b"partial";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_interrupted_write_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.docx");

        let err = write_atomically(&mut BrokenStream { sent: false }, &target).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(!target.exists());
        assert!(!dir.path().join("out.docx.part").exists());
    }

    #[test]
    fn test_interrupted_write_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.docx");
        fs::write(&target, "old export").unwrap();

        write_atomically(&mut BrokenStream { sent: false }, &target).unwrap_err();

        assert_eq!(fs::read_to_string(&target).unwrap(), "old export");
    }

    #[test]
    fn test_leftover_temp_file_is_replaced() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.docx");
        fs::write(dir.path().join("out.docx.part"), "stale bytes from a killed run").unwrap();

        write_atomically(&mut "fresh".as_bytes(), &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "fresh");
        assert!(!dir.path().join("out.docx.part").exists());
    }

    #[test]
    fn test_export_failure_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let store = InMemoryRemoteStore::new();
        store.add_document(RemoteDocument::new("d1", "Plan", GOOGLE_DOC));
        store.fail_exports_of("d1");

        let err = SyncEngine::new(&store, dir.path(), options()).run().unwrap_err();

        assert!(matches!(err, SyncError::Export { .. }));
        assert!(!dir.path().join("Unorganized/Plan.docx").exists());
        assert!(!dir.path().join("Unorganized/Plan.docx.part").exists());
        assert!(!ManifestStore::new(dir.path()).path().exists());
    }
}
