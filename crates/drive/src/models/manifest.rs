//! Backup manifest: the record of what the last successful run downloaded
//!
//! Serialized field names are PascalCase so manifests written by earlier
//! versions of the backup tool keep loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{DocumentId, RemoteDocument};

/// File name of the manifest inside the backup destination directory
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// One downloaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestEntry {
    pub id: DocumentId,
    pub name: String,
    pub version: i64,
    pub owner: String,
    /// Folder-name chains, one per parent, as they were when downloaded
    pub parent_names: Vec<Vec<String>>,
    pub modified_time: DateTime<Utc>,
    pub downloaded_time: DateTime<Utc>,
    /// Path of the exported file relative to the destination directory
    pub download_path: PathBuf,
}

/// All documents known to be backed up, keyed by document ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    /// When the run that produced this manifest started
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub entries: BTreeMap<DocumentId, ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest stamped with the current time
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: &DocumentId) -> Option<&ManifestEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the recorded entry if this exact version was already downloaded
    ///
    /// Only the version is compared. Renames, moves and ownership changes
    /// do not bump it and do not trigger a new download.
    pub fn unchanged_entry(&self, document: &RemoteDocument) -> Option<&ManifestEntry> {
        self.entries
            .get(&document.id)
            .filter(|entry| entry.version == document.version)
    }

    /// Record a fresh download of `document`
    pub fn record_download(
        &mut self,
        document: &RemoteDocument,
        parent_names: Vec<Vec<String>>,
        download_path: PathBuf,
    ) -> &ManifestEntry {
        let entry = ManifestEntry {
            id: document.id.clone(),
            name: document.name.clone(),
            version: document.version,
            owner: document.owner.clone(),
            parent_names,
            modified_time: document.modified_time,
            downloaded_time: Utc::now(),
            download_path,
        };
        self.insert(entry)
    }

    /// Carry an entry from a previous manifest over unchanged
    pub fn carry_over(&mut self, entry: &ManifestEntry) -> &ManifestEntry {
        self.insert(entry.clone())
    }

    fn insert(&mut self, entry: ManifestEntry) -> &ManifestEntry {
        let id = entry.id.clone();
        self.entries.insert(id.clone(), entry);
        &self.entries[&id]
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}
