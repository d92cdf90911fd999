//! Manifest persistence in the backup destination directory

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::models::{MANIFEST_FILE_NAME, Manifest};

/// Reads and writes `manifest.json` in one destination directory
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(destination: impl AsRef<Path>) -> Self {
        Self {
            path: destination.as_ref().join(MANIFEST_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest, or an empty one when none has been written yet
    pub fn load(&self) -> SyncResult<Manifest> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No manifest at {}, starting fresh", self.path.display());
                return Ok(Manifest::new());
            }
            Err(cause) => return Err(self.io_error(cause)),
        };

        serde_json::from_slice(&content).map_err(|cause| SyncError::ManifestCorrupt {
            path: self.path.clone(),
            cause,
        })
    }

    /// Replace the manifest on disk
    ///
    /// Writes to a temporary file and renames it over the old manifest, so
    /// readers only ever see the previous or the new manifest in full.
    pub fn save(&self, manifest: &Manifest) -> SyncResult<()> {
        let json = serde_json::to_vec_pretty(manifest).map_err(|e| self.io_error(e.into()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });

        if let Err(cause) = written.and_then(|()| fs::rename(&temp_path, &self.path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(cause));
        }

        log::debug!(
            "Wrote manifest with {} entries to {}",
            manifest.len(),
            self.path.display()
        );
        Ok(())
    }

    fn io_error(&self, cause: std::io::Error) -> SyncError {
        SyncError::ManifestIo {
            path: self.path.clone(),
            cause,
        }
    }
}
