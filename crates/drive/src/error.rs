//! Errors that abort a backup run
//!
//! Every variant is fatal for the run. None of them touch the manifest on
//! disk, so the next run starts from the last successful state.

use std::path::PathBuf;

use crate::models::DocumentId;

pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A listing page could not be fetched even after retrying
    #[error("Failed to list documents after {attempts} attempts: {cause:#}")]
    RemoteList { attempts: u32, cause: anyhow::Error },

    /// Metadata for an ancestor folder could not be fetched
    #[error("Failed to look up folder {id}: {cause:#}")]
    RemoteLookup { id: DocumentId, cause: anyhow::Error },

    /// An ancestor folder sits in more than one parent folder
    #[error(
        "Folder '{name}' ({id}) has {parent_count} parents; only documents may have several parents, folders above them must form a single chain"
    )]
    AmbiguousAncestry {
        id: DocumentId,
        name: String,
        parent_count: usize,
    },

    /// Walking up from a folder revisited a folder or never reached a root
    #[error("Folder ancestry of {id} loops or is deeper than {max_depth} levels")]
    AncestryCycle { id: DocumentId, max_depth: usize },

    /// Exporting or writing a changed document failed
    #[error("Failed to export '{name}' ({id}): {cause:#}")]
    Export {
        id: DocumentId,
        name: String,
        cause: anyhow::Error,
    },

    /// A manifest file exists but is not valid
    #[error("Manifest {} is corrupt: {cause}", .path.display())]
    ManifestCorrupt {
        path: PathBuf,
        cause: serde_json::Error,
    },

    /// Reading or writing the manifest failed
    #[error("Manifest I/O failed for {}: {cause}", .path.display())]
    ManifestIo { path: PathBuf, cause: std::io::Error },
}

impl SyncError {
    /// True for errors caused by the shape of the user's Drive rather than
    /// a transient fault; retrying the run will not help.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SyncError::AmbiguousAncestry { .. } | SyncError::AncestryCycle { .. }
        )
    }
}
