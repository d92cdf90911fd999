//! Remote document model, rebuilt from the Drive listing on every run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::export::{ExportFormat, export_format};

/// Unique identifier for a Drive file or folder
///
/// Stable across renames and moves, so it is the key of the backup manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Alias Drive accepts for the user's root folder
    pub const ROOT_ALIAS: &'static str = "root";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root_alias() -> Self {
        Self::new(Self::ROOT_ALIAS)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A document that can be exported from Drive
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: DocumentId,
    /// Display name, may change between runs
    pub name: String,
    /// Drive's per-file version counter; the only change signal used for skipping
    pub version: i64,
    /// `"me"` for self-owned documents, otherwise the owner's email or `"unknown"`
    pub owner: String,
    pub modified_time: DateTime<Utc>,
    pub mime_type: String,
    /// Containing folders; empty for unorganized documents
    pub parent_ids: Vec<DocumentId>,
}

impl RemoteDocument {
    /// Owner value used for documents owned by the authenticated user
    pub const OWNER_ME: &'static str = "me";
    /// Owner value used when Drive reports zero or several owners
    pub const OWNER_UNKNOWN: &'static str = "unknown";

    pub fn new(id: impl Into<DocumentId>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: 1,
            owner: Self::OWNER_ME.to_string(),
            modified_time: Utc::now(),
            mime_type: mime_type.into(),
            parent_ids: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_modified_time(mut self, modified_time: DateTime<Utc>) -> Self {
        self.modified_time = modified_time;
        self
    }

    pub fn with_parents<I, P>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<DocumentId>,
    {
        self.parent_ids = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Export format for this document, if its mime type is exportable
    pub fn export_format(&self) -> Option<&'static ExportFormat> {
        export_format(&self.mime_type)
    }
}

/// The subset of a folder's metadata needed to walk up the folder tree
#[derive(Debug, Clone, PartialEq)]
pub struct FolderMetadata {
    pub id: DocumentId,
    pub name: String,
    pub parent_ids: Vec<DocumentId>,
}
