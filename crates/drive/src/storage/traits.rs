//! Remote store trait definitions

use anyhow::Result;
use std::io::Read;

use crate::models::{DocumentId, FolderMetadata, RemoteDocument, exportable_mime_types};

/// Restricts a listing to the documents worth backing up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub mime_types: Vec<String>,
    pub include_trashed: bool,
}

impl ListFilter {
    /// Every exportable mime type, trashed documents excluded
    pub fn exportable() -> Self {
        Self {
            mime_types: exportable_mime_types().map(str::to_string).collect(),
            include_trashed: false,
        }
    }

    /// Render as a Drive `files.list` search query
    pub fn to_query(&self) -> String {
        let mime_clause = self
            .mime_types
            .iter()
            .map(|mime| format!("mimeType='{}'", mime.replace('\'', "\\'")))
            .collect::<Vec<_>>()
            .join(" or ");

        match (self.include_trashed, mime_clause.is_empty()) {
            (true, true) => String::new(),
            (true, false) => mime_clause,
            (false, true) => "trashed != true".to_string(),
            (false, false) => format!("trashed != true and ({})", mime_clause),
        }
    }

    /// Whether a document with this mime type and trash state passes the filter
    pub fn matches(&self, mime_type: &str, trashed: bool) -> bool {
        (self.include_trashed || !trashed) && self.mime_types.iter().any(|m| m == mime_type)
    }
}

/// One page of a document listing
#[derive(Debug, Clone, Default)]
pub struct DocumentPage {
    pub documents: Vec<RemoteDocument>,
    /// Token for the next page; `None` or empty when this was the last page
    pub next_page_token: Option<String>,
}

/// A listing page that arrived intact but cannot be understood
///
/// Fetching the same page again returns the same content, so listers give
/// up on it immediately instead of retrying.
#[derive(Debug, thiserror::Error)]
#[error("Malformed listing entry {id}: {reason}")]
pub struct MalformedListing {
    pub id: String,
    pub reason: String,
}

/// Operations the backup needs from a cloud document store
///
/// Implementations do not retry. Listing retries live in the sync layer,
/// metadata lookups and exports are not retried at all.
pub trait RemoteStore {
    /// Fetch one page of documents matching `filter`
    fn list_page(&self, filter: &ListFilter, page_token: Option<&str>) -> Result<DocumentPage>;

    /// Fetch name and parents of a folder (or any file) by ID
    ///
    /// [`DocumentId::root_alias`] must resolve to the root folder's real ID.
    fn get_metadata(&self, id: &DocumentId) -> Result<FolderMetadata>;

    /// Export a document in the given format as a byte stream
    fn export(&self, id: &DocumentId, export_mime_type: &str) -> Result<Box<dyn Read>>;
}
