//! In-memory remote store
//!
//! Used by tests and for dry runs of the sync engine. Failures can be
//! injected, and every metadata lookup and export is recorded so callers
//! can assert on how many remote calls a run made.

use anyhow::{Result, anyhow, bail};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::RwLock;

use super::{DocumentPage, ListFilter, RemoteStore};
use crate::models::{DocumentId, FolderMetadata, RemoteDocument};

struct StoredDocument {
    document: RemoteDocument,
    trashed: bool,
}

/// In-memory implementation of RemoteStore
pub struct InMemoryRemoteStore {
    root_id: DocumentId,
    page_size: usize,
    folders: RwLock<HashMap<DocumentId, FolderMetadata>>,
    /// Kept in insertion order, which is also listing order
    documents: RwLock<Vec<StoredDocument>>,
    contents: RwLock<HashMap<DocumentId, Vec<u8>>>,
    /// Number of upcoming `list_page` calls that fail
    pending_list_failures: RwLock<u32>,
    failing_exports: RwLock<HashSet<DocumentId>>,
    list_calls: RwLock<usize>,
    metadata_lookups: RwLock<Vec<DocumentId>>,
    exports: RwLock<Vec<(DocumentId, String)>>,
}

impl InMemoryRemoteStore {
    /// Create a store with an empty root folder
    pub fn new() -> Self {
        let root_id = DocumentId::new("root-folder");
        let root = FolderMetadata {
            id: root_id.clone(),
            name: "My Drive".to_string(),
            parent_ids: Vec::new(),
        };

        Self {
            root_id: root_id.clone(),
            page_size: 100,
            folders: RwLock::new(HashMap::from([(root_id, root)])),
            documents: RwLock::new(Vec::new()),
            contents: RwLock::new(HashMap::new()),
            pending_list_failures: RwLock::new(0),
            failing_exports: RwLock::new(HashSet::new()),
            list_calls: RwLock::new(0),
            metadata_lookups: RwLock::new(Vec::new()),
            exports: RwLock::new(Vec::new()),
        }
    }

    /// Set how many documents each listing page holds
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Real ID of the root folder
    pub fn root_id(&self) -> &DocumentId {
        &self.root_id
    }

    /// Add a folder under the given parents (use [`Self::root_id`] for top level)
    pub fn add_folder(&self, id: &str, name: &str, parents: &[&str]) {
        let folder = FolderMetadata {
            id: DocumentId::new(id),
            name: name.to_string(),
            parent_ids: parents.iter().map(|p| DocumentId::new(*p)).collect(),
        };
        self.folders.write().unwrap().insert(folder.id.clone(), folder);
    }

    /// Add a document, or replace the one with the same ID in place
    pub fn add_document(&self, document: RemoteDocument) {
        self.insert_document(document, false);
    }

    /// Add a document that sits in the trash
    pub fn add_trashed_document(&self, document: RemoteDocument) {
        self.insert_document(document, true);
    }

    fn insert_document(&self, document: RemoteDocument, trashed: bool) {
        let mut documents = self.documents.write().unwrap();
        let stored = StoredDocument { document, trashed };
        match documents
            .iter_mut()
            .find(|d| d.document.id == stored.document.id)
        {
            Some(existing) => *existing = stored,
            None => documents.push(stored),
        }
    }

    /// Apply a change to a stored document, as if it was edited remotely
    pub fn update_document<F>(&self, id: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut RemoteDocument),
    {
        let mut documents = self.documents.write().unwrap();
        let stored = documents
            .iter_mut()
            .find(|d| d.document.id.as_str() == id)
            .ok_or_else(|| anyhow!("Document not found: {}", id))?;
        update(&mut stored.document);
        Ok(())
    }

    /// Set the bytes returned when exporting a document
    pub fn set_content(&self, id: &str, content: impl Into<Vec<u8>>) {
        self.contents
            .write()
            .unwrap()
            .insert(DocumentId::new(id), content.into());
    }

    /// Make the next `count` listing calls fail
    pub fn fail_next_list_calls(&self, count: u32) {
        *self.pending_list_failures.write().unwrap() = count;
    }

    /// Make every export of this document fail
    pub fn fail_exports_of(&self, id: &str) {
        self.failing_exports
            .write()
            .unwrap()
            .insert(DocumentId::new(id));
    }

    /// Stop failing exports of this document
    pub fn clear_export_failure(&self, id: &str) {
        self.failing_exports
            .write()
            .unwrap()
            .remove(&DocumentId::new(id));
    }

    /// Number of `list_page` calls made, failed ones included
    pub fn list_calls(&self) -> usize {
        *self.list_calls.read().unwrap()
    }

    /// IDs passed to `get_metadata`, in call order
    pub fn metadata_lookups(&self) -> Vec<DocumentId> {
        self.metadata_lookups.read().unwrap().clone()
    }

    /// `(id, export mime type)` of every successful export, in call order
    pub fn exports(&self) -> Vec<(DocumentId, String)> {
        self.exports.read().unwrap().clone()
    }

    /// Forget recorded calls, keeping documents and folders
    pub fn reset_counters(&self) {
        *self.list_calls.write().unwrap() = 0;
        self.metadata_lookups.write().unwrap().clear();
        self.exports.write().unwrap().clear();
    }

    fn default_content(document: &RemoteDocument) -> Vec<u8> {
        format!("{} v{}", document.id, document.version).into_bytes()
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn list_page(&self, filter: &ListFilter, page_token: Option<&str>) -> Result<DocumentPage> {
        *self.list_calls.write().unwrap() += 1;

        {
            let mut failures = self.pending_list_failures.write().unwrap();
            if *failures > 0 {
                *failures -= 1;
                bail!("Simulated listing failure");
            }
        }

        let offset = match page_token.filter(|t| !t.is_empty()) {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| anyhow!("Invalid page token: {}", token))?,
            None => 0,
        };

        let documents = self.documents.read().unwrap();
        let matching: Vec<&RemoteDocument> = documents
            .iter()
            .filter(|d| filter.matches(&d.document.mime_type, d.trashed))
            .map(|d| &d.document)
            .collect();

        let end = (offset + self.page_size).min(matching.len());
        let page = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|d| (*d).clone())
            .collect();

        Ok(DocumentPage {
            documents: page,
            next_page_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    fn get_metadata(&self, id: &DocumentId) -> Result<FolderMetadata> {
        let id = if id.as_str() == DocumentId::ROOT_ALIAS {
            &self.root_id
        } else {
            id
        };
        self.metadata_lookups.write().unwrap().push(id.clone());

        if let Some(folder) = self.folders.read().unwrap().get(id) {
            return Ok(folder.clone());
        }

        // Documents can be looked up too, the same way Drive allows it
        self.documents
            .read()
            .unwrap()
            .iter()
            .find(|d| &d.document.id == id)
            .map(|d| FolderMetadata {
                id: d.document.id.clone(),
                name: d.document.name.clone(),
                parent_ids: d.document.parent_ids.clone(),
            })
            .ok_or_else(|| anyhow!("File not found: {}", id))
    }

    fn export(&self, id: &DocumentId, export_mime_type: &str) -> Result<Box<dyn Read>> {
        if self.failing_exports.read().unwrap().contains(id) {
            bail!("Simulated export failure for {}", id);
        }

        let content = match self.contents.read().unwrap().get(id) {
            Some(content) => content.clone(),
            None => {
                let documents = self.documents.read().unwrap();
                let stored = documents
                    .iter()
                    .find(|d| &d.document.id == id)
                    .ok_or_else(|| anyhow!("File not found: {}", id))?;
                Self::default_content(&stored.document)
            }
        };

        self.exports
            .write()
            .unwrap()
            .push((id.clone(), export_mime_type.to_string()));
        Ok(Box::new(Cursor::new(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GOOGLE_DOC;

    #[test]
    fn test_pagination() {
        let store = InMemoryRemoteStore::new().with_page_size(2);
        for i in 0..5 {
            store.add_document(RemoteDocument::new(format!("d{}", i), "Doc", GOOGLE_DOC));
        }
        let filter = ListFilter::exportable();

        let first = store.list_page(&filter, None).unwrap();
        assert_eq!(first.documents.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let last = store.list_page(&filter, Some("4")).unwrap();
        assert_eq!(last.documents.len(), 1);
        assert!(last.next_page_token.is_none());
    }

    #[test]
    fn test_listing_applies_filter() {
        let store = InMemoryRemoteStore::new();
        store.add_document(RemoteDocument::new("d1", "Doc", GOOGLE_DOC));
        store.add_trashed_document(RemoteDocument::new("d2", "Old", GOOGLE_DOC));
        store.add_document(RemoteDocument::new("d3", "photo.png", "image/png"));

        let page = store.list_page(&ListFilter::exportable(), None).unwrap();
        let ids: Vec<_> = page.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d1"]);
    }

    #[test]
    fn test_injected_list_failures() {
        let store = InMemoryRemoteStore::new();
        store.fail_next_list_calls(2);
        let filter = ListFilter::exportable();

        assert!(store.list_page(&filter, None).is_err());
        assert!(store.list_page(&filter, None).is_err());
        assert!(store.list_page(&filter, None).is_ok());
        assert_eq!(store.list_calls(), 3);
    }

    #[test]
    fn test_root_alias_resolves() {
        let store = InMemoryRemoteStore::new();
        let root = store.get_metadata(&DocumentId::root_alias()).unwrap();
        assert_eq!(&root.id, store.root_id());
        assert_eq!(store.metadata_lookups(), vec![store.root_id().clone()]);
    }

    #[test]
    fn test_export_returns_content() {
        let store = InMemoryRemoteStore::new();
        store.add_document(RemoteDocument::new("d1", "Doc", GOOGLE_DOC));
        store.set_content("d1", "hello");

        let mut bytes = String::new();
        store
            .export(&DocumentId::new("d1"), "application/zip")
            .unwrap()
            .read_to_string(&mut bytes)
            .unwrap();
        assert_eq!(bytes, "hello");

        store.fail_exports_of("d1");
        assert!(store.export(&DocumentId::new("d1"), "application/zip").is_err());
        assert_eq!(store.exports().len(), 1);
    }
}
