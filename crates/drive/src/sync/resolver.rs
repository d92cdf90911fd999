//! Folder-name resolution for documents
//!
//! Walks from a folder up to the root, one metadata lookup per folder, and
//! remembers every chain it builds for the rest of the run.

use std::collections::{HashMap, HashSet};

use super::paths::ResolvedPath;
use crate::error::{SyncError, SyncResult};
use crate::models::{DocumentId, RemoteDocument};
use crate::storage::RemoteStore;

/// First chain element for anything outside the user's folder tree
pub const UNORGANIZED: &str = "Unorganized";

/// Most folders a resolved chain may hold below its first label
///
/// Applies to the whole chain, cached prefix included, so the outcome does
/// not depend on which folders were resolved earlier in the run.
pub const MAX_ANCESTRY_DEPTH: usize = 256;

/// Folder ID to name chain, valid for a single run
#[derive(Debug, Clone, Default)]
pub struct ParentNameCache {
    chains: HashMap<DocumentId, Vec<String>>,
}

impl ParentNameCache {
    /// Cache with the root folder pre-resolved to `[root_label]`
    pub fn seeded(root_id: DocumentId, root_label: impl Into<String>) -> Self {
        Self {
            chains: HashMap::from([(root_id, vec![root_label.into()])]),
        }
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Vec<String>> {
        self.chains.get(id)
    }

    fn insert(&mut self, id: DocumentId, chain: Vec<String>) {
        self.chains.insert(id, chain);
    }
}

/// Resolves documents' folder chains against a remote store
pub struct ParentPathResolver<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    cache: ParentNameCache,
}

impl<'a, S: RemoteStore + ?Sized> ParentPathResolver<'a, S> {
    pub fn new(store: &'a S, cache: ParentNameCache) -> Self {
        Self { store, cache }
    }

    /// Look up the root folder's real ID and seed a fresh cache with it
    pub fn for_root(store: &'a S, root_label: &str) -> SyncResult<Self> {
        let alias = DocumentId::root_alias();
        let root = store
            .get_metadata(&alias)
            .map_err(|cause| SyncError::RemoteLookup { id: alias, cause })?;
        log::debug!("Root folder is {} ({})", root.name, root.id);
        Ok(Self::new(store, ParentNameCache::seeded(root.id, root_label)))
    }

    pub fn cache(&self) -> &ParentNameCache {
        &self.cache
    }

    /// Name chain of a folder, from the top-most ancestor down to the folder itself
    pub fn resolve(&mut self, id: &DocumentId) -> SyncResult<Vec<String>> {
        // Folders fetched on the way up, nearest first
        let mut pending: Vec<(DocumentId, String)> = Vec::new();
        let mut visited = HashSet::new();
        let mut current = id.clone();

        let mut chain = loop {
            if let Some(cached) = self.cache.get(&current) {
                break cached.clone();
            }
            if pending.len() >= MAX_ANCESTRY_DEPTH || !visited.insert(current.clone()) {
                return Err(SyncError::AncestryCycle {
                    id: id.clone(),
                    max_depth: MAX_ANCESTRY_DEPTH,
                });
            }

            let folder = self
                .store
                .get_metadata(&current)
                .map_err(|cause| SyncError::RemoteLookup {
                    id: current.clone(),
                    cause,
                })?;

            match folder.parent_ids.as_slice() {
                [] => {
                    pending.push((current, folder.name));
                    break vec![UNORGANIZED.to_string()];
                }
                [parent] => {
                    let parent = parent.clone();
                    pending.push((current, folder.name));
                    current = parent;
                }
                parents => {
                    return Err(SyncError::AmbiguousAncestry {
                        id: current,
                        name: folder.name,
                        parent_count: parents.len(),
                    });
                }
            }
        };

        if chain.len() - 1 + pending.len() > MAX_ANCESTRY_DEPTH {
            return Err(SyncError::AncestryCycle {
                id: id.clone(),
                max_depth: MAX_ANCESTRY_DEPTH,
            });
        }

        for (folder_id, name) in pending.into_iter().rev() {
            chain.push(name);
            self.cache.insert(folder_id, chain.clone());
        }
        Ok(chain)
    }

    /// One chain per parent of `document`, in parent order
    pub fn resolve_document(&mut self, document: &RemoteDocument) -> SyncResult<ResolvedPath> {
        if document.parent_ids.is_empty() {
            return Ok(ResolvedPath::new(vec![vec![UNORGANIZED.to_string()]]));
        }

        let chains = document
            .parent_ids
            .iter()
            .map(|parent| self.resolve(parent))
            .collect::<SyncResult<Vec<_>>>()?;
        Ok(ResolvedPath::new(chains))
    }
}
