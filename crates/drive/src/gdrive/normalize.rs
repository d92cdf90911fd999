//! Drive API response normalization
//!
//! Converts Drive file resources to backup domain models.

use chrono::{DateTime, Utc};

use super::api::{File, User};
use crate::models::{DocumentId, FolderMetadata, RemoteDocument};
use crate::storage::MalformedListing;

/// Normalize a listed Drive file to a RemoteDocument
pub fn normalize_file(file: File) -> Result<RemoteDocument, MalformedListing> {
    let version = match file.version.as_deref() {
        Some(v) => v.parse::<i64>().map_err(|e| MalformedListing {
            id: file.id.clone(),
            reason: format!("invalid version '{}': {}", v, e),
        })?,
        None => 0,
    };

    // Unparseable times fall back to the epoch; they are informational only
    let modified_time = file
        .modified_time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Ok(RemoteDocument {
        id: DocumentId::new(file.id),
        name: file.name,
        version,
        owner: normalize_owner(file.owners.as_deref().unwrap_or_default()),
        modified_time,
        mime_type: file.mime_type.unwrap_or_default(),
        parent_ids: parent_ids(file.parents),
    })
}

/// Normalize a Drive file fetched for its place in the folder tree
pub fn normalize_folder(file: File) -> FolderMetadata {
    FolderMetadata {
        id: DocumentId::new(file.id),
        name: file.name,
        parent_ids: parent_ids(file.parents),
    }
}

/// `"me"` for a sole self-owner, the owner's email for any other sole
/// owner, `"unknown"` otherwise
pub fn normalize_owner(owners: &[User]) -> String {
    match owners {
        [owner] if owner.me => RemoteDocument::OWNER_ME.to_string(),
        [owner] => owner
            .email_address
            .clone()
            .unwrap_or_else(|| RemoteDocument::OWNER_UNKNOWN.to_string()),
        _ => RemoteDocument::OWNER_UNKNOWN.to_string(),
    }
}

fn parent_ids(parents: Option<Vec<String>>) -> Vec<DocumentId> {
    parents
        .unwrap_or_default()
        .into_iter()
        .map(DocumentId::new)
        .collect()
}
