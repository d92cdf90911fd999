//! Google Drive API integration
//!
//! This module provides:
//! - OAuth2 authentication flow
//! - Drive API client implementing [`crate::storage::RemoteStore`]
//! - Response normalization to domain models

mod auth;
mod client;
mod normalize;

pub use auth::DriveAuth;
pub use client::DriveClient;
pub use normalize::{normalize_file, normalize_folder, normalize_owner};

/// Drive API v3 response types
pub mod api {
    use serde::Deserialize;

    /// Response from `files.list`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FileList {
        pub files: Option<Vec<File>>,
        pub next_page_token: Option<String>,
    }

    /// A file resource, limited to the fields the backup requests
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct File {
        pub id: String,
        #[serde(default)]
        pub name: String,
        pub mime_type: Option<String>,
        pub parents: Option<Vec<String>>,
        pub owners: Option<Vec<User>>,
        pub trashed: Option<bool>,
        /// int64 encoded as a JSON string
        pub version: Option<String>,
        /// RFC 3339 timestamp
        pub modified_time: Option<String>,
    }

    /// A file owner
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        pub email_address: Option<String>,
        pub display_name: Option<String>,
        #[serde(default)]
        pub me: bool,
    }
}
