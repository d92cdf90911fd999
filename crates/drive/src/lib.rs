//! Drive crate - incremental backup of Google Docs to local disk
//!
//! This crate provides:
//! - Domain models (RemoteDocument, Manifest, export formats)
//! - The `RemoteStore` abstraction with Drive and in-memory implementations
//! - Atomic manifest persistence
//! - The incremental sync engine (listing with retry, folder-path
//!   resolution, version-gated export)
//! - Google Drive API client and OAuth authentication

pub mod credentials;
pub mod error;
pub mod gdrive;
pub mod models;
pub mod storage;
pub mod sync;

pub use credentials::DriveCredentials;
pub use error::{SyncError, SyncResult};
pub use gdrive::{DriveAuth, DriveClient};
pub use models::{
    DocumentId, ExportFormat, FolderMetadata, Manifest, ManifestEntry, RemoteDocument,
    export_format,
};
pub use storage::{
    DocumentPage, InMemoryRemoteStore, ListFilter, MalformedListing, ManifestStore, RemoteStore,
};
pub use sync::{
    ParentNameCache, ParentPathResolver, RemoteLister, ResolvedPath, RetryPolicy, SyncEngine,
    SyncOptions, SyncPhase, SyncStats, sanitize_segment,
};
