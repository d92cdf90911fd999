//! Domain models for backup entities

mod document;
mod export;
mod manifest;

pub use document::{DocumentId, FolderMetadata, RemoteDocument};
pub use export::{
    EXPORT_FORMATS, ExportFormat, GOOGLE_DOC, GOOGLE_FORM, GOOGLE_PRESENTATION, GOOGLE_SPREADSHEET,
    export_format, exportable_mime_types,
};
pub use manifest::{MANIFEST_FILE_NAME, Manifest, ManifestEntry};
