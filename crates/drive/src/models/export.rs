//! Fixed mapping from Google-native mime types to downloadable formats
//!
//! Only documents whose mime type appears here are listed at all; anything
//! else (uploaded PDFs, images, folders) is left out of the backup.

pub const GOOGLE_SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
pub const GOOGLE_DOC: &str = "application/vnd.google-apps.document";
pub const GOOGLE_PRESENTATION: &str = "application/vnd.google-apps.presentation";
pub const GOOGLE_FORM: &str = "application/vnd.google-apps.form";

/// How a Google-native document is exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Mime type of the document in Drive
    pub source_mime_type: &'static str,
    /// Mime type requested from the export endpoint
    pub export_mime_type: &'static str,
    /// Extension appended to the sanitized file name, including the dot
    pub extension: &'static str,
}

pub const EXPORT_FORMATS: &[ExportFormat] = &[
    ExportFormat {
        source_mime_type: GOOGLE_SPREADSHEET,
        export_mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        extension: ".xlsx",
    },
    ExportFormat {
        source_mime_type: GOOGLE_DOC,
        export_mime_type: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        extension: ".docx",
    },
    ExportFormat {
        source_mime_type: GOOGLE_PRESENTATION,
        export_mime_type: "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        extension: ".pptx",
    },
    ExportFormat {
        source_mime_type: GOOGLE_FORM,
        export_mime_type: "application/zip",
        extension: ".zip",
    },
];

/// Look up the export format for a source mime type
pub fn export_format(mime_type: &str) -> Option<&'static ExportFormat> {
    EXPORT_FORMATS
        .iter()
        .find(|format| format.source_mime_type == mime_type)
}

/// All mime types with a known export format
pub fn exportable_mime_types() -> impl Iterator<Item = &'static str> {
    EXPORT_FORMATS.iter().map(|format| format.source_mime_type)
}
