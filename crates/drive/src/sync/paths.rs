//! Local path construction for exported documents

use std::path::PathBuf;

/// Make a Drive name usable as a single path segment
///
/// Separators, `:` and NUL become `_`; `.` and `..` are replaced so a name
/// can never climb out of or collapse into its parent directory.
/// Different names may map to the same segment.
pub fn sanitize_segment(name: &str) -> String {
    match name {
        "." => "_".to_string(),
        ".." => "__".to_string(),
        _ => name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '\0' => '_',
                c => c,
            })
            .collect(),
    }
}

/// Candidate locations of one document, one folder-name chain per parent
///
/// Chains hold the unsanitized names, which is what the manifest records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    chains: Vec<Vec<String>>,
}

impl ResolvedPath {
    /// Chains must be non-empty; unorganized documents use `[["Unorganized"]]`.
    pub(crate) fn new(chains: Vec<Vec<String>>) -> Self {
        debug_assert!(!chains.is_empty());
        Self { chains }
    }

    pub fn chains(&self) -> &[Vec<String>] {
        &self.chains
    }

    pub fn into_chains(self) -> Vec<Vec<String>> {
        self.chains
    }

    /// The chain the document is downloaded under: always the first parent's
    pub fn canonical_chain(&self) -> &[String] {
        self.chains.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// Relative file path under the canonical chain
    pub fn canonical_file(&self, name: &str, extension: &str) -> PathBuf {
        Self::file_under(self.canonical_chain(), name, extension)
    }

    fn file_under(chain: &[String], name: &str, extension: &str) -> PathBuf {
        let mut path: PathBuf = chain.iter().map(|n| sanitize_segment(n)).collect();
        path.push(format!("{}{}", sanitize_segment(name), extension));
        path
    }
}
