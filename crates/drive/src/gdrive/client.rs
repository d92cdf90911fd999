//! Google Drive API HTTP client
//!
//! Lists, inspects and exports files through the Drive v3 REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use std::io::Read;

use super::api::{File, FileList};
use super::{DriveAuth, normalize_file, normalize_folder};
use crate::models::{DocumentId, FolderMetadata};
use crate::storage::{DocumentPage, ListFilter, MalformedListing, RemoteStore};

/// Drive API client
pub struct DriveClient {
    auth: DriveAuth,
    page_size: usize,
}

impl DriveClient {
    const BASE_URL: &'static str = "https://www.googleapis.com/drive/v3";

    /// Fields requested for listed documents
    const LIST_FIELDS: &'static str =
        "nextPageToken, files(id, name, parents, owners, trashed, version, mimeType, modifiedTime)";

    /// Fields requested when walking up the folder tree
    const FOLDER_FIELDS: &'static str = "id, name, parents, trashed";

    /// Largest page size Drive accepts for `files.list`
    pub const MAX_PAGE_SIZE: usize = 1000;

    pub fn new(auth: DriveAuth) -> Self {
        Self {
            auth,
            page_size: Self::MAX_PAGE_SIZE,
        }
    }

    /// Use smaller listing pages
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, Self::MAX_PAGE_SIZE);
        self
    }

    /// Trigger authentication flow
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    /// List one page of files matching a Drive search query
    ///
    /// # Arguments
    /// * `query` - Drive search query (`q` parameter); empty for no filter
    /// * `page_token` - Optional page token for pagination
    pub fn list_files(&self, query: &str, page_token: Option<&str>) -> Result<FileList> {
        let access_token = self.auth.get_access_token()?;

        let mut url = format!(
            "{}/files?pageSize={}&fields={}",
            Self::BASE_URL,
            self.page_size,
            urlencoding::encode(Self::LIST_FIELDS)
        );
        if !query.is_empty() {
            url.push_str(&format!("&q={}", urlencoding::encode(query)));
        }
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send list files request")?;

        let list: FileList = response
            .body_mut()
            .read_json()
            .context("Failed to parse list files response")?;

        Ok(list)
    }

    /// Get a single file's metadata
    ///
    /// # Arguments
    /// * `id` - File ID, or `root` for the root folder
    /// * `fields` - Partial response field selector
    pub fn get_file(&self, id: &str, fields: &str) -> Result<File> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/files/{}?fields={}",
            Self::BASE_URL,
            urlencoding::encode(id),
            urlencoding::encode(fields)
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to send get file request for {}", id))?;

        let file: File = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse file response for {}", id))?;

        Ok(file)
    }

    /// Export a Google-native file, returning the response body as a stream
    pub fn export_file(&self, id: &str, mime_type: &str) -> Result<Box<dyn Read>> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/files/{}/export?mimeType={}",
            Self::BASE_URL,
            urlencoding::encode(id),
            urlencoding::encode(mime_type)
        );

        let response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to send export request for {}", id))?;

        Ok(Box::new(response.into_body().into_reader()))
    }
}

impl RemoteStore for DriveClient {
    fn list_page(&self, filter: &ListFilter, page_token: Option<&str>) -> Result<DocumentPage> {
        let list = self.list_files(&filter.to_query(), page_token)?;

        let documents = list
            .files
            .unwrap_or_default()
            .into_iter()
            .map(normalize_file)
            .collect::<std::result::Result<Vec<_>, MalformedListing>>()?;

        Ok(DocumentPage {
            documents,
            next_page_token: list.next_page_token,
        })
    }

    fn get_metadata(&self, id: &DocumentId) -> Result<FolderMetadata> {
        let file = self.get_file(id.as_str(), Self::FOLDER_FIELDS)?;
        Ok(normalize_folder(file))
    }

    fn export(&self, id: &DocumentId, export_mime_type: &str) -> Result<Box<dyn Read>> {
        self.export_file(id.as_str(), export_mime_type)
    }
}
