//! Paginated listing of exportable documents with retry

use std::time::Duration;

use crate::error::{SyncError, SyncResult};
use crate::models::RemoteDocument;
use crate::storage::{DocumentPage, ListFilter, MalformedListing, RemoteStore};

/// Fixed-delay retry policy for listing page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per page, the first one included
    pub max_attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 10;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Retry without sleeping; meant for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_BACKOFF)
    }
}

/// Enumerates every exportable document in a remote store
pub struct RemoteLister<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    filter: ListFilter,
    retry: RetryPolicy,
}

impl<'a, S: RemoteStore + ?Sized> RemoteLister<'a, S> {
    pub fn new(store: &'a S, retry: RetryPolicy) -> Self {
        Self {
            store,
            filter: ListFilter::exportable(),
            retry,
        }
    }

    /// Replace the default exportable-documents filter
    pub fn with_filter(mut self, filter: ListFilter) -> Self {
        self.filter = filter;
        self
    }

    /// List all exportable documents, following page tokens to the end
    ///
    /// Returns the complete listing or an error, never a partial one.
    ///
    /// # Arguments
    /// * `progress` - called after each page with the running document count
    pub fn list_exportable<F>(&self, mut progress: F) -> SyncResult<Vec<RemoteDocument>>
    where
        F: FnMut(usize),
    {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(page_token.as_deref())?;

            for document in page.documents {
                if document.export_format().is_some() {
                    documents.push(document);
                } else {
                    log::debug!(
                        "Excluding '{}' ({}): no export format for {}",
                        document.name,
                        document.id,
                        document.mime_type
                    );
                }
            }
            progress(documents.len());

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        log::info!("Listed {} exportable documents", documents.len());
        Ok(documents)
    }

    /// Fetch one page, retrying per the policy
    ///
    /// A [`MalformedListing`] is returned straight away; refetching would
    /// give the same content.
    fn fetch_page(&self, page_token: Option<&str>) -> SyncResult<DocumentPage> {
        let mut attempt = 1;
        loop {
            match self.store.list_page(&self.filter, page_token) {
                Ok(page) => return Ok(page),
                Err(cause) if cause.downcast_ref::<MalformedListing>().is_some() => {
                    log::warn!("Listing page cannot be parsed, not retrying: {:#}", cause);
                    return Err(SyncError::RemoteList {
                        attempts: attempt,
                        cause,
                    });
                }
                Err(cause) if attempt >= self.retry.max_attempts => {
                    return Err(SyncError::RemoteList {
                        attempts: attempt,
                        cause,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Listing page failed (attempt {}/{}): {:#}",
                        attempt,
                        self.retry.max_attempts,
                        e
                    );
                    if !self.retry.backoff.is_zero() {
                        std::thread::sleep(self.retry.backoff);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
