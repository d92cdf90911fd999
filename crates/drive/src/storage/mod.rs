//! Remote store abstraction and local manifest persistence
//!
//! The sync engine only talks to Drive through [`RemoteStore`], so the
//! in-memory implementation can stand in for the real client in tests.

mod manifest_file;
mod memory;
mod traits;

pub use manifest_file::ManifestStore;
pub use memory::InMemoryRemoteStore;
pub use traits::{DocumentPage, ListFilter, MalformedListing, RemoteStore};
