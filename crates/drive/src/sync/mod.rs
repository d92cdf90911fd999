//! Incremental backup engine
//!
//! - [`paths`]: path-segment sanitizing and candidate file paths
//! - [`resolver`]: memoized folder-chain resolution
//! - [`lister`]: paginated listing with retry
//! - [`engine`]: the run itself (list, diff, export, commit manifest)

mod engine;
mod lister;
mod paths;
mod resolver;

pub use engine::{SyncEngine, SyncOptions, SyncPhase, SyncStats};
pub use lister::{RemoteLister, RetryPolicy};
pub use paths::{ResolvedPath, sanitize_segment};
pub use resolver::{MAX_ANCESTRY_DEPTH, ParentNameCache, ParentPathResolver, UNORGANIZED};
