//! Path resolution and caching core

pub mod cache;
pub mod error;
pub mod filesystem;
pub mod janitor;
pub mod lister;
pub mod metadata;
pub mod path;
pub mod read_handle;
pub mod resolver;
pub mod write_handle;

pub use cache::LookupCache;
pub use error::{FsError, FsErrorKind, FsResult};
pub use filesystem::{DriveFs, OpenHandle, OpenOptions};
pub use janitor::spawn_cache_janitor;
pub use metadata::Metadata;
pub use read_handle::ReadHandle;
pub use write_handle::WriteHandle;
