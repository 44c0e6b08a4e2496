//! s3-artifact-store library -- artifact repository access on S3.
//!
//! This crate maps a build tool's view of an artifact repository (logical
//! paths under a base directory, directory listings, freshness checks) onto
//! a flat S3 key space.  It covers credential, region and endpoint
//! resolution, key resolution, lazy paginated key iteration, the blocking
//! [`StorageRepository`] handle, and the [`ArtifactTransport`] facade with
//! session and transfer notifications.

pub mod config;
pub mod connect;
pub mod errors;
pub mod events;
pub mod goals;
pub mod iter;
pub mod key;
pub mod listing;
pub mod progress;
pub mod repository;
pub mod storage;
pub mod transport;

pub use errors::{StorageError, StorageResult};
pub use iter::{ConcatenatedKeyIterator, KeyCursor, PagedKeyIterator};
pub use listing::ListingTree;
pub use repository::{RepositorySettings, StorageRepository};
pub use transport::ArtifactTransport;
