//! Abstract object backend trait.
//!
//! Every backend must implement [`ObjectBackend`].  A backend is bound to a
//! single bucket and speaks in raw storage keys; base-directory handling
//! and error classification for callers live in the repository layer.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use thiserror::Error;

use crate::progress::ProgressSender;

/// Backend-level failure.  The only distinction the repository needs is
/// "the key is absent" versus everything else.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend reports no object at this key.
    #[error("no such key: {key}")]
    NotFound { key: String },

    /// Any other SDK, transport, or local failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Attributes returned by a metadata probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Object size in bytes.
    pub content_length: u64,
    /// Last modification time, if the backend reports one.
    pub last_modified: Option<DateTime<Utc>>,
    /// MIME type, if the backend reports one.
    pub content_type: Option<String>,
}

/// One listing call's worth of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    /// Keys in backend order.
    pub keys: Vec<String>,
    /// Cursor for the following page; `None` once the listing is complete.
    pub next_cursor: Option<String>,
}

/// Upload options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    /// Declared body length; the source file must hold exactly this many
    /// bytes.
    pub content_length: u64,
    /// Apply the `public-read` canned ACL.
    pub public_read: bool,
}

/// Streaming object body, pulled one chunk at a time.
pub trait ObjectBody: Send {
    /// Next chunk, or `None` at end of body.
    fn next_chunk(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>, BackendError>> + Send + '_>>;
}

/// A fetched object: declared length plus its body stream.
pub struct FetchedObject {
    /// Length announced by the backend, when known.
    pub content_length: Option<u64>,
    /// The body.
    pub body: Box<dyn ObjectBody>,
}

/// Async object storage contract.
pub trait ObjectBackend: Send + Sync + 'static {
    /// Bucket this backend is bound to.
    fn bucket(&self) -> &str;

    /// Open the object at `key` for streaming.
    fn get_object(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedObject, BackendError>> + Send + '_>>;

    /// Stream the file at `source` to `key`.
    ///
    /// Every chunk consumed from the file is reported on `progress` as its
    /// byte count.
    fn put_object(
        &self,
        key: &str,
        source: &Path,
        options: PutOptions,
        progress: ProgressSender,
    ) -> Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + '_>>;

    /// Probe the object's metadata without fetching its body.
    fn head_object(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ObjectMetadata, BackendError>> + Send + '_>>;

    /// Fetch one page of keys starting with `prefix`, continuing from
    /// `cursor` when given.
    fn list_page(
        &self,
        prefix: &str,
        cursor: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<KeyPage, BackendError>> + Send + '_>>;
}
