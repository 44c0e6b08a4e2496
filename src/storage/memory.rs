//! In-memory object backend.
//!
//! Objects live in an ordered map so listings come back in lexicographic
//! key order, like a real bucket.  The page size is configurable and every
//! listing call is counted, which makes the backend useful for exercising
//! pagination and laziness without a network.

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::future::Future;
use std::ops::Bound;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::io::AsyncReadExt;

use super::backend::{
    BackendError, FetchedObject, KeyPage, ObjectBackend, ObjectBody, ObjectMetadata, PutOptions,
};
use crate::progress::ProgressSender;

/// Default number of keys per listing page (the S3 maximum).
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Size of the chunks bodies are split into, in both directions.
const CHUNK_SIZE: usize = 8 * 1024;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    /// Object bytes.
    pub data: Bytes,
    /// Modification time reported by metadata probes.
    pub last_modified: DateTime<Utc>,
    /// MIME type reported by metadata probes.
    pub content_type: String,
    /// Whether the object was uploaded with the public-read ACL.
    pub public_read: bool,
}

impl MemoryObject {
    /// A private object stamped with the current time.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            last_modified: Utc::now(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            public_read: false,
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// In-memory backend bound to a named bucket.
pub struct MemoryBackend {
    bucket: String,
    /// storage key -> object.
    objects: RwLock<BTreeMap<String, MemoryObject>>,
    /// Maximum keys returned per listing call.
    page_size: usize,
    /// Number of `list_page` calls served.
    list_calls: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend with the default page size.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self::with_page_size(bucket, DEFAULT_PAGE_SIZE)
    }

    /// Create an empty backend returning at most `page_size` keys per page.
    pub fn with_page_size(bucket: impl Into<String>, page_size: usize) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Store `object` at `key`, replacing any previous object.
    pub fn insert(&self, key: impl Into<String>, object: MemoryObject) -> anyhow::Result<()> {
        self.write()?.insert(key.into(), object);
        Ok(())
    }

    /// Snapshot of the object at `key`.
    pub fn object(&self, key: &str) -> Option<MemoryObject> {
        self.read().ok()?.get(key).cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of listing pages served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, BTreeMap<String, MemoryObject>>> {
        self.objects
            .read()
            .map_err(|_| anyhow::anyhow!("memory backend lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, BTreeMap<String, MemoryObject>>> {
        self.objects
            .write()
            .map_err(|_| anyhow::anyhow!("memory backend lock poisoned"))
    }

    fn lookup(&self, key: &str) -> Result<MemoryObject, BackendError> {
        self.read()?
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                key: key.to_string(),
            })
    }

    fn page(&self, prefix: &str, cursor: Option<&str>) -> Result<KeyPage, BackendError> {
        let objects = self.read()?;
        let start = match cursor {
            Some(after) => Bound::Excluded(after),
            None => Bound::Included(prefix),
        };

        let mut keys: Vec<String> = objects
            .range::<str, _>((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .take(self.page_size + 1)
            .cloned()
            .collect();

        let next_cursor = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };

        Ok(KeyPage { keys, next_cursor })
    }
}

/// Body that hands out a stored object in fixed-size chunks.
struct MemoryBody {
    remaining: Bytes,
}

impl ObjectBody for MemoryBody {
    fn next_chunk(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>, BackendError>> + Send + '_>> {
        Box::pin(async move {
            if self.remaining.is_empty() {
                return Ok(None);
            }
            let n = self.remaining.len().min(CHUNK_SIZE);
            Ok(Some(self.remaining.split_to(n)))
        })
    }
}

impl ObjectBackend for MemoryBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn get_object(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedObject, BackendError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let object = self.lookup(&key)?;
            Ok(FetchedObject {
                content_length: Some(object.data.len() as u64),
                body: Box::new(MemoryBody {
                    remaining: object.data,
                }),
            })
        })
    }

    fn put_object(
        &self,
        key: &str,
        source: &Path,
        options: PutOptions,
        progress: ProgressSender,
    ) -> Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + '_>> {
        let key = key.to_string();
        let source = source.to_path_buf();
        Box::pin(async move {
            let mut file = tokio::fs::File::open(&source)
                .await
                .with_context(|| format!("cannot open {}", source.display()))?;

            let mut data = BytesMut::new();
            let mut chunk = vec![0u8; CHUNK_SIZE];
            loop {
                let n = file
                    .read(&mut chunk)
                    .await
                    .with_context(|| format!("cannot read {}", source.display()))?;
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&chunk[..n]);
                // The receiver only goes away when the caller stopped listening.
                let _ = progress.send(n);
            }

            if data.len() as u64 != options.content_length {
                return Err(BackendError::Other(anyhow::anyhow!(
                    "declared content length {} does not match body length {}",
                    options.content_length,
                    data.len()
                )));
            }
            let object = MemoryObject {
                public_read: options.public_read,
                ..MemoryObject::new(data.freeze())
            };
            self.write()?.insert(key, object);
            Ok(())
        })
    }

    fn head_object(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ObjectMetadata, BackendError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let object = self.lookup(&key)?;
            Ok(ObjectMetadata {
                content_length: object.data.len() as u64,
                last_modified: Some(object.last_modified),
                content_type: Some(object.content_type),
            })
        })
    }

    fn list_page(
        &self,
        prefix: &str,
        cursor: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<KeyPage, BackendError>> + Send + '_>> {
        let prefix = prefix.to_string();
        let cursor = cursor.map(str::to_string);
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.page(&prefix, cursor.as_deref())
        })
    }
}

// -- Tests -------------------------------------------------------------------
