//! The connected repository handle.
//!
//! [`StorageRepository`] binds a bucket, a base directory and a backend
//! together and exposes blocking artifact operations in terms of logical
//! paths.  The backend is async; each repository owns a current-thread
//! runtime and drives every backend call to completion on the calling
//! thread.

use chrono::{DateTime, Utc};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connect::ConnectionParams;
use crate::errors::{StorageError, StorageResult};
use crate::iter::{ConcatenatedKeyIterator, KeyCursor, PageSource, PagedKeyIterator};
use crate::key;
use crate::listing::ListingTree;
use crate::progress::{relay_progress, ProgressWriter, TransferProgress};
use crate::storage::aws::S3Backend;
use crate::storage::backend::{BackendError, KeyPage, ObjectBackend, ObjectMetadata, PutOptions};

/// Where artifacts live: bucket, key prefix and upload ACL policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    bucket: String,
    base_directory: String,
    public_read: bool,
}

impl RepositorySettings {
    /// Validate the bucket and normalize the base directory.
    pub fn new(bucket: &str, base_directory: &str, public_read: bool) -> StorageResult<Self> {
        let bucket = bucket.trim();
        if bucket.is_empty() {
            return Err(StorageError::invalid("a bucket name is required"));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            base_directory: key::normalize_base_directory(base_directory),
            public_read,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Empty, or ending in exactly one `/`.
    pub fn base_directory(&self) -> &str {
        &self.base_directory
    }

    pub fn public_read(&self) -> bool {
        self.public_read
    }
}

/// A live connection to one bucket.
///
/// Created by [`connect`](Self::connect) and consumed by
/// [`disconnect`](Self::disconnect).
pub struct StorageRepository {
    settings: RepositorySettings,
    backend: Arc<dyn ObjectBackend>,
    runtime: Runtime,
}

fn build_runtime() -> StorageResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| StorageError::authentication("failed to start the client runtime", e))
}

impl StorageRepository {
    /// Resolve credentials, region and endpoint, and connect to S3.
    pub fn connect(settings: RepositorySettings, params: &ConnectionParams) -> StorageResult<Self> {
        let runtime = build_runtime()?;
        let backend = runtime.block_on(S3Backend::connect(settings.bucket.clone(), params))?;
        info!(
            "Repository connected: bucket={} base_directory={:?} public_read={}",
            settings.bucket, settings.base_directory, settings.public_read
        );
        Ok(Self {
            settings,
            backend: Arc::new(backend),
            runtime,
        })
    }

    /// Use an already-constructed backend.
    pub fn with_backend(
        settings: RepositorySettings,
        backend: Arc<dyn ObjectBackend>,
    ) -> StorageResult<Self> {
        if backend.bucket() != settings.bucket {
            warn!(
                "Backend bucket {} differs from configured bucket {}",
                backend.bucket(),
                settings.bucket
            );
        }
        Ok(Self {
            settings,
            backend,
            runtime: build_runtime()?,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    pub fn base_directory(&self) -> &str {
        &self.settings.base_directory
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    /// Storage key for a logical path.
    pub fn resolve_key(&self, logical_path: &str) -> StorageResult<String> {
        key::resolve(Some(&self.settings.base_directory), logical_path)
    }

    /// Inverse of [`resolve_key`](Self::resolve_key) for keys under the
    /// base directory; other keys are returned unchanged.
    pub fn logical_path_of<'k>(&self, key: &'k str) -> &'k str {
        key.strip_prefix(self.settings.base_directory.as_str())
            .unwrap_or(key)
    }

    /// Download `logical_path` to `destination`, returning the byte count.
    ///
    /// The body is streamed into a temporary file next to `destination`
    /// and renamed into place once complete.
    pub fn get(
        &self,
        logical_path: &str,
        destination: &Path,
        progress: &mut dyn TransferProgress,
    ) -> StorageResult<u64> {
        let key = self.resolve_key(logical_path)?;
        self.get_key(&key, destination, progress)
    }

    /// Like [`get`](Self::get) for a storage key taken verbatim from a
    /// listing.
    pub fn get_key(
        &self,
        key: &str,
        destination: &Path,
        progress: &mut dyn TransferProgress,
    ) -> StorageResult<u64> {
        debug!("GET: bucket={} key={}", self.bucket(), key);

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| {
            StorageError::transfer(format!("cannot create directory {}", parent.display()), e)
        })?;

        let fetched = self
            .runtime
            .block_on(self.backend.get_object(key))
            .map_err(|e| classify(key, "download failed", e))?;

        let temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
            StorageError::transfer(format!("cannot create file in {}", parent.display()), e)
        })?;
        let mut writer = ProgressWriter::new(BufWriter::new(temp), progress, fetched.content_length);

        let mut body = fetched.body;
        while let Some(chunk) = self
            .runtime
            .block_on(body.next_chunk())
            .map_err(|e| classify(key, "download failed", e))?
        {
            writer
                .write_all(&chunk)
                .map_err(|e| StorageError::transfer(format!("download failed: {key}"), e))?;
        }

        let written = writer.transferred();
        let temp = writer
            .into_inner()
            .into_inner()
            .map_err(|e| StorageError::transfer(format!("download failed: {key}"), e.into_error()))?;
        temp.persist(destination).map_err(|e| {
            StorageError::transfer(
                format!("cannot move download into {}", destination.display()),
                e.error,
            )
        })?;

        debug!("GET complete: key={} bytes={}", key, written);
        Ok(written)
    }

    /// Upload `source` to `logical_path`, returning the byte count.
    ///
    /// The file is streamed with its length declared up front; `progress`
    /// hears about each chunk as the backend consumes it.
    pub fn put(
        &self,
        source: &Path,
        logical_path: &str,
        progress: &mut dyn TransferProgress,
    ) -> StorageResult<u64> {
        let key = self.resolve_key(logical_path)?;

        let metadata = std::fs::metadata(source).map_err(|e| {
            StorageError::transfer(format!("cannot read {}", source.display()), e)
        })?;
        if !metadata.is_file() {
            return Err(StorageError::transfer(
                format!("cannot read {}", source.display()),
                anyhow::anyhow!("not a regular file"),
            ));
        }
        let length = metadata.len();

        let options = PutOptions {
            content_length: length,
            public_read: self.settings.public_read,
        };
        if options.public_read {
            info!("Applying public-read ACL: bucket={} key={}", self.bucket(), key);
        }
        debug!("PUT: bucket={} key={} bytes={}", self.bucket(), key, length);

        let (sender, receiver) = mpsc::unbounded_channel();
        let upload = self.backend.put_object(&key, source, options, sender);
        self.runtime
            .block_on(relay_progress(upload, receiver, progress, length))
            .map_err(|e| StorageError::transfer(format!("upload failed: {key}"), e))?;
        Ok(length)
    }

    /// Every key under `logical_prefix`, following pagination to the end.
    pub fn list(&self, logical_prefix: &str) -> StorageResult<Vec<String>> {
        self.keys(logical_prefix)?.collect()
    }

    /// Lazy iterator over the keys under `logical_prefix`.
    pub fn keys(&self, logical_prefix: &str) -> StorageResult<PagedKeyIterator<'_, Self>> {
        Ok(PagedKeyIterator::new(self, self.resolve_key(logical_prefix)?))
    }

    /// Lazy iterator over the keys under each prefix in turn.
    pub fn keys_under<S: AsRef<str>>(
        &self,
        logical_prefixes: &[S],
    ) -> StorageResult<ConcatenatedKeyIterator<'_>> {
        let mut cursors: Vec<Box<dyn KeyCursor + '_>> = Vec::with_capacity(logical_prefixes.len());
        for prefix in logical_prefixes {
            cursors.push(Box::new(self.keys(prefix.as_ref())?));
        }
        Ok(ConcatenatedKeyIterator::new(cursors))
    }

    /// Directory-style listing of `logical_path`: relative file paths,
    /// then synthesized folders.
    pub fn file_listing(&self, logical_path: &str) -> StorageResult<Vec<String>> {
        let prefix = self.resolve_key(logical_path)?;
        let mut tree = ListingTree::new(prefix.as_str());
        let mut keys = PagedKeyIterator::new(self, prefix.as_str());
        while keys.has_next()? {
            tree.insert(&keys.next_key()?);
        }
        if tree.is_empty() {
            return Err(StorageError::not_found(prefix));
        }
        Ok(tree.into_entries())
    }

    /// Whether an object exists at `logical_path`.
    pub fn exists(&self, logical_path: &str) -> StorageResult<bool> {
        let key = self.resolve_key(logical_path)?;
        debug!("HEAD: bucket={} key={}", self.bucket(), key);
        match self.runtime.block_on(self.backend.head_object(&key)) {
            Ok(_) => Ok(true),
            Err(BackendError::NotFound { .. }) => Ok(false),
            Err(BackendError::Other(e)) => Err(StorageError::transfer(
                format!("existence check failed: {key}"),
                e,
            )),
        }
    }

    /// Metadata of the object at `logical_path`.
    pub fn metadata(&self, logical_path: &str) -> StorageResult<ObjectMetadata> {
        self.metadata_key(&self.resolve_key(logical_path)?)
    }

    /// Metadata of the object stored at exactly `key`.
    pub fn metadata_key(&self, key: &str) -> StorageResult<ObjectMetadata> {
        debug!("HEAD: bucket={} key={}", self.bucket(), key);
        self.runtime
            .block_on(self.backend.head_object(key))
            .map_err(|e| classify(key, "metadata probe failed", e))
    }

    /// Whether the object was modified strictly after `timestamp`.
    pub fn newer_than(&self, logical_path: &str, timestamp: DateTime<Utc>) -> StorageResult<bool> {
        let metadata = self.metadata(logical_path)?;
        match metadata.last_modified {
            Some(modified) => Ok(modified > timestamp),
            None => Err(StorageError::not_found(self.resolve_key(logical_path)?)),
        }
    }

    /// Close the connection and hand the settings back.
    pub fn disconnect(self) -> RepositorySettings {
        info!("Repository disconnected: bucket={}", self.settings.bucket);
        self.settings
    }
}

impl PageSource for StorageRepository {
    fn fetch_page(&self, prefix: &str, cursor: Option<&str>) -> StorageResult<KeyPage> {
        debug!(
            "LIST: bucket={} prefix={} cursor={:?}",
            self.bucket(),
            prefix,
            cursor
        );
        self.runtime
            .block_on(self.backend.list_page(prefix, cursor))
            .map_err(|e| StorageError::transfer(format!("listing failed: {prefix}"), e))
    }
}

/// Absent key -> ResourceNotFound; everything else -> TransferFailure.
fn classify(key: &str, context: &str, err: BackendError) -> StorageError {
    match err {
        BackendError::NotFound { .. } => StorageError::not_found(key),
        BackendError::Other(source) => StorageError::transfer(format!("{context}: {key}"), source),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoProgress, ProgressSender};
    use crate::storage::backend::{FetchedObject, ObjectBody};
    use crate::storage::memory::{MemoryBackend, MemoryObject};
    use bytes::Bytes;
    use chrono::TimeZone;
    use std::future::Future;
    use std::pin::Pin;

    fn settings(base: &str, public_read: bool) -> RepositorySettings {
        RepositorySettings::new("artifacts", base, public_read).unwrap()
    }

    fn repo_with(base: &str, public_read: bool, backend: Arc<MemoryBackend>) -> StorageRepository {
        StorageRepository::with_backend(settings(base, public_read), backend).unwrap()
    }

    /// Every call fails with a non-not-found error.
    struct FailingBackend;

    fn denied<T>() -> Result<T, BackendError> {
        Err(BackendError::Other(anyhow::anyhow!("access denied")))
    }

    impl ObjectBackend for FailingBackend {
        fn bucket(&self) -> &str {
            "artifacts"
        }

        fn get_object(
            &self,
            _key: &str,
        ) -> Pin<Box<dyn Future<Output = Result<FetchedObject, BackendError>> + Send + '_>>
        {
            Box::pin(async { denied::<FetchedObject>() })
        }

        fn put_object(
            &self,
            _key: &str,
            _source: &Path,
            _options: PutOptions,
            _progress: ProgressSender,
        ) -> Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + '_>> {
            Box::pin(async { denied::<()>() })
        }

        fn head_object(
            &self,
            _key: &str,
        ) -> Pin<Box<dyn Future<Output = Result<ObjectMetadata, BackendError>> + Send + '_>>
        {
            Box::pin(async { denied::<ObjectMetadata>() })
        }

        fn list_page(
            &self,
            _prefix: &str,
            _cursor: Option<&str>,
        ) -> Pin<Box<dyn Future<Output = Result<KeyPage, BackendError>> + Send + '_>> {
            Box::pin(async { denied::<KeyPage>() })
        }
    }

    /// Serves one chunk of every object, then breaks the connection.
    struct TruncatingBackend;

    struct TruncatedBody {
        first: Option<Bytes>,
    }

    impl ObjectBody for TruncatedBody {
        fn next_chunk(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>, BackendError>> + Send + '_>>
        {
            Box::pin(async move {
                match self.first.take() {
                    Some(chunk) => Ok(Some(chunk)),
                    None => Err(BackendError::Other(anyhow::anyhow!("connection reset"))),
                }
            })
        }
    }

    impl ObjectBackend for TruncatingBackend {
        fn bucket(&self) -> &str {
            "artifacts"
        }

        fn get_object(
            &self,
            _key: &str,
        ) -> Pin<Box<dyn Future<Output = Result<FetchedObject, BackendError>> + Send + '_>>
        {
            Box::pin(async {
                Ok(FetchedObject {
                    content_length: Some(1024),
                    body: Box::new(TruncatedBody {
                        first: Some(Bytes::from(vec![1u8; 512])),
                    }),
                })
            })
        }

        fn put_object(
            &self,
            _key: &str,
            _source: &Path,
            _options: PutOptions,
            _progress: ProgressSender,
        ) -> Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + '_>> {
            Box::pin(async { denied::<()>() })
        }

        fn head_object(
            &self,
            _key: &str,
        ) -> Pin<Box<dyn Future<Output = Result<ObjectMetadata, BackendError>> + Send + '_>>
        {
            Box::pin(async { denied::<ObjectMetadata>() })
        }

        fn list_page(
            &self,
            _prefix: &str,
            _cursor: Option<&str>,
        ) -> Pin<Box<dyn Future<Output = Result<KeyPage, BackendError>> + Send + '_>> {
            Box::pin(async { denied::<KeyPage>() })
        }
    }

    #[test]
    fn test_settings_require_bucket() {
        let err = RepositorySettings::new("  ", "", false).unwrap_err();
        assert_eq!(err.code(), "InvalidConfiguration");
    }

    #[test]
    fn test_settings_normalize_base_directory() {
        assert_eq!(settings("/releases//", false).base_directory(), "releases/");
        assert_eq!(settings("", false).base_directory(), "");
    }

    #[test]
    fn test_put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("artifact.jar");
        let content: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&source, &content).unwrap();

        let backend = Arc::new(MemoryBackend::new("artifacts"));
        let repo = repo_with("releases", false, backend.clone());

        let mut sent = 0usize;
        let mut on_put = |n: usize, _remaining: u64| sent += n;
        let put = repo.put(&source, "com/example/artifact.jar", &mut on_put).unwrap();
        assert_eq!(put, content.len() as u64);
        assert_eq!(sent, content.len());

        let stored = backend.object("releases/com/example/artifact.jar").unwrap();
        assert_eq!(stored.data.len(), content.len());

        let destination = dir.path().join("out/nested/artifact.jar");
        let mut last_remaining = u64::MAX;
        let mut on_get = |_n: usize, remaining: u64| last_remaining = remaining;
        let got = repo
            .get("com/example/artifact.jar", &destination, &mut on_get)
            .unwrap();
        assert_eq!(got, content.len() as u64);
        assert_eq!(last_remaining, 0);
        assert_eq!(std::fs::read(&destination).unwrap(), content);
    }

    #[test]
    fn test_put_applies_acl_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"hello").unwrap();

        let private = Arc::new(MemoryBackend::new("artifacts"));
        repo_with("", false, private.clone())
            .put(&source, "a.txt", &mut NoProgress)
            .unwrap();
        assert!(!private.object("a.txt").unwrap().public_read);

        let public = Arc::new(MemoryBackend::new("artifacts"));
        repo_with("", true, public.clone())
            .put(&source, "a.txt", &mut NoProgress)
            .unwrap();
        assert!(public.object("a.txt").unwrap().public_read);
    }

    #[test]
    fn test_put_missing_source_is_transfer_failure() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with("", false, Arc::new(MemoryBackend::new("artifacts")));
        let err = repo
            .put(&dir.path().join("absent"), "x", &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.code(), "TransferFailure");
    }

    #[test]
    fn test_get_missing_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with("", false, Arc::new(MemoryBackend::new("artifacts")));
        let destination = dir.path().join("missing.jar");

        let err = repo
            .get("missing.jar", &destination, &mut NoProgress)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_get_backend_failure_is_transfer_failure() {
        let dir = tempfile::tempdir().unwrap();
        let repo =
            StorageRepository::with_backend(settings("", false), Arc::new(FailingBackend)).unwrap();
        let err = repo
            .get("x", &dir.path().join("x"), &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.code(), "TransferFailure");
    }

    #[test]
    fn test_get_interrupted_body_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo =
            StorageRepository::with_backend(settings("", false), Arc::new(TruncatingBackend))
                .unwrap();
        let destination = dir.path().join("partial.jar");

        let mut received = 0usize;
        let mut on_get = |n: usize, _remaining: u64| received += n;
        let err = repo
            .get("partial.jar", &destination, &mut on_get)
            .unwrap_err();

        assert_eq!(err.code(), "TransferFailure");
        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(received <= 512);
    }

    #[test]
    fn test_put_reports_progress_while_streaming() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("big.bin");
        std::fs::write(&source, vec![3u8; 40_000]).unwrap();

        let repo = repo_with("", false, Arc::new(MemoryBackend::new("artifacts")));
        let mut events = Vec::new();
        let mut on_put = |n: usize, remaining: u64| events.push((n, remaining));
        assert_eq!(repo.put(&source, "big.bin", &mut on_put).unwrap(), 40_000);

        assert!(events.len() > 1);
        assert_eq!(events.iter().map(|(n, _)| n).sum::<usize>(), 40_000);
        assert!(events.windows(2).all(|w| w[0].1 > w[1].1));
        assert_eq!(events.last().map(|(_, remaining)| *remaining), Some(0));
    }

    #[test]
    fn test_put_directory_source_is_transfer_failure() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        let repo = repo_with("", false, backend.clone());
        let err = repo.put(dir.path(), "x", &mut NoProgress).unwrap_err();
        assert_eq!(err.code(), "TransferFailure");
        assert!(backend.is_empty());
    }

    #[test]
    fn test_raw_key_access_keeps_leading_slash() {
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        backend.insert("/lead.txt", MemoryObject::new("lead")).unwrap();
        let repo = repo_with("", false, backend);
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("lead.txt");

        assert!(repo.metadata("/lead.txt").unwrap_err().is_not_found());
        assert_eq!(repo.metadata_key("/lead.txt").unwrap().content_length, 4);
        assert_eq!(
            repo.get_key("/lead.txt", &destination, &mut NoProgress)
                .unwrap(),
            4
        );
        assert_eq!(std::fs::read(&destination).unwrap(), b"lead");
    }

    #[test]
    fn test_exists() {
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        backend
            .insert("repo/present.txt", MemoryObject::new("x"))
            .unwrap();
        let repo = repo_with("repo", false, backend);

        assert!(repo.exists("present.txt").unwrap());
        assert!(!repo.exists("absent.txt").unwrap());
    }

    #[test]
    fn test_exists_propagates_other_errors() {
        let repo =
            StorageRepository::with_backend(settings("", false), Arc::new(FailingBackend)).unwrap();
        let err = repo.exists("anything").unwrap_err();
        assert_eq!(err.code(), "TransferFailure");
    }

    #[test]
    fn test_newer_than_is_strict() {
        let modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        backend
            .insert(
                "a.pom",
                MemoryObject::new("x").with_last_modified(modified),
            )
            .unwrap();
        let repo = repo_with("", false, backend);

        assert!(repo
            .newer_than("a.pom", modified - chrono::Duration::seconds(1))
            .unwrap());
        assert!(!repo.newer_than("a.pom", modified).unwrap());
        assert!(!repo
            .newer_than("a.pom", modified + chrono::Duration::seconds(1))
            .unwrap());
    }

    #[test]
    fn test_newer_than_missing_object() {
        let repo = repo_with("", false, Arc::new(MemoryBackend::new("artifacts")));
        let err = repo.newer_than("gone.pom", Utc::now()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_metadata() {
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        backend
            .insert(
                "lib/a.jar",
                MemoryObject::new(vec![0u8; 42]).with_content_type("application/java-archive"),
            )
            .unwrap();
        let repo = repo_with("lib", false, backend);

        let metadata = repo.metadata("a.jar").unwrap();
        assert_eq!(metadata.content_length, 42);
        assert_eq!(
            metadata.content_type.as_deref(),
            Some("application/java-archive")
        );
        assert!(repo.metadata("b.jar").unwrap_err().is_not_found());
    }

    #[test]
    fn test_file_listing() {
        let backend = Arc::new(MemoryBackend::with_page_size("artifacts", 2));
        for key in ["root/a/b/c.txt", "root/a/d.txt", "root/e.txt", "other/f.txt"] {
            backend.insert(key, MemoryObject::new("x")).unwrap();
        }
        let repo = repo_with("", false, backend);

        assert_eq!(
            repo.file_listing("root/").unwrap(),
            vec!["a/b/c.txt", "a/d.txt", "e.txt", "a/", "a/b/"]
        );
    }

    #[test]
    fn test_file_listing_empty_is_not_found() {
        let repo = repo_with("", false, Arc::new(MemoryBackend::new("artifacts")));
        assert!(repo.file_listing("nothing/").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_follows_pagination() {
        let backend = Arc::new(MemoryBackend::with_page_size("artifacts", 2));
        for i in 0..5 {
            backend
                .insert(format!("base/p/{i}"), MemoryObject::new("x"))
                .unwrap();
        }
        backend.insert("base/q/0", MemoryObject::new("x")).unwrap();
        let repo = repo_with("base", false, backend.clone());

        let keys = repo.list("p/").unwrap();
        assert_eq!(
            keys,
            vec!["base/p/0", "base/p/1", "base/p/2", "base/p/3", "base/p/4"]
        );
        assert_eq!(backend.list_calls(), 3);
    }

    #[test]
    fn test_keys_fetch_lazily() {
        let backend = Arc::new(MemoryBackend::with_page_size("artifacts", 2));
        for i in 0..6 {
            backend
                .insert(format!("p/{i}"), MemoryObject::new("x"))
                .unwrap();
        }
        let repo = repo_with("", false, backend.clone());

        let mut keys = repo.keys("p/").unwrap();
        assert_eq!(backend.list_calls(), 0);
        assert_eq!(keys.next_key().unwrap(), "p/0");
        assert_eq!(keys.next_key().unwrap(), "p/1");
        assert_eq!(backend.list_calls(), 1);
        assert_eq!(keys.next_key().unwrap(), "p/2");
        assert_eq!(backend.list_calls(), 2);
    }

    #[test]
    fn test_keys_under_concatenates_prefixes() {
        let backend = Arc::new(MemoryBackend::with_page_size("artifacts", 1));
        for key in ["a/1", "a/2", "b/1", "b/2", "b/3"] {
            backend.insert(key, MemoryObject::new("x")).unwrap();
        }
        let repo = repo_with("", false, backend);

        let keys: Vec<String> = repo
            .keys_under(&["none/", "a/", "b/"])
            .unwrap()
            .collect::<StorageResult<_>>()
            .unwrap();
        assert_eq!(keys, vec!["a/1", "a/2", "b/1", "b/2", "b/3"]);
    }

    #[test]
    fn test_listing_error_is_transfer_failure() {
        let repo =
            StorageRepository::with_backend(settings("", false), Arc::new(FailingBackend)).unwrap();
        assert_eq!(repo.list("p/").unwrap_err().code(), "TransferFailure");
    }

    #[test]
    fn test_logical_path_of() {
        let repo = repo_with("releases", false, Arc::new(MemoryBackend::new("artifacts")));
        assert_eq!(repo.logical_path_of("releases/a/b.jar"), "a/b.jar");
        assert_eq!(repo.logical_path_of("elsewhere/c.jar"), "elsewhere/c.jar");
    }

    #[test]
    fn test_disconnect_returns_settings() {
        let repo = repo_with("releases", true, Arc::new(MemoryBackend::new("artifacts")));
        let settings = repo.disconnect();
        assert_eq!(settings.bucket(), "artifacts");
        assert_eq!(settings.base_directory(), "releases/");
        assert!(settings.public_read());
    }
}
