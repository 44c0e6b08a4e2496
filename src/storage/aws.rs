//! AWS S3 (and S3-compatible) backend.
//!
//! Forwards backend operations to a single bucket through `aws-sdk-s3`.
//! Keys are passed through untouched; the repository layer has already
//! applied its base directory.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use aws_smithy_types::body::SdkBody;
use aws_smithy_types::byte_stream::Length;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body::{Body, Frame, SizeHint};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, info};

use super::backend::{
    BackendError, FetchedObject, KeyPage, ObjectBackend, ObjectBody, ObjectMetadata, PutOptions,
};
use crate::connect::{build_client, ConnectionParams};
use crate::errors::{StorageError, StorageResult};
use crate::progress::ProgressSender;

/// Backend that talks to one S3 bucket.
pub struct S3Backend {
    /// AWS S3 SDK client.
    client: Client,
    /// The bucket every operation targets.
    bucket: String,
}

impl S3Backend {
    /// Resolve the connection parameters and build the client.
    pub async fn connect(bucket: String, params: &ConnectionParams) -> StorageResult<Self> {
        if bucket.trim().is_empty() {
            return Err(StorageError::invalid("a bucket name is required"));
        }

        let client = build_client(params).await?;

        info!("S3 backend initialized: bucket={}", bucket);

        Ok(Self::from_client(client, bucket))
    }

    /// Wrap an already-configured client.
    pub fn from_client(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Map an AWS SDK error to a backend error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> BackendError {
        BackendError::Other(anyhow::anyhow!("AWS S3 {context}: {err}"))
    }
}

/// Convert the SDK timestamp type.
fn to_utc(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

/// Get-object body backed by the SDK byte stream.
struct S3Body(ByteStream);

impl ObjectBody for S3Body {
    fn next_chunk(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>, BackendError>> + Send + '_>> {
        Box::pin(async move {
            self.0
                .try_next()
                .await
                .map_err(|e| S3Backend::map_sdk_error("get_object body", e))
        })
    }
}

/// Put-object body that reports every data frame the SDK pulls from it.
struct CountingBody {
    inner: SdkBody,
    progress: ProgressSender,
}

impl Body for CountingBody {
    type Data = Bytes;
    type Error = aws_smithy_types::body::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if let Poll::Ready(Some(Ok(frame))) = &polled {
            if let Some(data) = frame.data_ref() {
                let _ = this.progress.send(data.len());
            }
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        Body::is_end_stream(&self.inner)
    }

    fn size_hint(&self) -> SizeHint {
        Body::size_hint(&self.inner)
    }
}

/// Stream `path` as exactly `length` bytes, counting consumption on
/// `progress`.  Each retry re-reads the file from the start.
async fn counted_file_body(
    path: &Path,
    length: u64,
    progress: ProgressSender,
) -> Result<ByteStream, BackendError> {
    let file = ByteStream::read_from()
        .path(path)
        .length(Length::Exact(length))
        .build()
        .await
        .map_err(|e| S3Backend::map_sdk_error(&format!("open {}", path.display()), e))?
        .into_inner();

    let body = SdkBody::retryable(move || {
        let attempt = file.try_clone().unwrap_or_else(SdkBody::taken);
        SdkBody::from_body_1_x(CountingBody {
            inner: attempt,
            progress: progress.clone(),
        })
    });
    Ok(ByteStream::new(body))
}

impl ObjectBackend for S3Backend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn get_object(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedObject, BackendError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("AWS get_object: bucket={} key={}", self.bucket, key);

            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        BackendError::NotFound { key: key.clone() }
                    } else {
                        Self::map_sdk_error("get_object", service_err)
                    }
                })?;

            let content_length = resp.content_length().and_then(|l| u64::try_from(l).ok());

            Ok(FetchedObject {
                content_length,
                body: Box::new(S3Body(resp.body)),
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
            let content_length = i64::try_from(options.content_length)
                .map_err(|e| Self::map_sdk_error("put_object content length", e))?;

            debug!(
                "AWS put_object: bucket={} key={} length={} public_read={}",
                self.bucket, key, content_length, options.public_read
            );

            let body = counted_file_body(&source, options.content_length, progress).await?;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_length(content_length)
                .set_acl(options.public_read.then_some(ObjectCannedAcl::PublicRead))
                .body(body)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", e.into_service_error()))?;

            Ok(())
        })
    }

    fn head_object(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ObjectMetadata, BackendError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("AWS head_object: bucket={} key={}", self.bucket, key);

            let resp = self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| {
                    let service_err = e.into_service_error();
                    if service_err.is_not_found() {
                        BackendError::NotFound { key: key.clone() }
                    } else {
                        Self::map_sdk_error("head_object", service_err)
                    }
                })?;

            Ok(ObjectMetadata {
                content_length: resp
                    .content_length()
                    .and_then(|l| u64::try_from(l).ok())
                    .unwrap_or(0),
                last_modified: resp.last_modified().and_then(to_utc),
                content_type: resp.content_type().map(str::to_string),
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
            debug!(
                "AWS list_objects_v2: bucket={} prefix={} continuation={:?}",
                self.bucket, prefix, cursor
            );

            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix);

            if let Some(ref token) = cursor {
                req = req.continuation_token(token);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("list_objects_v2", e.into_service_error()))?;

            let keys = resp
                .contents()
                .iter()
                .filter_map(|obj| obj.key().map(str::to_string))
                .collect();

            let next_cursor = if resp.is_truncated() == Some(true) {
                resp.next_continuation_token().map(str::to_string)
            } else {
                None
            };

            Ok(KeyPage { keys, next_cursor })
        })
    }
}

// -- Tests -------------------------------------------------------------------
