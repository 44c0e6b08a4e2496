//! Artifact transport: the repository as a build tool sees it.
//!
//! [`ArtifactTransport`] wraps a [`StorageRepository`] and adds what a
//! build-tool transport contract expects on top of raw storage: session
//! lifecycle notifications, per-transfer notifications with byte progress,
//! conditional download, and recursive directory upload.

use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::debug;

use crate::connect::ConnectionParams;
use crate::errors::StorageResult;
use crate::events::{
    RequestKind, SessionEvent, SessionEventSink, TransferEvent, TransferEventKind,
    TransferEventSink,
};
use crate::goals::files_below;
use crate::progress::TransferProgress;
use crate::repository::{RepositorySettings, StorageRepository};

pub struct ArtifactTransport {
    repository: StorageRepository,
    sessions: Box<dyn SessionEventSink>,
    transfers: Box<dyn TransferEventSink>,
}

impl ArtifactTransport {
    /// Connect to S3, firing `Opening`, `LoggedIn` and `Opened`.
    pub fn connect(
        settings: RepositorySettings,
        params: &ConnectionParams,
        sessions: Box<dyn SessionEventSink>,
        transfers: Box<dyn TransferEventSink>,
    ) -> StorageResult<Self> {
        Self::connect_with(settings, sessions, transfers, |settings| {
            StorageRepository::connect(settings, params)
        })
    }

    /// Like [`connect`](Self::connect) with a caller-supplied connector.
    pub fn connect_with<F>(
        settings: RepositorySettings,
        mut sessions: Box<dyn SessionEventSink>,
        transfers: Box<dyn TransferEventSink>,
        connector: F,
    ) -> StorageResult<Self>
    where
        F: FnOnce(RepositorySettings) -> StorageResult<StorageRepository>,
    {
        sessions.fire_session_event(SessionEvent::Opening);
        debug!(
            "Opening connection: bucket={} base_directory={:?}",
            settings.bucket(),
            settings.base_directory()
        );

        let repository = connector(settings)?;

        sessions.fire_session_event(SessionEvent::LoggedIn);
        sessions.fire_session_event(SessionEvent::Opened);
        Ok(Self {
            repository,
            sessions,
            transfers,
        })
    }

    pub fn repository(&self) -> &StorageRepository {
        &self.repository
    }

    /// Download `resource` into `destination`.
    pub fn get(&mut self, resource: &str, destination: &Path) -> StorageResult<u64> {
        self.transfer(resource, RequestKind::Get, |repository, progress| {
            repository.get(resource, destination, progress)
        })
    }

    /// Upload `source` as `resource`.
    pub fn put(&mut self, source: &Path, resource: &str) -> StorageResult<u64> {
        debug!("Uploading {} to {}", source.display(), resource);
        self.transfer(resource, RequestKind::Put, |repository, progress| {
            repository.put(source, resource, progress)
        })
    }

    /// Download only if the stored object is strictly newer than
    /// `timestamp`.  Returns whether a download happened.
    pub fn get_if_newer(
        &mut self,
        resource: &str,
        destination: &Path,
        timestamp: DateTime<Utc>,
    ) -> StorageResult<bool> {
        if !self.repository.newer_than(resource, timestamp)? {
            return Ok(false);
        }
        self.get(resource, destination)?;
        Ok(true)
    }

    /// Upload every file below `source`, keyed by its path relative to
    /// `source` under `destination`.  A leading `.` of `destination` is
    /// dropped.  Returns the number of files uploaded.
    pub fn put_directory(&mut self, source: &Path, destination: &str) -> StorageResult<usize> {
        let destination = destination.strip_prefix('.').unwrap_or(destination);

        let files = files_below(source)?;
        for (file, relative) in &files {
            self.put(file, &format!("{destination}/{relative}"))?;
        }
        Ok(files.len())
    }

    pub fn resource_exists(&self, resource: &str) -> StorageResult<bool> {
        self.repository.exists(resource)
    }

    /// Directory-style listing of `resource`.
    pub fn file_list(&self, resource: &str) -> StorageResult<Vec<String>> {
        self.repository.file_listing(resource)
    }

    /// Fire `Disconnecting`, `LoggedOff` and `Disconnected` around closing
    /// the repository.
    pub fn disconnect(self) -> RepositorySettings {
        let Self {
            repository,
            mut sessions,
            ..
        } = self;
        sessions.fire_session_event(SessionEvent::Disconnecting);
        let settings = repository.disconnect();
        sessions.fire_session_event(SessionEvent::LoggedOff);
        sessions.fire_session_event(SessionEvent::Disconnected);
        settings
    }

    fn transfer<F>(&mut self, resource: &str, request: RequestKind, op: F) -> StorageResult<u64>
    where
        F: FnOnce(&StorageRepository, &mut dyn TransferProgress) -> StorageResult<u64>,
    {
        let transfers = &mut self.transfers;
        transfers.fire_transfer_event(TransferEvent::new(
            resource,
            request,
            TransferEventKind::Initiated,
        ));
        transfers.fire_transfer_event(TransferEvent::new(
            resource,
            request,
            TransferEventKind::Started,
        ));

        let mut progress = |bytes: usize, _remaining: u64| {
            transfers.fire_transfer_event(TransferEvent::new(
                resource,
                request,
                TransferEventKind::Progress { bytes },
            ))
        };
        let result = op(&self.repository, &mut progress);

        let outcome = match &result {
            Ok(_) => TransferEventKind::Completed,
            Err(e) => TransferEventKind::Failed {
                code: e.code(),
                message: e.to_string(),
            },
        };
        transfers.fire_transfer_event(TransferEvent::new(resource, request, outcome));
        result
    }
}
