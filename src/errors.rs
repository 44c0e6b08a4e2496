//! Error taxonomy for repository operations.
//!
//! Every core operation either completes or returns one of the
//! [`StorageError`] kinds below.  Callers (the CLI, a build-tool plugin)
//! translate them into their own presentation using [`StorageError::code`].

use thiserror::Error;

/// Result alias used throughout the crate.
pub type StorageResult<T> = Result<T, StorageError>;

/// Repository error kinds.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Building the backend client failed (bad credentials, unusable
    /// region or endpoint).  Raised once, at connect time.
    #[error("authentication failed: {message}")]
    AuthenticationFailure {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// The backend reports that the key does not exist.
    #[error("resource does not exist: {key}")]
    ResourceNotFound { key: String },

    /// Any other I/O or backend failure while moving bytes.
    #[error("{message}")]
    TransferFailure {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// A precondition the caller is responsible for was violated.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// `next_key` was called on an exhausted key iterator.
    #[error("no more keys")]
    NoSuchElement,
}

impl StorageError {
    /// Return a stable identifier for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::AuthenticationFailure { .. } => "AuthenticationFailure",
            StorageError::ResourceNotFound { .. } => "ResourceNotFound",
            StorageError::TransferFailure { .. } => "TransferFailure",
            StorageError::InvalidConfiguration { .. } => "InvalidConfiguration",
            StorageError::NoSuchElement => "NoSuchElement",
        }
    }

    /// Whether this is a missing-resource condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::ResourceNotFound { .. })
    }

    pub(crate) fn not_found(key: impl Into<String>) -> Self {
        StorageError::ResourceNotFound { key: key.into() }
    }

    pub(crate) fn transfer(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        StorageError::TransferFailure {
            message: message.into(),
            source: source.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StorageError::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub(crate) fn authentication(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        StorageError::AuthenticationFailure {
            message: message.into(),
            source: source.into(),
        }
    }
}
