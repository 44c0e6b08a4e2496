//! Custom endpoint and addressing style for S3-compatible backends.

use crate::config::{layered_flag, layered_value, Environment};
use crate::errors::{StorageError, StorageResult};

/// Environment variable consulted when no endpoint is configured.
pub const ENDPOINT_VAR: &str = "S3_ENDPOINT";

/// Environment variable consulted when no addressing style is configured.
pub const PATH_STYLE_VAR: &str = "S3_PATH_STYLE_ENABLED";

/// Optional endpoint override plus the path-style toggle.
///
/// When an endpoint is present it replaces the standard regional endpoint.
/// Path-style addressing (`https://host/bucket/key`) is what most non-AWS
/// backends expect; the default is virtual-host style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointConfig {
    url: Option<String>,
    path_style: bool,
}

impl EndpointConfig {
    pub fn new(url: Option<String>, path_style: bool) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            path_style,
        }
    }

    /// Explicit values win over [`ENDPOINT_VAR`] / [`PATH_STYLE_VAR`].
    pub fn resolve(
        explicit_url: Option<String>,
        explicit_path_style: Option<bool>,
        env: &dyn Environment,
    ) -> Self {
        Self::new(
            layered_value(explicit_url, ENDPOINT_VAR, env),
            layered_flag(explicit_path_style, PATH_STYLE_VAR, env),
        )
    }

    pub fn is_present(&self) -> bool {
        self.url.is_some()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn path_style(&self) -> bool {
        self.path_style
    }

    /// A present endpoint must be an absolute URI.
    pub fn validate(&self) -> StorageResult<()> {
        let Some(url) = self.url() else {
            return Ok(());
        };
        let uri: http::Uri = url.parse().map_err(|e| {
            StorageError::authentication(format!("Failed to connect to endpoint [{url}]"), e)
        })?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(StorageError::authentication(
                format!("Failed to connect to endpoint [{url}]"),
                anyhow::anyhow!("endpoint must include a scheme and host"),
            ));
        }
        Ok(())
    }
}
