//! Configuration loading and types.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Every section has defaults, so an empty file (or no
//! file at all) is a valid configuration.  Settings that also have an
//! environment-level fallback are kept as `Option` here so the explicit
//! value can win over the environment; see [`layered_value`] and
//! [`layered_flag`].

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::connect::credentials::StaticCredentials;
use crate::connect::endpoint::EndpointConfig;
use crate::connect::ConnectionParams;
use crate::errors::StorageResult;
use crate::repository::RepositorySettings;

/// Environment variable consulted for the public-read flag.
pub const PUBLIC_READ_VAR: &str = "PUBLIC_REPOSITORY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Repository (bucket + connection) settings.
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Backend client tuning.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Repository settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryConfig {
    /// Bucket holding the repository.
    #[serde(default)]
    pub bucket: String,
    /// Key prefix scoping the repository inside the bucket.
    #[serde(default)]
    pub base_directory: String,
    /// Region (falls back to `AWS_DEFAULT_REGION`, then the SDK chain).
    #[serde(default)]
    pub region: Option<String>,
    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force path-style URL addressing.
    #[serde(default)]
    pub path_style: Option<bool>,
    /// Upload objects with the `public-read` canned ACL.
    #[serde(default)]
    pub public_read: Option<bool>,
    /// Explicit access key (falls back to env/credential chain).
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Explicit secret key (falls back to env/credential chain).
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

/// Backend client tuning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Connect timeout in milliseconds (0 = SDK default).
    #[serde(default)]
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds (0 = SDK default).
    #[serde(default)]
    pub read_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Build the repository settings, applying the environment fallback
    /// for the public-read flag.
    pub fn repository_settings(&self, env: &dyn Environment) -> StorageResult<RepositorySettings> {
        RepositorySettings::new(
            &self.repository.bucket,
            &self.repository.base_directory,
            layered_flag(self.repository.public_read, PUBLIC_READ_VAR, env),
        )
    }

    /// Build the connection parameters, applying environment fallbacks for
    /// the endpoint and addressing style.
    pub fn connection_params(&self, env: &dyn Environment) -> ConnectionParams {
        let repo = &self.repository;
        let credentials = match (&repo.access_key_id, &repo.secret_access_key) {
            (Some(ak), Some(sk)) if !ak.is_empty() && !sk.is_empty() => {
                Some(StaticCredentials::new(ak.clone(), sk.clone()))
            }
            _ => None,
        };

        ConnectionParams {
            credentials,
            region: repo.region.clone().filter(|r| !r.trim().is_empty()),
            endpoint: EndpointConfig::resolve(repo.endpoint.clone(), repo.path_style, env),
            connect_timeout: millis(self.client.connect_timeout_ms),
            read_timeout: millis(self.client.read_timeout_ms),
        }
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

// -- Environment -------------------------------------------------------------

/// Source of environment-level settings.
pub trait Environment: Send + Sync {
    /// Look up a variable; `None` when unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Explicit value first, then the environment variable `var`.
pub fn layered_value(explicit: Option<String>, var: &str, env: &dyn Environment) -> Option<String> {
    explicit.or_else(|| env.var(var))
}

/// Explicit flag first, then the environment variable `var`, else `false`.
pub fn layered_flag(explicit: Option<bool>, var: &str, env: &dyn Environment) -> bool {
    explicit
        .or_else(|| env.var(var).map(|v| parse_flag(&v)))
        .unwrap_or(false)
}

/// Only a case-insensitive `true` is true.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

// -- Defaults ----------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}
