//! Connection parameter resolution and backend client construction.
//!
//! Each parameter has its own fallback rules:
//!
//!   Credentials: explicit pair, else the SDK ambient chain.
//!   Region:      explicit, `AWS_DEFAULT_REGION`, SDK chain, `us-east-1`.
//!   Endpoint:    explicit, `S3_ENDPOINT`, else the regional endpoint.
//!   Path style:  explicit, `S3_PATH_STYLE_ENABLED`, else virtual-host.

pub mod credentials;
pub mod endpoint;
pub mod region;

use aws_sdk_s3::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::StorageResult;
use credentials::{CredentialSource, StaticCredentials};
use endpoint::EndpointConfig;
use region::RegionChain;

/// Everything needed to build a backend client.  Immutable once a
/// repository is connected.
#[derive(Debug, Clone, Default)]
pub struct ConnectionParams {
    /// Explicit credential pair; `None` defers to the environment.
    pub credentials: Option<StaticCredentials>,
    /// Explicit region; `None` walks the region chain.
    pub region: Option<String>,
    /// Endpoint override and addressing style.
    pub endpoint: EndpointConfig,
    /// Connection establishment timeout.
    pub connect_timeout: Option<Duration>,
    /// Socket read timeout.
    pub read_timeout: Option<Duration>,
}

/// Build an S3 client from the resolved parameters.
pub async fn build_client(params: &ConnectionParams) -> StorageResult<Client> {
    params.endpoint.validate()?;

    let region = RegionChain::standard(params.region.clone()).resolve().await;
    let credentials = CredentialSource::resolve(params.credentials.clone())
        .into_provider()
        .await;

    let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.clone()))
        .credentials_provider(credentials);

    if let Some(endpoint) = params.endpoint.url() {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    if params.connect_timeout.is_some() || params.read_timeout.is_some() {
        let mut timeouts = aws_config::timeout::TimeoutConfig::builder();
        if let Some(t) = params.connect_timeout {
            timeouts = timeouts.connect_timeout(t);
        }
        if let Some(t) = params.read_timeout {
            timeouts = timeouts.read_timeout(t);
        }
        config_loader = config_loader.timeout_config(timeouts.build());
    }

    let sdk_config = config_loader.load().await;

    let s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(params.endpoint.path_style());

    match params.endpoint.url() {
        Some(endpoint) => info!(
            "Connecting to endpoint [{}] using region [{}] (path style: {})",
            endpoint,
            region,
            params.endpoint.path_style()
        ),
        None => info!("Connecting using region [{}]", region),
    }
    debug!(
        "Client timeouts: connect={:?} read={:?}",
        params.connect_timeout, params.read_timeout
    );

    Ok(Client::from_conf(s3_config_builder.build()))
}
