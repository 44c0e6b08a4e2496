//! Region resolution as an ordered chain of providers.
//!
//! The chain is data: a list of [`RegionProvider`]s tried in order.  A
//! provider that fails or produces an empty string is skipped, the first
//! non-empty answer wins, and [`DEFAULT_REGION`] is used when nothing
//! answers so that zero-configuration setups still connect.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{Environment, ProcessEnv};

/// Region used when no provider in the chain resolves one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Operator-level default region variable.
pub const DEFAULT_REGION_VAR: &str = "AWS_DEFAULT_REGION";

/// One link in the region chain.
pub trait RegionProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Attempt to produce a region.  `Ok(None)` and errors both mean
    /// "not resolved here".
    fn region(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>>;
}

/// The region given by the caller or the build configuration.
pub struct ExplicitRegion(pub Option<String>);

impl RegionProvider for ExplicitRegion {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn region(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>> {
        let region = self.0.clone();
        Box::pin(async move { Ok(region) })
    }
}

/// A region taken from an environment variable.
pub struct EnvironmentRegion {
    var: &'static str,
    env: Arc<dyn Environment>,
}

impl EnvironmentRegion {
    pub fn new(var: &'static str, env: Arc<dyn Environment>) -> Self {
        Self { var, env }
    }
}

impl RegionProvider for EnvironmentRegion {
    fn name(&self) -> &'static str {
        self.var
    }

    fn region(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>> {
        Box::pin(async move { Ok(self.env.var(self.var)) })
    }
}

/// The SDK's own default chain (`AWS_REGION`, profile files, IMDS).
pub struct SdkDefaultRegion;

impl RegionProvider for SdkDefaultRegion {
    fn name(&self) -> &'static str {
        "sdk-default-chain"
    }

    fn region(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            let region = aws_config::default_provider::region::DefaultRegionChain::builder()
                .build()
                .region()
                .await;
            Ok(region.map(|r| r.as_ref().to_string()))
        })
    }
}

/// Ordered list of region providers.
pub struct RegionChain {
    providers: Vec<Box<dyn RegionProvider>>,
}

impl RegionChain {
    pub fn new(providers: Vec<Box<dyn RegionProvider>>) -> Self {
        Self { providers }
    }

    /// Explicit region, then [`DEFAULT_REGION_VAR`], then the SDK chain.
    pub fn standard(explicit: Option<String>) -> Self {
        Self::new(vec![
            Box::new(ExplicitRegion(explicit)),
            Box::new(EnvironmentRegion::new(
                DEFAULT_REGION_VAR,
                Arc::new(ProcessEnv),
            )),
            Box::new(SdkDefaultRegion),
        ])
    }

    /// First non-empty region from the chain, if any.
    pub async fn first_available(&self) -> Option<String> {
        for provider in &self.providers {
            match provider.region().await {
                Ok(Some(region)) if !region.trim().is_empty() => {
                    debug!("Region {} resolved by provider {}", region, provider.name());
                    return Some(region.trim().to_string());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Region provider {} failed: {}", provider.name(), e);
                }
            }
        }
        None
    }

    /// Region from the chain, or [`DEFAULT_REGION`].
    pub async fn resolve(&self) -> String {
        match self.first_available().await {
            Some(region) => region,
            None => {
                debug!("No region resolved, using default {}", DEFAULT_REGION);
                DEFAULT_REGION.to_string()
            }
        }
    }
}
