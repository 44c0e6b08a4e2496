//! Credentials source selection.

use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use std::fmt;
use tracing::info;

/// Provider name attached to credentials supplied through configuration.
const STATIC_PROVIDER_NAME: &str = "repository-config";

/// An explicit access key / secret pair.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    access_key_id: String,
    secret_access_key: String,
}

impl StaticCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Where the backend client gets its credentials from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Exactly the configured pair.
    Static(StaticCredentials),
    /// The SDK's default chain: environment variables, profile files,
    /// container and instance roles.
    Ambient,
}

impl CredentialSource {
    /// An explicit pair always wins; otherwise defer to the environment.
    pub fn resolve(explicit: Option<StaticCredentials>) -> Self {
        match explicit {
            Some(creds) => {
                info!("Using static credentials from repository configuration");
                CredentialSource::Static(creds)
            }
            None => CredentialSource::Ambient,
        }
    }

    /// Build the SDK provider.  Nothing is resolved here; a missing or bad
    /// credential surfaces on the first request.
    pub async fn into_provider(self) -> SharedCredentialsProvider {
        match self {
            CredentialSource::Static(creds) => {
                SharedCredentialsProvider::new(Credentials::new(
                    creds.access_key_id,
                    creds.secret_access_key,
                    None, // session_token
                    None, // expiry
                    STATIC_PROVIDER_NAME,
                ))
            }
            CredentialSource::Ambient => SharedCredentialsProvider::new(
                aws_config::default_provider::credentials::DefaultCredentialsChain::builder()
                    .build()
                    .await,
            ),
        }
    }
}
