use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Store host cannot be empty")]
    EmptyStoreHost,

    #[error("Store access token cannot be empty")]
    EmptyAccessToken,

    #[error("Invalid store endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

fn default_api_version() -> String {
    "2024-10".into()
}

fn default_scheme() -> String {
    "https".into()
}

/// Remote content store the comments are persisted in.
#[derive(Clone, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Store hostname, e.g. "example.myshopify.com"
    pub host: String,
    /// Static token sent with every GraphQL request
    pub access_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

// Keeps the token out of logs.
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl StoreConfig {
    /// The admin GraphQL endpoint for this store.
    pub fn endpoint(&self) -> Result<Url, ValidationError> {
        let endpoint = format!(
            "{}://{}/admin/api/{}/graphql.json",
            self.scheme,
            self.host.trim().trim_end_matches('/'),
            self.api_version
        );

        Url::parse(&endpoint).map_err(|e| ValidationError::InvalidEndpoint {
            endpoint,
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::EmptyStoreHost);
        }
        if self.access_token.trim().is_empty() {
            return Err(ValidationError::EmptyAccessToken);
        }
        self.endpoint()?;
        Ok(())
    }
}

/// Publication state given to every created comment record.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Publication {
    #[default]
    Published,
    Draft,
}

/// Wire value of the remote `publishable` capability.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublishableStatus {
    Active,
    Draft,
}

impl From<Publication> for PublishableStatus {
    fn from(publication: Publication) -> Self {
        match publication {
            Publication::Published => PublishableStatus::Active,
            Publication::Draft => PublishableStatus::Draft,
        }
    }
}

/// Comment relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the storefront-facing endpoints
    #[serde(default)]
    pub listener: Listener,
    /// Optional listener for health and readiness checks
    pub admin_listener: Option<Listener>,
    pub store: StoreConfig,
    #[serde(default)]
    pub publication: Publication,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if let Some(admin_listener) = &self.admin_listener {
            admin_listener.validate()?;
        }
        self.store.validate()
    }
}
