//! Outbound transport to the remote store's GraphQL endpoint.

use crate::config::{StoreConfig, ValidationError};
use async_trait::async_trait;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use url::Url;

pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// A single GraphQL operation. Caller input only ever travels in `variables`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: &'static str,
    pub variables: Value,
}

/// Result of one attempt to reach the store.
#[derive(Clone, Debug, PartialEq)]
pub enum RemoteOutcome {
    /// 2xx status with a JSON body. GraphQL level errors may still be inside.
    Success(Value),
    /// The store answered with a non-success status.
    RemoteError { status: StatusCode, payload: Value },
    /// Nothing came back: connect failure, DNS failure, timeout.
    NoResponse,
    /// The request could not be built or the answer could not be read.
    SetupError(String),
}

#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, request: &GraphqlRequest) -> RemoteOutcome;
}

/// reqwest-backed transport. Every call is attempted exactly once.
#[derive(Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    endpoint: Url,
    access_token: String,
}

impl StoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self, ValidationError> {
        Ok(StoreClient {
            client: reqwest::Client::new(),
            endpoint: config.endpoint()?,
            access_token: config.access_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl GraphqlTransport for StoreClient {
    async fn execute(&self, request: &GraphqlRequest) -> RemoteOutcome {
        let response = match self
            .client
            .post(self.endpoint.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => return RemoteOutcome::SetupError(e.to_string()),
            Err(e) => {
                tracing::error!(endpoint = %self.endpoint, error = %e, "store request failed");
                return RemoteOutcome::NoResponse;
            }
        };

        let status = response.status();
        let body = response.bytes().await.map_err(|e| e.to_string());
        outcome_from(status, body.as_deref().map_err(String::as_str))
    }
}

/// Classifies a response that arrived. An unreadable body keeps the status
/// when it was an error status, and is a setup error otherwise.
fn outcome_from(status: StatusCode, body: Result<&[u8], &str>) -> RemoteOutcome {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(%status, error = %e, "failed to read store response body");
            return if status.is_success() {
                RemoteOutcome::SetupError(format!("unreadable store response: {e}"))
            } else {
                RemoteOutcome::RemoteError {
                    status,
                    payload: Value::String(format!("unreadable store response: {e}")),
                }
            };
        }
    };

    if !status.is_success() {
        let payload = serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));
        return RemoteOutcome::RemoteError { status, payload };
    }

    match serde_json::from_slice(body) {
        Ok(payload) => RemoteOutcome::Success(payload),
        Err(e) => RemoteOutcome::SetupError(format!("store returned invalid JSON: {e}")),
    }
}
