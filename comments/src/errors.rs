use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Everything that can end a relay request without a success response.
#[derive(Error, Debug, PartialEq)]
pub enum RelayError {
    #[error("{0}")]
    InvalidInput(String),

    /// The store rejected the record against its schema.
    #[error("Store rejected the comment")]
    RemoteValidation(Value),

    /// Malformed query, auth failure, unsupported filter and similar.
    #[error("Store request failed")]
    RemoteProtocol(Value),

    #[error("Unexpected response from store: {0}")]
    ContractViolation(String),

    #[error("Could not reach store")]
    NoResponse,

    #[error("Failed to prepare store request: {0}")]
    Setup(String),

    #[error("Store responded with status {status}")]
    RemoteStatus { status: StatusCode, payload: Value },
}

impl RelayError {
    pub fn missing(field: &str) -> Self {
        RelayError::InvalidInput(format!("Missing required field: {field}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidInput(_)
            | RelayError::RemoteValidation(_)
            | RelayError::RemoteProtocol(_) => StatusCode::BAD_REQUEST,
            RelayError::ContractViolation(_) | RelayError::NoResponse | RelayError::Setup(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::RemoteStatus { status, .. } => *status,
        }
    }

    /// Short label used as a metric tag.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "invalid_input",
            RelayError::RemoteValidation(_) => "remote_validation",
            RelayError::RemoteProtocol(_) => "remote_protocol",
            RelayError::ContractViolation(_) => "contract_violation",
            RelayError::NoResponse => "no_response",
            RelayError::Setup(_) => "setup",
            RelayError::RemoteStatus { .. } => "remote_status",
        }
    }

    fn details(&self) -> Option<&Value> {
        match self {
            RelayError::RemoteValidation(details)
            | RelayError::RemoteProtocol(details)
            | RelayError::RemoteStatus {
                payload: details, ..
            } => Some(details),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ApiErrorResponse<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorResponse {
            error: self.to_string(),
            details: self.details(),
        });

        (self.status(), body).into_response()
    }
}
