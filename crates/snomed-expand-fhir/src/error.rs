//! Error types for the FHIR terminology client.

use snomed_expand::ClientError;
use thiserror::Error;

/// Result type for FHIR client operations.
pub type FhirResult<T> = Result<T, FhirError>;

/// Errors that can occur while talking to a FHIR terminology server.
#[derive(Debug, Error)]
pub enum FhirError {
    /// The client configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP request could not be completed.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server rejected the credentials or the token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The code or value set is unknown to the server.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server answered with an unexpected status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Diagnostics from the OperationOutcome, or the status reason.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The run stopped waiting for this call.
    #[error("Cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for FhirError {
    fn from(err: serde_json::Error) -> Self {
        FhirError::Decode(err.to_string())
    }
}

impl From<FhirError> for ClientError {
    fn from(err: FhirError) -> Self {
        match err {
            FhirError::InvalidConfig(message) => ClientError::Auth(message),
            FhirError::Request(source) if source.is_decode() => {
                ClientError::InvalidResponse(source.to_string())
            }
            FhirError::Request(source) => ClientError::Transport(source.to_string()),
            FhirError::Unauthorized(message) => ClientError::Auth(message),
            FhirError::NotFound(message) => ClientError::NotFound(message),
            FhirError::Status { status, message } => ClientError::Http { status, message },
            FhirError::Decode(message) => ClientError::InvalidResponse(message),
            FhirError::Cancelled => ClientError::Cancelled,
        }
    }
}
