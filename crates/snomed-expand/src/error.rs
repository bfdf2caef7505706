//! Error types for concept expansion.

use thiserror::Error;

/// Errors that abort a run before any worker is dispatched.
///
/// Failures of individual remote calls are never reported through this type;
/// they are recorded per code in the run result instead.
#[derive(Error, Debug)]
pub enum ExpansionError {
    /// The orchestrator configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The remote client could not be prepared (e.g. missing credentials).
    #[error("Client setup failed: {0}")]
    ClientSetup(#[from] ClientError),

    /// The code mapping table could not be loaded.
    #[error("Code mapping load failed: {0}")]
    MappingLoad(String),
}

/// Errors raised by a single remote expansion call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Network-level failure (connection refused, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// Authentication or authorisation failure.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The code is unknown to the terminology server.
    #[error("code not found: {0}")]
    NotFound(String),

    /// The server answered with an unexpected HTTP status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server-provided detail, if any.
        message: String,
    },

    /// The response body could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call was abandoned because its run was cancelled.
    #[error("request cancelled")]
    Cancelled,

    /// The worker running the call failed before producing a result.
    #[error("worker failure: {0}")]
    Worker(String),
}

/// Result type for expansion operations.
pub type ExpandResult<T> = std::result::Result<T, ExpansionError>;
