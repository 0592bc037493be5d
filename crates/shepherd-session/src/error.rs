//! Error types for session state and the orchestrator API.

use thiserror::Error;

/// Session result type alias.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors from session-level operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A compaction is already in flight for this conversation. Transient;
    /// not retryable until the in-flight request resolves.
    #[error("Compaction already in progress for conversation {0}")]
    CompactionBusy(String),

    #[error("State persistence error: {0}")]
    Persist(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transport-level errors from the orchestrator's REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid API configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
