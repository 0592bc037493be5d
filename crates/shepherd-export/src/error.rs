//! Error types for export jobs.

use thiserror::Error;

/// Export result type alias.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors from export processing.
///
/// Job-level failures are captured on the job record; these errors never
/// propagate to other jobs or to the session-level error state.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Submitting with no widgets selected. Rejected before a job exists.
    #[error("No widgets selected for export")]
    EmptySelection,

    #[error("Unknown export job: {0}")]
    UnknownJob(String),

    #[error("Invalid export configuration: {0}")]
    Config(String),

    #[error("Widget data unavailable for '{widget_id}': {message}")]
    WidgetData { widget_id: String, message: String },

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Export timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
