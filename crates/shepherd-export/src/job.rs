//! Export job records and their option types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Pdf,
    Json,
    Csv,
    Excel,
    Svg,
}

impl ExportFormat {
    /// File extension for artifacts of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Svg => "svg",
        }
    }

    /// Whether this format is a data serialization (encoded on a blocking
    /// worker) rather than a rendered image.
    pub fn is_tabular(&self) -> bool {
        matches!(
            self,
            ExportFormat::Json | ExportFormat::Csv | ExportFormat::Excel
        )
    }
}

/// Page size for rendered formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageSize {
    /// Portrait pixel dimensions at 96 dpi.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            PageSize::A4 => (794, 1123),
            PageSize::Letter => (816, 1056),
            PageSize::Legal => (816, 1344),
        }
    }
}

/// Page orientation for rendered formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Options for an export job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Widgets included in the export. Filled in at submission.
    #[serde(default)]
    pub selected_widget_ids: Vec<String>,

    /// Page size for rendered formats.
    #[serde(default)]
    pub page_size: PageSize,

    /// Orientation for rendered formats.
    #[serde(default)]
    pub orientation: Orientation,

    /// Render quality, 0-100. Values above 100 are clamped.
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Explicit artifact file name; generated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

fn default_quality() -> u8 {
    90
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            selected_widget_ids: Vec::new(),
            page_size: PageSize::default(),
            orientation: Orientation::default(),
            quality: default_quality(),
            file_name: None,
        }
    }
}

/// Job state machine: `Pending → Processing → Completed | Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ExportStatus {
    /// Whether the job can no longer change (except deletion).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Error)
    }
}

/// Handle to a finished artifact on disk. Released (file deleted) when the
/// job is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadHandle {
    /// Artifact location.
    pub path: PathBuf,

    /// Artifact size in bytes.
    pub size_bytes: u64,
}

/// One export job. Owned exclusively by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    /// Unique job id.
    pub id: String,

    /// Requested format.
    pub format: ExportFormat,

    /// Current state.
    pub status: ExportStatus,

    /// Coarse progress, 0-100, monotonic while the job runs. Reset to 0 on
    /// failure.
    pub progress: u8,

    /// When the job was submitted.
    pub start_time: DateTime<Utc>,

    /// When the job reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Failure message; present only when status is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Finished artifact; present only when status is `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<DownloadHandle>,

    /// Artifact file name.
    pub file_name: String,

    /// Submission options, including the selected widget set.
    pub options: ExportOptions,
}
