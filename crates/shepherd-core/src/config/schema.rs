//! Configuration schema definitions.

use crate::types::WarningThresholds;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main console configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Orchestrator API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Warning-level thresholds for token usage.
    #[serde(default)]
    pub thresholds: WarningThresholds,

    /// Compaction history settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Client-local state persistence.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Orchestrator API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the orchestrator's REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Compaction history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of compaction attempts retained.
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

fn default_history_capacity() -> usize {
    crate::types::DEFAULT_HISTORY_CAPACITY
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

/// Client-local state persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Override for the state file location. Defaults to the path from
    /// [`crate::paths::state_file`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory finished artifacts are written into. Defaults to the path
    /// from [`crate::paths::exports_dir`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Per-job worker timeout in seconds.
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,
}

fn default_worker_timeout_secs() -> u64 {
    30
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            worker_timeout_secs: default_worker_timeout_secs(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Env-filter directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
