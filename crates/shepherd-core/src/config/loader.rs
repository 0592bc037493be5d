//! Configuration loading and persistence.

use super::Config;
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::Path;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = paths::config_file()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        // 1. Base URL must parse
        if let Err(e) = url::Url::parse(&self.api.base_url) {
            errors.push(format!("Invalid api.base_url '{}': {}", self.api.base_url, e));
        }

        // 2. Timeouts must be non-zero
        if self.api.timeout_secs == 0 {
            errors.push("api.timeout_secs must be greater than 0".to_string());
        }
        if self.export.worker_timeout_secs == 0 {
            errors.push("export.worker_timeout_secs must be greater than 0".to_string());
        }

        // 3. Warning thresholds must be positive and strictly ordered so the
        //    level classification stays monotonic
        if self.thresholds.warning_percent <= 0.0 {
            errors.push(format!(
                "thresholds.warning_percent must be positive, got {}",
                self.thresholds.warning_percent
            ));
        }
        if self.thresholds.critical_percent <= self.thresholds.warning_percent {
            errors.push(format!(
                "thresholds.critical_percent ({}) must exceed warning_percent ({})",
                self.thresholds.critical_percent, self.thresholds.warning_percent
            ));
        }

        // 4. History capacity
        if self.history.capacity == 0 {
            errors.push("history.capacity must be greater than 0".to_string());
        }

        // Return collected errors
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Load configuration from the default path, falling back to defaults if
    /// no file exists. Environment variables then override the API section,
    /// enabling zero-config startup against a locally running orchestrator.
    pub fn load_or_default() -> Self {
        let mut config = match Self::load_default() {
            Ok(config) => config,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config
    }

    /// Apply environment-variable overrides to the API section.
    pub fn apply_env_overrides(&mut self) {
        use crate::env;

        if let Some(base_url) = env::get_var(env::vars::SHEPHERD_API_URL) {
            self.api.base_url = base_url;
        }
        if let Some(timeout) = env::get_u64(env::vars::SHEPHERD_API_TIMEOUT) {
            self.api.timeout_secs = timeout;
        }
    }
}

/// Configuration builder for creating configs programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the orchestrator API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    /// Set the API request timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.api.timeout_secs = secs;
        self
    }

    /// Set the warning-level thresholds.
    pub fn thresholds(mut self, warning_percent: f64, critical_percent: f64) -> Self {
        self.config.thresholds.warning_percent = warning_percent;
        self.config.thresholds.critical_percent = critical_percent;
        self
    }

    /// Set the compaction history capacity.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history.capacity = capacity;
        self
    }

    /// Set the state file path.
    pub fn state_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.storage.state_file = Some(path.into());
        self
    }

    /// Set the export output directory.
    pub fn output_dir(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.export.output_dir = Some(path.into());
        self
    }

    /// Set the export worker timeout in seconds.
    pub fn worker_timeout_secs(mut self, secs: u64) -> Self {
        self.config.export.worker_timeout_secs = secs;
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: super::LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build the config.
    pub fn build(self) -> Config {
        self.config
    }

    /// Validate and build the config, returning an error if validation fails.
    pub fn build_validated(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
