//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the console base directory (~/.shepherd-console).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".shepherd-console"))
}

/// Get the main config file path (~/.shepherd-console/console.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("console.json5"))
}

/// Get the client-local state file path (~/.shepherd-console/state.json).
///
/// Holds the known-conversations list and compaction history. Token-usage
/// snapshots are never written here.
pub fn state_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("state.json"))
}

/// Get the directory finished export artifacts are written into
/// (~/.shepherd-console/exports).
pub fn exports_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("exports"))
}
