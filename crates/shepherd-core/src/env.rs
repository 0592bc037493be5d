//! Environment variable handling.

use std::env;

/// Known environment variable names.
pub mod vars {
    /// Override for the orchestrator API base URL.
    pub const SHEPHERD_API_URL: &str = "SHEPHERD_API_URL";

    /// Override for the API request timeout in seconds.
    pub const SHEPHERD_API_TIMEOUT: &str = "SHEPHERD_API_TIMEOUT";
}

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
pub fn get_var_or(name: &str, default: &str) -> String {
    get_var(name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable as a boolean.
pub fn get_bool(name: &str) -> bool {
    get_var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Get an environment variable as a u64 (e.g., for timeouts).
pub fn get_u64(name: &str) -> Option<u64> {
    get_var(name).and_then(|v| v.parse().ok())
}
