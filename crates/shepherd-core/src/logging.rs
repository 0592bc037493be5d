//! Logging setup for embedding applications.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber from the logging config.
///
/// `SHEPHERD_LOG` overrides the configured level with a full env-filter
/// directive. Safe to call more than once; later calls are no-ops.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_env("SHEPHERD_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
