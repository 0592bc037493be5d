//! # shepherd-core
//!
//! Core types, configuration, and utilities for the Shepherd console.
//!
//! This crate provides shared functionality used across the console crates:
//!
//! - **Configuration**: Loading, validation, and management of config files
//! - **Types**: Conversations, token-usage snapshots, and compaction history
//! - **Utilities**: Path resolution and environment handling

pub mod config;
pub mod types;
pub mod error;
pub mod logging;
pub mod paths;
pub mod env;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
