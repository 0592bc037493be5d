//! # shepherd-session
//!
//! Client-side session state for the Shepherd console: the conversation
//! registry, the token-usage monitor, and the compaction coordinator that
//! ties them together against the orchestrator's REST API.
//!
//! All state is owned by [`SessionCoordinator`]; mutation goes through its
//! action methods, which resolve to success indicators rather than throwing
//! so the UI can render error banners without try/catch at every call site.

pub mod api;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod monitor;
pub mod persist;
pub mod registry;

pub use api::OrchestratorClient;
pub use coordinator::{CompactionPhase, CurrentView, SessionCoordinator};
pub use error::{ApiError, Result, SessionError};
pub use monitor::UsageMonitor;
pub use persist::StateFile;
pub use registry::ConversationRegistry;
