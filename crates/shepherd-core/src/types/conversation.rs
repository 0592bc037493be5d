//! Conversation records reported by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation known to the console.
///
/// Created when the orchestrator reports a new conversation id, updated on
/// every activity, removed on explicit deletion. The conversation registry
/// is the sole mutator; everything else reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Opaque unique identifier.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp.
    pub last_activity_at: DateTime<Utc>,

    /// Number of workflows the orchestrator has run in this conversation.
    #[serde(default)]
    pub workflow_count: u32,

    /// Whether the conversation is active on the orchestrator side.
    #[serde(default)]
    pub active: bool,
}

impl Conversation {
    /// Create a new conversation record.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            created_at: now,
            last_activity_at: now,
            workflow_count: 0,
            active: true,
        }
    }

    /// Update the last activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Record a completed workflow: bumps the counter and touches activity.
    pub fn record_workflow(&mut self) {
        self.workflow_count += 1;
        self.touch();
    }
}
