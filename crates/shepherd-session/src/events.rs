//! Typed payloads for the orchestrator's push channels.
//!
//! The communication-flow and memory-flow channels feed display surfaces
//! only. The session core is pull-based and stays correct when no events
//! arrive at all; this module just fixes the wire shapes so peripheral
//! consumers deserialize them consistently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A push event from one of the orchestrator's flow channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "event", rename_all = "kebab-case")]
pub enum PushEvent {
    /// Agent-to-agent message traffic.
    CommunicationFlow(CommunicationFlowEvent),

    /// Memory store reads and writes.
    MemoryFlow(MemoryFlowEvent),
}

impl PushEvent {
    /// Parse an event frame, returning `None` for frames this console
    /// version does not understand. Unknown channels are tolerated, not
    /// errors — the core never depends on push delivery.
    pub fn parse(frame: &str) -> Option<PushEvent> {
        serde_json::from_str(frame).ok()
    }

    /// The conversation this event belongs to.
    pub fn conversation_id(&self) -> &str {
        match self {
            PushEvent::CommunicationFlow(event) => &event.conversation_id,
            PushEvent::MemoryFlow(event) => &event.conversation_id,
        }
    }
}

/// One agent-to-agent message observed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationFlowEvent {
    pub conversation_id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
}

/// Operation kind for memory-flow events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryOperation {
    Read,
    Write,
}

/// One memory-store access observed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryFlowEvent {
    pub conversation_id: String,
    pub operation: MemoryOperation,
    pub store: String,
    #[serde(default)]
    pub description: String,
    pub timestamp: DateTime<Utc>,
}
