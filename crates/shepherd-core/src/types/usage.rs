//! Token-usage snapshots and warning-level classification.
//!
//! The orchestrator is authoritative for token counts; the console holds at
//! most one snapshot per session and derives a coarse warning level from the
//! usage percentage when the server does not supply one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse classification of how close a conversation is to needing compaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    /// Usage is comfortably below the warning threshold.
    #[default]
    None,

    /// Usage is approaching the compaction trigger point.
    Warning,

    /// Usage is at or past the point where compaction is overdue.
    Critical,
}

/// Percentage thresholds at which the warning level escalates.
///
/// The exact numbers are configuration, not contract; the only invariant is
/// that classification stays monotonic in the usage percentage, which
/// `Config::validate` enforces by requiring `warning < critical`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarningThresholds {
    /// Percentage at which the level becomes `Warning`.
    #[serde(default = "default_warning_percent")]
    pub warning_percent: f64,

    /// Percentage at which the level becomes `Critical`.
    #[serde(default = "default_critical_percent")]
    pub critical_percent: f64,
}

fn default_warning_percent() -> f64 {
    70.0
}

fn default_critical_percent() -> f64 {
    90.0
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self {
            warning_percent: default_warning_percent(),
            critical_percent: default_critical_percent(),
        }
    }
}

impl WarningThresholds {
    /// Classify a usage percentage into a warning level.
    pub fn classify(&self, usage_percentage: f64) -> WarningLevel {
        if usage_percentage >= self.critical_percent {
            WarningLevel::Critical
        } else if usage_percentage >= self.warning_percent {
            WarningLevel::Warning
        } else {
            WarningLevel::None
        }
    }
}

/// A token-usage snapshot for one conversation.
///
/// Invariant: `warning_level` is always consistent with `usage_percentage`
/// as of the last write. Every mutating path goes through [`TokenUsage::apply`]
/// or the constructors, which re-derive both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Conversation this snapshot belongs to.
    pub conversation_id: String,

    /// Tokens currently retained in the conversation log.
    pub current_tokens: u64,

    /// Compaction trigger point in tokens. Always > 0.
    pub threshold: u64,

    /// `current_tokens / threshold * 100`; may exceed 100.
    pub usage_percentage: f64,

    /// Whether the orchestrator considers compaction warranted.
    #[serde(default)]
    pub needs_compacting: bool,

    /// Workflows run against this conversation.
    #[serde(default)]
    pub workflow_count: u32,

    /// When this snapshot was last written client-side.
    pub last_updated: DateTime<Utc>,

    /// Derived (or server-supplied) warning level.
    pub warning_level: WarningLevel,
}

impl TokenUsage {
    /// Build a snapshot from raw counts, deriving percentage and level.
    pub fn new(
        conversation_id: impl Into<String>,
        current_tokens: u64,
        threshold: u64,
        thresholds: &WarningThresholds,
    ) -> Self {
        let usage_percentage = percentage(current_tokens, threshold);
        Self {
            conversation_id: conversation_id.into(),
            current_tokens,
            threshold,
            usage_percentage,
            needs_compacting: false,
            workflow_count: 0,
            last_updated: Utc::now(),
            warning_level: thresholds.classify(usage_percentage),
        }
    }

    /// Re-derive percentage and warning level from the current counts.
    ///
    /// A level supplied by the server wins; pass it as `authoritative` and it
    /// is kept verbatim instead of the client derivation.
    pub fn rederive(&mut self, thresholds: &WarningThresholds, authoritative: Option<WarningLevel>) {
        self.usage_percentage = percentage(self.current_tokens, self.threshold);
        self.warning_level = match authoritative {
            Some(level) => level,
            None => thresholds.classify(self.usage_percentage),
        };
        self.last_updated = Utc::now();
    }

    /// Merge a partial update, then re-derive percentage and level.
    pub fn apply(&mut self, patch: TokenUsagePatch, thresholds: &WarningThresholds) {
        if let Some(tokens) = patch.current_tokens {
            self.current_tokens = tokens;
        }
        if let Some(threshold) = patch.threshold {
            self.threshold = threshold;
        }
        if let Some(needs) = patch.needs_compacting {
            self.needs_compacting = needs;
        }
        if let Some(count) = patch.workflow_count {
            self.workflow_count = count;
        }
        self.rederive(thresholds, patch.warning_level);
    }
}

/// A partial token-usage update, merged via [`TokenUsage::apply`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_compacting: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_count: Option<u32>,

    /// Server-supplied level; kept verbatim when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_level: Option<WarningLevel>,
}

fn percentage(current_tokens: u64, threshold: u64) -> f64 {
    // threshold is contractually > 0, but a zero from a misbehaving server
    // must not poison the snapshot with a NaN
    if threshold == 0 {
        return 0.0;
    }
    current_tokens as f64 / threshold as f64 * 100.0
}
