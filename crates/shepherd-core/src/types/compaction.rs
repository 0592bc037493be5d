//! Compaction attempt records and their bounded history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of compaction attempts retained client-side.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Record of one completed compaction attempt, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactingHistoryEntry {
    /// When the attempt completed.
    pub timestamp: DateTime<Utc>,

    /// Name of the compaction algorithm used (opaque to the console).
    pub strategy: String,

    /// Reported reduction; may be 0 or negative when compaction failed to
    /// shrink the conversation.
    pub reduction_percentage: f64,

    /// Whether the orchestrator reported success.
    pub success: bool,
}

impl CompactingHistoryEntry {
    /// Record for a successful attempt.
    pub fn succeeded(strategy: impl Into<String>, reduction_percentage: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            strategy: strategy.into(),
            reduction_percentage,
            success: true,
        }
    }

    /// Record for a failed attempt. Reduction is 0 unless the failure
    /// response specified otherwise.
    pub fn failed(strategy: impl Into<String>, reduction_percentage: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            strategy: strategy.into(),
            reduction_percentage,
            success: false,
        }
    }
}

/// Fixed-capacity, most-recent-first ring buffer of compaction attempts.
///
/// Appending beyond capacity silently evicts the oldest entry; eviction
/// happens on push, not as a truncation on read.
#[derive(Debug, Clone)]
pub struct CompactionHistory {
    capacity: usize,
    entries: VecDeque<CompactingHistoryEntry>,
}

impl Default for CompactionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl CompactionHistory {
    /// Create a history bounded at `capacity` entries. A capacity of 0 is
    /// treated as 1 so the most recent attempt is always observable.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuild from persisted entries (most-recent-first), dropping any
    /// overflow beyond capacity.
    pub fn from_entries(capacity: usize, entries: Vec<CompactingHistoryEntry>) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries.into_iter().rev() {
            history.record(entry);
        }
        history
    }

    /// Append an attempt, evicting the oldest entry when full.
    pub fn record(&mut self, entry: CompactingHistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Entries most-recent-first.
    pub fn entries(&self) -> impl Iterator<Item = &CompactingHistoryEntry> {
        self.entries.iter()
    }

    /// Most recent attempt, if any.
    pub fn latest(&self) -> Option<&CompactingHistoryEntry> {
        self.entries.front()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any attempt has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot for persistence, most-recent-first.
    pub fn to_vec(&self) -> Vec<CompactingHistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(strategy: &str) -> CompactingHistoryEntry {
        CompactingHistoryEntry::succeeded(strategy, 10.0)
    }

    #[test]
    fn test_record_most_recent_first() {
        let mut history = CompactionHistory::new(5);
        history.record(entry("first"));
        history.record(entry("second"));

        let strategies: Vec<_> = history.entries().map(|e| e.strategy.as_str()).collect();
        assert_eq!(strategies, vec!["second", "first"]);
        assert_eq!(history.latest().unwrap().strategy, "second");
    }

    #[test]
    fn test_capacity_bound_evicts_oldest() {
        let mut history = CompactionHistory::new(20);
        for i in 0..25 {
            history.record(entry(&format!("s{}", i)));
        }

        assert_eq!(history.len(), 20);
        // Most recent first; the five oldest (s0..s4) were evicted.
        assert_eq!(history.latest().unwrap().strategy, "s24");
        let oldest = history.entries().last().unwrap();
        assert_eq!(oldest.strategy, "s5");
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut history = CompactionHistory::new(0);
        history.record(entry("a"));
        history.record(entry("b"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().strategy, "b");
    }

    #[test]
    fn test_failed_entries_are_retained() {
        let mut history = CompactionHistory::new(5);
        history.record(CompactingHistoryEntry::failed("summarize", 0.0));

        let latest = history.latest().unwrap();
        assert!(!latest.success);
        assert_eq!(latest.reduction_percentage, 0.0);
    }

    #[test]
    fn test_round_trip_through_entries() {
        let mut history = CompactionHistory::new(3);
        for name in ["a", "b", "c"] {
            history.record(entry(name));
        }

        let restored = CompactionHistory::from_entries(3, history.to_vec());
        let strategies: Vec<_> = restored.entries().map(|e| e.strategy.as_str()).collect();
        assert_eq!(strategies, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_from_entries_drops_overflow() {
        let entries: Vec<_> = (0..10).map(|i| entry(&format!("s{}", i))).collect();
        // entries are most-recent-first: s0 is newest
        let history = CompactionHistory::from_entries(4, entries);
        assert_eq!(history.len(), 4);
        assert_eq!(history.latest().unwrap().strategy, "s0");
    }

    #[test]
    fn test_negative_reduction_allowed() {
        let mut history = CompactionHistory::new(5);
        history.record(CompactingHistoryEntry::failed("truncate", -3.5));
        assert_eq!(history.latest().unwrap().reduction_percentage, -3.5);
    }
}
