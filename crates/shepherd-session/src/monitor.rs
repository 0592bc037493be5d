//! Token-usage monitor.
//!
//! Holds the latest usage snapshot, scoped to whichever conversation was
//! last fetched, and keeps the warning level derived consistently on every
//! write. The orchestrator is the source of truth; a snapshot is only as
//! fresh as its `last_updated` and consumers must not assume freshness
//! without checking it.

use crate::api::OrchestratorClient;
use crate::error::ApiError;
use chrono::Utc;
use dashmap::DashMap;
use shepherd_core::types::{TokenUsage, TokenUsagePatch, WarningThresholds};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Monitor holding at most one token-usage snapshot client-side.
pub struct UsageMonitor {
    /// Shared orchestrator client.
    client: Arc<OrchestratorClient>,

    /// Warning-level thresholds.
    thresholds: WarningThresholds,

    /// The single retained snapshot.
    snapshot: RwLock<Option<TokenUsage>>,

    /// Issue-order counter for fetches.
    next_seq: AtomicU64,

    /// Per-conversation sequence of the last applied fetch. A response is
    /// discarded when a later-issued fetch for the same conversation has
    /// already been applied.
    applied_seq: DashMap<String, u64>,
}

impl UsageMonitor {
    /// Create a monitor over a shared client and thresholds.
    pub fn new(client: Arc<OrchestratorClient>, thresholds: WarningThresholds) -> Self {
        Self {
            client,
            thresholds,
            snapshot: RwLock::new(None),
            next_seq: AtomicU64::new(1),
            applied_seq: DashMap::new(),
        }
    }

    /// Replace the snapshot wholesale, stamping `last_updated` to now. The
    /// caller-supplied warning level is kept verbatim; construction paths
    /// ([`crate::api::TokenUsageReport::into_usage`]) have already preferred
    /// the server-computed level or derived one from the percentage.
    pub async fn set(&self, mut usage: TokenUsage) {
        usage.last_updated = Utc::now();
        let mut snapshot = self.snapshot.write().await;
        *snapshot = Some(usage);
    }

    /// Merge a partial update into the snapshot, re-deriving the warning
    /// level. A patch with no snapshot present is a no-op, not an error.
    pub async fn patch(&self, patch: TokenUsagePatch) {
        let mut snapshot = self.snapshot.write().await;
        if let Some(usage) = snapshot.as_mut() {
            usage.apply(patch, &self.thresholds);
        }
    }

    /// The retained snapshot, whatever conversation it is scoped to.
    pub async fn snapshot(&self) -> Option<TokenUsage> {
        self.snapshot.read().await.clone()
    }

    /// The retained snapshot, only if it belongs to `conversation_id`.
    /// Reads for any other conversation see usage as absent.
    pub async fn snapshot_for(&self, conversation_id: &str) -> Option<TokenUsage> {
        let snapshot = self.snapshot.read().await;
        snapshot
            .as_ref()
            .filter(|usage| usage.conversation_id == conversation_id)
            .cloned()
    }

    /// Drop the snapshot, e.g. when the selection moves to a conversation
    /// whose usage has not been fetched yet.
    pub async fn clear(&self) {
        let mut snapshot = self.snapshot.write().await;
        *snapshot = None;
    }

    /// Fetch the latest usage for a conversation and apply it.
    ///
    /// On success the snapshot is replaced — unless a later-issued fetch for
    /// the same conversation already completed, in which case the stale
    /// response is discarded and only returned to the caller. On failure the
    /// last known snapshot is preserved and the error propagated.
    pub async fn fetch_for(&self, conversation_id: &str) -> Result<TokenUsage, ApiError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        let report = self.client.fetch_token_usage(conversation_id).await?;
        let usage = report.into_usage(conversation_id, &self.thresholds);

        let superseded = self
            .applied_seq
            .get(conversation_id)
            .map(|applied| *applied > seq)
            .unwrap_or(false);
        if superseded {
            debug!(
                "Discarding stale usage response for {} (seq {})",
                conversation_id, seq
            );
            return Ok(usage);
        }

        self.applied_seq.insert(conversation_id.to_string(), seq);
        self.set(usage.clone()).await;
        Ok(usage)
    }

    /// The configured thresholds.
    pub fn thresholds(&self) -> &WarningThresholds {
        &self.thresholds
    }
}
