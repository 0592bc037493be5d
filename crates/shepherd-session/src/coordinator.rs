//! Session coordinator: owns all client-side session state and sequences
//! the registry, monitor, and compaction protocol against the orchestrator.
//!
//! Async actions resolve to success indicators instead of throwing, so the
//! UI renders state-driven error banners without try/catch at call sites.
//! The one exception is the busy rejection from [`SessionCoordinator::compact`],
//! which is synchronous and transient rather than a request failure.

use crate::api::OrchestratorClient;
use crate::error::SessionError;
use crate::monitor::UsageMonitor;
use crate::persist::{StateDocument, StateFile};
use crate::registry::ConversationRegistry;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shepherd_core::config::Config;
use shepherd_core::types::{
    CompactingHistoryEntry, CompactionHistory, Conversation, TokenUsage,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Per-conversation compaction state machine:
/// `Idle → Requesting → (Succeeded | Failed) → Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompactionPhase {
    /// No compaction in flight.
    #[default]
    Idle,

    /// A request has been issued and has not resolved.
    Requesting,

    /// The last request succeeded; usage refresh is underway.
    Succeeded,

    /// The last request failed.
    Failed,
}

/// Everything the dashboard renders for the current selection, in one read.
#[derive(Debug, Clone)]
pub struct CurrentView {
    /// Selected conversation id; may name an id with no data yet.
    pub selected_id: Option<String>,

    /// Conversation record for the selection, when known.
    pub conversation: Option<Conversation>,

    /// Usage snapshot for the selection, when fetched. Consumers check
    /// `last_updated` before trusting freshness.
    pub usage: Option<TokenUsage>,

    /// Most recent registry/monitor-level failure, if any.
    pub last_error: Option<String>,
}

/// Owner of all session state. All mutation goes through its methods.
pub struct SessionCoordinator {
    client: Arc<OrchestratorClient>,
    registry: ConversationRegistry,
    monitor: UsageMonitor,
    history: RwLock<CompactionHistory>,

    /// Compaction state machine per conversation. Absent means Idle.
    phases: DashMap<String, CompactionPhase>,

    /// Most recent compaction failure per conversation. Scoped here so a
    /// compaction failure never masks a registry/monitor error.
    compaction_errors: DashMap<String, String>,

    /// Most recent registry/monitor-level failure.
    last_error: RwLock<Option<String>>,

    /// Client-local persistence; `None` runs fully in memory.
    state: Option<StateFile>,
}

impl SessionCoordinator {
    /// Create a coordinator with persistence at the configured state-file
    /// path (or the default location when unset).
    pub fn new(config: &Config) -> Result<Self, SessionError> {
        let state = match &config.storage.state_file {
            Some(path) => StateFile::new(path.clone()),
            None => StateFile::default_location()?,
        };
        Self::build(config, Some(state))
    }

    /// Create a coordinator with no client-local persistence.
    pub fn ephemeral(config: &Config) -> Result<Self, SessionError> {
        Self::build(config, None)
    }

    fn build(config: &Config, state: Option<StateFile>) -> Result<Self, SessionError> {
        let client = Arc::new(OrchestratorClient::from_config(&config.api)?);
        let monitor = UsageMonitor::new(Arc::clone(&client), config.thresholds);

        Ok(Self {
            client,
            registry: ConversationRegistry::new(),
            monitor,
            history: RwLock::new(CompactionHistory::new(config.history.capacity)),
            phases: DashMap::new(),
            compaction_errors: DashMap::new(),
            last_error: RwLock::new(None),
            state,
        })
    }

    /// The conversation registry (read access for views).
    pub fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    /// The token-usage monitor (read access for views).
    pub fn monitor(&self) -> &UsageMonitor {
        &self.monitor
    }

    /// Restore conversations and compaction history from the state file.
    /// Token usage is never restored; it must be re-fetched.
    pub async fn load_state(&self) -> Result<(), SessionError> {
        let Some(state) = &self.state else {
            return Ok(());
        };

        let document = state.load().await?;
        let capacity = { self.history.read().await.capacity() };

        self.registry.restore(document.conversations).await;
        *self.history.write().await =
            CompactionHistory::from_entries(capacity, document.history);

        info!(
            "Restored {} conversation(s) from {}",
            self.registry.count().await,
            state.path().display()
        );
        Ok(())
    }

    /// Write conversations and history to the state file. Best-effort: a
    /// persistence failure is logged, never surfaced as an action failure.
    async fn persist_state(&self) {
        let Some(state) = &self.state else {
            return;
        };

        let mut document = StateDocument::new();
        document.conversations = self.registry.list().await;
        document.history = self.history.read().await.to_vec();

        if let Err(e) = state.save(&document).await {
            warn!("Failed to persist session state: {}", e);
        }
    }

    /// Fetch the conversation list from the orchestrator and merge it in.
    ///
    /// Returns `false` on failure; the previously known list is preserved
    /// (stale-but-available over empty) and the error recorded.
    pub async fn refresh_conversations(&self) -> bool {
        match self.client.fetch_conversations().await {
            Ok(ids) => {
                self.registry.sync_ids(&ids).await;
                *self.last_error.write().await = None;
                self.persist_state().await;
                true
            }
            Err(e) => {
                warn!("Conversation list fetch failed: {}", e);
                *self.last_error.write().await = Some(e.to_string());
                false
            }
        }
    }

    /// Change the current selection and, for a real selection, fetch fresh
    /// usage before the monitor's data is trusted for it.
    ///
    /// Selection itself is optimistic and never fails; the returned flag
    /// reports whether the usage fetch succeeded.
    pub async fn select(&self, conversation_id: Option<&str>) -> bool {
        self.registry
            .set_current(conversation_id.map(str::to_string))
            .await;

        // The previous conversation's snapshot must not be trusted for the
        // new selection.
        self.monitor.clear().await;

        match conversation_id {
            Some(id) => self.refresh_usage(id).await,
            None => true,
        }
    }

    /// Re-fetch token usage for a conversation. Failure preserves the last
    /// known snapshot and records the error.
    pub async fn refresh_usage(&self, conversation_id: &str) -> bool {
        match self.monitor.fetch_for(conversation_id).await {
            Ok(_) => {
                *self.last_error.write().await = None;
                true
            }
            Err(e) => {
                warn!("Usage fetch for {} failed: {}", conversation_id, e);
                *self.last_error.write().await = Some(e.to_string());
                false
            }
        }
    }

    /// Run a compaction strategy against a conversation.
    ///
    /// At most one compaction may be in flight per conversation: a second
    /// call while the first is `Requesting` is rejected synchronously with
    /// [`SessionError::CompactionBusy`] — never queued, never raced.
    ///
    /// Completed attempts return `Ok(true)`/`Ok(false)`. Either way exactly
    /// one history entry is recorded, and after success the conversation's
    /// token usage is unconditionally re-fetched before the machine returns
    /// to `Idle`.
    pub async fn compact(
        &self,
        conversation_id: &str,
        strategy: &str,
    ) -> Result<bool, SessionError> {
        match self.phases.entry(conversation_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == CompactionPhase::Requesting {
                    debug!("Compaction already in flight for {}", conversation_id);
                    return Err(SessionError::CompactionBusy(conversation_id.to_string()));
                }
                entry.insert(CompactionPhase::Requesting);
            }
            Entry::Vacant(entry) => {
                entry.insert(CompactionPhase::Requesting);
            }
        }

        info!(
            "Compacting conversation {} with strategy '{}'",
            conversation_id, strategy
        );

        let succeeded = match self
            .client
            .compact_conversation(conversation_id, strategy)
            .await
        {
            Ok(report) if report.success => {
                self.record_attempt(CompactingHistoryEntry {
                    timestamp: report.timestamp.unwrap_or_else(Utc::now),
                    strategy: report.strategy_used,
                    reduction_percentage: report.reduction_percentage,
                    success: true,
                })
                .await;
                self.compaction_errors.remove(conversation_id);
                self.phases
                    .insert(conversation_id.to_string(), CompactionPhase::Succeeded);

                self.refresh_usage(conversation_id).await;
                self.registry.touch(conversation_id).await;
                true
            }
            Ok(report) => {
                // 2xx with success=false: the orchestrator ran and gave up.
                self.record_attempt(CompactingHistoryEntry {
                    timestamp: report.timestamp.unwrap_or_else(Utc::now),
                    strategy: report.strategy_used,
                    reduction_percentage: report.reduction_percentage,
                    success: false,
                })
                .await;
                self.compaction_errors.insert(
                    conversation_id.to_string(),
                    "orchestrator reported compaction failure".to_string(),
                );
                self.phases
                    .insert(conversation_id.to_string(), CompactionPhase::Failed);
                false
            }
            Err(e) => {
                warn!("Compaction request for {} failed: {}", conversation_id, e);
                self.record_attempt(CompactingHistoryEntry::failed(strategy, 0.0))
                    .await;
                self.compaction_errors
                    .insert(conversation_id.to_string(), e.to_string());
                self.phases
                    .insert(conversation_id.to_string(), CompactionPhase::Failed);
                false
            }
        };

        self.persist_state().await;
        // Terminal phase observed; the machine returns to Idle.
        self.phases.remove(conversation_id);

        Ok(succeeded)
    }

    async fn record_attempt(&self, entry: CompactingHistoryEntry) {
        let mut history = self.history.write().await;
        history.record(entry);
    }

    /// Current compaction phase for a conversation.
    pub fn compaction_phase(&self, conversation_id: &str) -> CompactionPhase {
        self.phases
            .get(conversation_id)
            .map(|phase| *phase)
            .unwrap_or_default()
    }

    /// Most recent compaction failure message for a conversation, if any.
    pub fn compaction_error(&self, conversation_id: &str) -> Option<String> {
        self.compaction_errors
            .get(conversation_id)
            .map(|message| message.clone())
    }

    /// Compaction history, most-recent-first.
    pub async fn history(&self) -> Vec<CompactingHistoryEntry> {
        self.history.read().await.to_vec()
    }

    /// Most recent registry/monitor-level failure, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Remove a conversation. Clears the selection if it was current, and
    /// drops its usage snapshot so no stale data survives the record.
    pub async fn remove_conversation(&self, conversation_id: &str) -> bool {
        let removed = self.registry.remove(conversation_id).await.is_some();
        if removed {
            if self.monitor.snapshot_for(conversation_id).await.is_some() {
                self.monitor.clear().await;
            }
            self.compaction_errors.remove(conversation_id);
            self.persist_state().await;
        }
        removed
    }

    /// Derived selector for the dashboard: selection, its record, its usage
    /// snapshot, and the global error in one consistent read.
    pub async fn current_view(&self) -> CurrentView {
        let selected_id = self.registry.current_id().await;

        let (conversation, usage) = match &selected_id {
            Some(id) => (
                self.registry.get(id).await,
                self.monitor.snapshot_for(id).await,
            ),
            None => (None, None),
        };

        CurrentView {
            selected_id,
            conversation,
            usage,
            last_error: self.last_error.read().await.clone(),
        }
    }
}
