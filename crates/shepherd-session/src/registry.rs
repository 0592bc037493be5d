//! Conversation registry: the set of known conversations and the current
//! selection.
//!
//! Selection is a bare id, kept separate from conversation data so the UI
//! can select optimistically before any fetch resolves. Reads that join the
//! two treat "current points at an unknown id" as data-absent, never as an
//! error.

use shepherd_core::types::Conversation;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registry of known conversations. Sole mutator of conversation records.
pub struct ConversationRegistry {
    /// Known conversations by id.
    conversations: RwLock<HashMap<String, Conversation>>,

    /// Currently selected conversation id, if any. May name an id that is
    /// not (yet) in `conversations`.
    selected: RwLock<Option<String>>,
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            selected: RwLock::new(None),
        }
    }

    /// All known conversations. Ordering is a view concern; callers sort.
    pub async fn list(&self) -> Vec<Conversation> {
        let conversations = self.conversations.read().await;
        conversations.values().cloned().collect()
    }

    /// Get a conversation by id.
    pub async fn get(&self, id: &str) -> Option<Conversation> {
        let conversations = self.conversations.read().await;
        conversations.get(id).cloned()
    }

    /// Insert or replace a conversation. The selection is an id, so a
    /// replaced current conversation leaves no stale denormalized copy.
    pub async fn upsert(&self, conversation: Conversation) {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id.clone(), conversation);
    }

    /// Remove a conversation. If it was current, the selection becomes
    /// `None` — never another conversation.
    pub async fn remove(&self, id: &str) -> Option<Conversation> {
        let removed = {
            let mut conversations = self.conversations.write().await;
            conversations.remove(id)
        };

        if removed.is_some() {
            let mut selected = self.selected.write().await;
            if selected.as_deref() == Some(id) {
                *selected = None;
            }
        }

        removed
    }

    /// Set the current selection. No existence check: optimistic selection
    /// before the conversation list has been fetched is supported.
    pub async fn set_current(&self, id: Option<String>) {
        let mut selected = self.selected.write().await;
        *selected = id;
    }

    /// Currently selected conversation id, if any.
    pub async fn current_id(&self) -> Option<String> {
        self.selected.read().await.clone()
    }

    /// Currently selected conversation record, when its data is known.
    pub async fn current(&self) -> Option<Conversation> {
        let id = self.current_id().await?;
        self.get(&id).await
    }

    /// Merge a fetched id list into the registry: unknown ids become new
    /// records, known ids keep their existing data. Conversations absent
    /// from the list are kept; records are only dropped on explicit
    /// [`remove`](Self::remove).
    pub async fn sync_ids(&self, ids: &[String]) {
        let mut conversations = self.conversations.write().await;
        for id in ids {
            conversations
                .entry(id.clone())
                .or_insert_with(|| Conversation::new(id.clone(), id.clone()));
        }
    }

    /// Update the activity timestamp of a conversation, if known.
    pub async fn touch(&self, id: &str) {
        let mut conversations = self.conversations.write().await;
        if let Some(conversation) = conversations.get_mut(id) {
            conversation.touch();
        }
    }

    /// Record a completed workflow for a conversation, if known.
    pub async fn record_workflow(&self, id: &str) {
        let mut conversations = self.conversations.write().await;
        if let Some(conversation) = conversations.get_mut(id) {
            conversation.record_workflow();
        }
    }

    /// Number of known conversations.
    pub async fn count(&self) -> usize {
        let conversations = self.conversations.read().await;
        conversations.len()
    }

    /// Replace the full conversation set, e.g. when restoring persisted
    /// state at startup. Does not touch the selection.
    pub async fn restore(&self, records: Vec<Conversation>) {
        let mut conversations = self.conversations.write().await;
        conversations.clear();
        for record in records {
            conversations.insert(record.id.clone(), record);
        }
    }
}
