//! Client-local state persistence.
//!
//! The known-conversations list and compaction history survive reload;
//! token-usage snapshots are deliberately never written — they are a live,
//! server-authoritative quantity and must be re-fetched each session.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use shepherd_core::types::{CompactingHistoryEntry, Conversation};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Current on-disk document version.
const STATE_VERSION: u32 = 1;

/// The persisted state document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDocument {
    /// Document schema version.
    #[serde(default)]
    pub version: u32,

    /// Known conversations.
    #[serde(default)]
    pub conversations: Vec<Conversation>,

    /// Compaction history, most-recent-first.
    #[serde(default)]
    pub history: Vec<CompactingHistoryEntry>,
}

impl StateDocument {
    /// Create an empty document at the current version.
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            conversations: Vec::new(),
            history: Vec::new(),
        }
    }
}

/// JSON state file with atomic writes.
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Create a state file handle at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a handle at the default location
    /// (`~/.shepherd-console/state.json`).
    pub fn default_location() -> Result<Self, SessionError> {
        let path = shepherd_core::paths::state_file()
            .map_err(|e| SessionError::Persist(e.to_string()))?;
        Ok(Self::new(path))
    }

    /// The backing path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. A missing file is a fresh start, not an error;
    /// an unreadable or newer-versioned file is.
    pub async fn load(&self) -> Result<StateDocument, SessionError> {
        if !self.path.exists() {
            debug!("No state file at {}, starting fresh", self.path.display());
            return Ok(StateDocument::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let document: StateDocument = serde_json::from_str(&content)?;

        if document.version > STATE_VERSION {
            return Err(SessionError::Persist(format!(
                "State file version {} is newer than supported version {}",
                document.version, STATE_VERSION
            )));
        }

        Ok(document)
    }

    /// Save the document atomically (write to tmp, then rename).
    pub async fn save(&self, document: &StateDocument) -> Result<(), SessionError> {
        let mut document = document.clone();
        document.version = STATE_VERSION;
        let content = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}
