//! REST client for the Shepherd orchestrator.
//!
//! The orchestrator owns conversations and token accounting; the console is
//! a pull-based client of three endpoints:
//!
//! - `GET  /api/conversations` — known conversation ids
//! - `GET  /api/conversations/{id}/token-usage` — latest usage snapshot
//! - `POST /api/conversations/{id}/compact` — run a compaction strategy

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shepherd_core::config::ApiConfig;
use shepherd_core::types::{TokenUsage, WarningLevel, WarningThresholds};
use tracing::{debug, warn};

/// Default orchestrator API base URL.
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// HTTP client for the orchestrator's REST API.
pub struct OrchestratorClient {
    /// HTTP client.
    client: Client,

    /// API base URL, without trailing slash.
    api_base: String,
}

impl OrchestratorClient {
    /// Create a new client against the default local orchestrator.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    /// Create a new client against an explicit base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::build(base_url.into(), 30)
    }

    /// Create a new client from the API section of the console config.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::build(config.base_url.clone(), config.timeout_secs)
    }

    fn build(base_url: String, timeout_secs: u64) -> Result<Self, ApiError> {
        if base_url.is_empty() {
            return Err(ApiError::Config("base URL is required".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the ordered collection of known conversation ids.
    pub async fn fetch_conversations(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/api/conversations", self.api_base);
        debug!("Fetching conversations from {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;

        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetch the latest token-usage snapshot for a conversation.
    pub async fn fetch_token_usage(
        &self,
        conversation_id: &str,
    ) -> Result<TokenUsageReport, ApiError> {
        let url = format!(
            "{}/api/conversations/{}/token-usage",
            self.api_base, conversation_id
        );
        debug!("Fetching token usage from {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;

        response
            .json::<TokenUsageReport>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Request a compaction run for a conversation.
    pub async fn compact_conversation(
        &self,
        conversation_id: &str,
        strategy: &str,
    ) -> Result<CompactReport, ApiError> {
        let url = format!(
            "{}/api/conversations/{}/compact",
            self.api_base, conversation_id
        );
        debug!("Requesting compaction via {} (strategy={})", url, strategy);

        let request = CompactRequest {
            conversation_id: conversation_id.to_string(),
            strategy: strategy.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let response = check_status(response).await?;

        response
            .json::<CompactReport>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Map a non-2xx response to a typed error, preserving the body as message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_default()
        .trim()
        .to_string();
    warn!("Orchestrator returned HTTP {}: {}", status, message);

    Err(ApiError::Status {
        status: status.as_u16(),
        message: if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            message
        },
    })
}

/// Wire shape of the token-usage endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageReport {
    /// Conversation id; absent in some orchestrator versions, in which case
    /// the id from the request path is used.
    #[serde(default)]
    pub conversation_id: Option<String>,

    /// Tokens currently retained.
    pub current_tokens: u64,

    /// Compaction trigger point in tokens.
    pub threshold: u64,

    /// Server-computed percentage, when supplied.
    #[serde(default)]
    pub usage_percentage: Option<f64>,

    /// Whether the orchestrator considers compaction warranted.
    #[serde(default)]
    pub needs_compacting: bool,

    /// Workflows run against this conversation.
    #[serde(default)]
    pub workflow_count: u32,

    /// Server-computed warning level, when supplied. Authoritative.
    #[serde(default)]
    pub warning_level: Option<WarningLevel>,
}

impl TokenUsageReport {
    /// Convert into a client snapshot, preferring server-computed fields and
    /// deriving the rest from the configured thresholds.
    pub fn into_usage(self, conversation_id: &str, thresholds: &WarningThresholds) -> TokenUsage {
        let mut usage = TokenUsage::new(
            self.conversation_id
                .unwrap_or_else(|| conversation_id.to_string()),
            self.current_tokens,
            self.threshold,
            thresholds,
        );
        usage.needs_compacting = self.needs_compacting;
        usage.workflow_count = self.workflow_count;
        if let Some(pct) = self.usage_percentage {
            usage.usage_percentage = pct;
        }
        if let Some(level) = self.warning_level {
            usage.warning_level = level;
        } else {
            usage.warning_level = thresholds.classify(usage.usage_percentage);
        }
        usage
    }
}

/// Body of the compact request.
#[derive(Debug, Serialize)]
struct CompactRequest {
    conversation_id: String,
    strategy: String,
}

/// Wire shape of the compact response.
#[derive(Debug, Clone, Deserialize)]
pub struct CompactReport {
    /// Whether the orchestrator compacted the conversation.
    pub success: bool,

    /// Strategy the orchestrator actually ran.
    pub strategy_used: String,

    /// Achieved reduction; may be 0 or negative.
    #[serde(default)]
    pub reduction_percentage: f64,

    /// Server-side completion time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
