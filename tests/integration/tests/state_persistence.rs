//! Client-local state persistence across coordinator restarts.
//!
//! Conversations and compaction history survive a reload; token-usage
//! snapshots never do and must be re-fetched against the orchestrator.

use shepherd_core::config::{Config, ConfigBuilder};
use shepherd_session::SessionCoordinator;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, state_path: &Path) -> Config {
    ConfigBuilder::new()
        .base_url(server.uri())
        .state_file(state_path)
        .history_capacity(3)
        .build()
}

async fn mount_compact_and_usage(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/conversations/c1/compact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "strategy_used": "summarize",
            "reduction_percentage": 15.0
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/c1/token-usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentTokens": 420,
            "threshold": 1000
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["c1"])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_conversations_and_history_survive_restart() {
    let server = MockServer::start().await;
    mount_compact_and_usage(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let config = config_for(&server, &state_path);

    {
        let coordinator = SessionCoordinator::new(&config).unwrap();
        assert!(coordinator.refresh_conversations().await);
        assert!(coordinator.select(Some("c1")).await);
        assert!(coordinator.compact("c1", "summarize").await.unwrap());
        assert!(coordinator.monitor().snapshot_for("c1").await.is_some());
    }
    assert!(state_path.exists());

    // The raw document never contains token usage.
    let raw = std::fs::read_to_string(&state_path).unwrap();
    assert!(!raw.contains("currentTokens"));
    assert!(!raw.contains("usagePercentage"));

    let coordinator = SessionCoordinator::new(&config).unwrap();
    coordinator.load_state().await.unwrap();

    assert_eq!(coordinator.registry().count().await, 1);
    let history = coordinator.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].strategy, "summarize");

    // Usage starts absent and is only trusted after a fresh fetch.
    assert!(coordinator.monitor().snapshot_for("c1").await.is_none());
    assert!(coordinator.select(Some("c1")).await);
    assert_eq!(
        coordinator
            .monitor()
            .snapshot_for("c1")
            .await
            .unwrap()
            .current_tokens,
        420
    );
}

#[tokio::test]
async fn test_history_capacity_applies_to_restored_entries() {
    let server = MockServer::start().await;
    mount_compact_and_usage(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let config = config_for(&server, &state_path);

    {
        let coordinator = SessionCoordinator::new(&config).unwrap();
        for _ in 0..5 {
            assert!(coordinator.compact("c1", "summarize").await.unwrap());
        }
        // Capacity 3: the two oldest were evicted on push.
        assert_eq!(coordinator.history().await.len(), 3);
    }

    let coordinator = SessionCoordinator::new(&config).unwrap();
    coordinator.load_state().await.unwrap();
    assert_eq!(coordinator.history().await.len(), 3);
}

#[tokio::test]
async fn test_missing_state_file_is_a_fresh_start() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server, &dir.path().join("never-written.json"));

    let coordinator = SessionCoordinator::new(&config).unwrap();
    coordinator.load_state().await.unwrap();
    assert_eq!(coordinator.registry().count().await, 0);
    assert!(coordinator.history().await.is_empty());
}
