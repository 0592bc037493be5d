//! End-to-end compaction flow against a mock orchestrator.
//!
//! Drives the session coordinator through the full protocol: fetch usage,
//! compact, verify the unconditional usage refresh, and exercise the
//! in-flight guard.

use shepherd_core::config::{Config, ConfigBuilder};
use shepherd_core::types::WarningLevel;
use shepherd_session::{SessionCoordinator, SessionError};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    ConfigBuilder::new().base_url(server.uri()).build()
}

/// The walkthrough from the dashboard's reference behavior: a conversation
/// at 95% usage is compacted with `summarize` for a 40% reduction, and the
/// follow-up fetch lands at 57%.
#[tokio::test]
async fn test_compaction_scenario_clears_critical_usage() {
    let server = MockServer::start().await;

    // First usage fetch: 950/1000 -> critical.
    Mock::given(method("GET"))
        .and(path("/api/conversations/c1/token-usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentTokens": 950,
            "threshold": 1000,
            "needsCompacting": true
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    // Post-compaction fetch: 570/1000 -> none.
    Mock::given(method("GET"))
        .and(path("/api/conversations/c1/token-usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentTokens": 570,
            "threshold": 1000
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/conversations/c1/compact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "strategy_used": "summarize",
            "reduction_percentage": 40.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = SessionCoordinator::ephemeral(&config_for(&server)).unwrap();

    assert!(coordinator.select(Some("c1")).await);
    let before = coordinator.current_view().await.usage.unwrap();
    assert!((before.usage_percentage - 95.0).abs() < f64::EPSILON);
    assert_eq!(before.warning_level, WarningLevel::Critical);
    assert!(before.needs_compacting);

    assert!(coordinator.compact("c1", "summarize").await.unwrap());

    // History gained exactly one successful entry.
    let history = coordinator.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].strategy, "summarize");
    assert!((history[0].reduction_percentage - 40.0).abs() < f64::EPSILON);
    assert!(history[0].success);

    // The refresh happened exactly once more (mock .expect verifies the
    // request count) and the monitor advanced.
    let after = coordinator.current_view().await.usage.unwrap();
    assert_eq!(after.current_tokens, 570);
    assert!((after.usage_percentage - 57.0).abs() < f64::EPSILON);
    assert_eq!(after.warning_level, WarningLevel::None);
    assert!(after.last_updated > before.last_updated);
}

/// Two rapid compact calls for one conversation: exactly one request
/// reaches the API, the other is rejected busy, and history gains exactly
/// one entry once the first resolves.
#[tokio::test]
async fn test_in_flight_guard_allows_exactly_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversations/c1/compact"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_millis(250))
                .set_body_json(serde_json::json!({
                    "success": true,
                    "strategy_used": "y",
                    "reduction_percentage": 12.0
                })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/c1/token-usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentTokens": 100,
            "threshold": 1000
        })))
        .mount(&server)
        .await;

    let coordinator = Arc::new(SessionCoordinator::ephemeral(&config_for(&server)).unwrap());

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.compact("c1", "y").await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let second = coordinator.compact("c1", "x").await;
    assert!(matches!(second, Err(SessionError::CompactionBusy(_))));

    assert!(first.await.unwrap().unwrap());
    assert_eq!(coordinator.history().await.len(), 1);

    // The machine is back at Idle; a later compaction would be permitted.
    assert_eq!(
        coordinator.compaction_phase("c1"),
        shepherd_session::CompactionPhase::Idle
    );
}

/// A failed compaction stays in history with success=false so the user can
/// see the attempt occurred, and the caller gets a false result.
#[tokio::test]
async fn test_failed_compaction_is_visible_in_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/conversations/c1/compact"))
        .respond_with(ResponseTemplate::new(503).set_body_string("engine busy"))
        .mount(&server)
        .await;

    let coordinator = SessionCoordinator::ephemeral(&config_for(&server)).unwrap();
    assert!(!coordinator.compact("c1", "truncate").await.unwrap());

    let history = coordinator.history().await;
    assert_eq!(history.len(), 1);
    assert!(!history[0].success);
    assert_eq!(history[0].strategy, "truncate");
    assert_eq!(history[0].reduction_percentage, 0.0);

    // Scoped to the compaction, not the global error.
    assert!(coordinator.compaction_error("c1").is_some());
    assert!(coordinator.last_error().await.is_none());
}

/// A usage fetch failure after a successful compaction leaves the stale
/// snapshot visible (with its old `last_updated`) instead of blanking it.
#[tokio::test]
async fn test_refresh_failure_after_compaction_keeps_stale_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/conversations/c1/token-usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentTokens": 900,
            "threshold": 1000
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/c1/token-usage"))
        .respond_with(ResponseTemplate::new(500).set_body_string("flaky"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/conversations/c1/compact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "strategy_used": "summarize",
            "reduction_percentage": 30.0
        })))
        .mount(&server)
        .await;

    let coordinator = SessionCoordinator::ephemeral(&config_for(&server)).unwrap();
    coordinator.select(Some("c1")).await;

    // Compaction itself succeeded even though the refresh failed.
    assert!(coordinator.compact("c1", "summarize").await.unwrap());

    let view = coordinator.current_view().await;
    let usage = view.usage.expect("stale snapshot is shown, not blanked");
    assert_eq!(usage.current_tokens, 900);
    assert!(view.last_error.is_some(), "staleness is indicated via the error");
}

/// The registry survives a failed list refresh with its known data intact.
#[tokio::test]
async fn test_conversation_list_survives_outage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!(["c1", "c2", "c3"])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .respond_with(ResponseTemplate::new(502).set_body_string("gateway down"))
        .mount(&server)
        .await;

    let coordinator = SessionCoordinator::ephemeral(&config_for(&server)).unwrap();
    assert!(coordinator.refresh_conversations().await);
    assert_eq!(coordinator.registry().count().await, 3);

    assert!(!coordinator.refresh_conversations().await);
    assert_eq!(coordinator.registry().count().await, 3);
    assert!(coordinator.last_error().await.unwrap().contains("502"));
}
