mod common;

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use packdock_core::config::MemoryStore;
use packdock_core::event::EventType;
use packdock_engine::platform::{ControlPlane, SimulatedControlPlane};
use packdock_engine::DestroyOutcome;

use common::*;

async fn run_destroy(
    plane: Arc<dyn ControlPlane>,
    prior: &str,
) -> (DestroyOutcome, Vec<packdock_core::event::Event>) {
    let client = client(plane);
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let mut sink = collecting_sink(log.clone());
    let ctx = CancellationToken::new();
    let outcome = packdock_engine::destroy(&client, prior, &ctx, &mut sink).await;
    let events = log.lock().unwrap().clone();
    (outcome, events)
}

#[tokio::test]
async fn empty_state_reports_and_completes() {
    let sim = Arc::new(SimulatedControlPlane::new(REGION));
    let (outcome, events) = run_destroy(sim, "").await;

    assert!(outcome.aborted.is_none());
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, EventType::Progress);
    assert_eq!(
        events[0].message.as_deref(),
        Some("No resources to destroy")
    );
    assert_eq!(events[1].event_type, EventType::Complete);
    assert!(resource_events(&events).is_empty());
}

#[tokio::test]
async fn teardown_walks_kinds_in_reverse_dependency_order() {
    let sim = Arc::new(SimulatedControlPlane::new(REGION));
    // One resource of every kind; none exist on the platform any more,
    // which the destroyer treats as already-deleted.
    let prior = r#"{"pack_id": "mypack", "version": "v1.0.0",
        "deployed_at": "2026-07-01T00:00:00Z",
        "resources": [
          {"type": "memory", "name": "mypack_memory", "arn": "", "status": "created", "metadata": {"id": "mem-1"}},
          {"type": "tool_gateway", "name": "lookup_tool_gw", "arn": "", "status": "created", "metadata": {"id": "tgt-1", "gateway_id": "gw-1"}},
          {"type": "agent_runtime", "name": "mypack", "arn": "", "status": "created", "metadata": {"id": "rt-1"}},
          {"type": "a2a_endpoint", "name": "mypack_a2a", "arn": "arn:aws:x", "status": "created"},
          {"type": "evaluator", "name": "quality_eval", "arn": "", "status": "created", "metadata": {"id": "eval-1"}},
          {"type": "online_eval_config", "name": "mypack_online_eval", "arn": "", "status": "created", "metadata": {"id": "oec-1"}},
          {"type": "cedar_policy", "name": "chat_policy_engine", "arn": "", "status": "created", "metadata": {"policy_engine_id": "pe-1"}}
        ]}"#;

    let (outcome, events) = run_destroy(sim, prior).await;

    assert!(outcome.aborted.is_none());
    let kinds: Vec<String> = resource_events(&events)
        .into_iter()
        .map(|(kind, _, _, _)| kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            "cedar_policy",
            "evaluator",
            "online_eval_config",
            "a2a_endpoint",
            "agent_runtime",
            "tool_gateway",
            "memory"
        ]
    );
    assert!(resource_events(&events)
        .iter()
        .all(|(_, _, action, status)| action == "delete" && status == "deleted"));
    assert_eq!(events.last().unwrap().event_type, EventType::Complete);
}

#[tokio::test]
async fn per_kind_failure_is_best_effort() {
    let sim = Arc::new(SimulatedControlPlane::new(REGION));
    let failing = Arc::new(FailingControlPlane::new(sim));
    failing.fail_on("delete_runtime");

    let prior = r#"{"pack_id": "mypack", "version": "v1.0.0",
        "deployed_at": "2026-07-01T00:00:00Z",
        "resources": [
          {"type": "agent_runtime", "name": "rt-1", "arn": "", "status": "created", "metadata": {"id": "rt-1"}},
          {"type": "tool_gateway", "name": "tg-1", "arn": "", "status": "created", "metadata": {"id": "tgt-1", "gateway_id": "gw-1"}}
        ]}"#;

    let (outcome, events) = run_destroy(failing, prior).await;

    assert!(outcome.aborted.is_none());
    assert!(events
        .iter()
        .any(|e| e.event_type == EventType::Error));

    let resources = resource_events(&events);
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].0, "tool_gateway");
    assert_eq!(resources[0].1, "tg-1");
    assert_eq!(resources[0].3, "deleted");
    assert_eq!(events.last().unwrap().event_type, EventType::Complete);
}

#[tokio::test]
async fn destroy_after_apply_purges_the_parent_gateway() {
    let sim = Arc::new(SimulatedControlPlane::new(REGION));
    let pack: packdock_core::pack::Pack = serde_json::from_str(
        r#"{"id": "mypack", "version": "v1.0.0",
            "prompts": {"chat": {"tool_policy": {"blocklist": ["lookup"]}}},
            "tools": {"lookup": {}, "search": {}},
            "evals": [{"id": "quality", "type": "llm_as_judge"}]}"#,
    )
    .unwrap();
    let mut cfg = config();
    cfg.memory_store = Some(MemoryStore::Single("episodic".into()));

    let (outcome, _) = run_apply(sim.clone(), &pack, &mut cfg, "").await;
    assert!(outcome.error.is_none());
    let blob = outcome.state.to_json().unwrap();

    let (destroy_outcome, events) = run_destroy(sim.clone(), &blob).await;
    assert!(destroy_outcome.aborted.is_none());
    assert!(!events.iter().any(|e| e.event_type == EventType::Error));

    // Everything is gone, including the lazily created parent gateway and
    // the policy engine's children.
    assert!(sim.list_gateways().await.unwrap().is_empty());
    assert!(sim.list_memories().await.unwrap().is_empty());
    assert!(sim.list_runtimes().await.unwrap().is_empty());
    assert!(sim.list_policy_engines().await.unwrap().is_empty());
    assert!(sim.list_evaluators().await.unwrap().is_empty());
    assert!(sim.list_online_eval_configs().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_kinds_still_complete_the_stream() {
    let sim = Arc::new(SimulatedControlPlane::new(REGION));
    let prior = r#"{"pack_id": "mypack", "version": "v1.0.0",
        "deployed_at": "2026-07-01T00:00:00Z",
        "resources": [
          {"type": "browser_session", "name": "b1", "arn": "arn:aws:x", "status": "created"}
        ]}"#;

    let (outcome, events) = run_destroy(sim, prior).await;

    assert!(outcome.aborted.is_none());
    let resources = resource_events(&events);
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].0, "browser_session");
    assert_eq!(events.last().unwrap().event_type, EventType::Complete);
}
