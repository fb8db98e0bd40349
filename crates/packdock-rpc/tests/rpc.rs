//! End-to-end tests over the JSON-RPC surface: one request line in,
//! notification + response lines out, backed by the simulated control
//! plane.

use std::sync::Arc;

use serde_json::{json, Value};

use packdock_core::config::DeployConfig;
use packdock_engine::platform::{ControlPlane, SimulatedControlPlane};
use packdock_rpc::{BackendFactory, Server};

fn server() -> Server {
    let backend: BackendFactory = Arc::new(|config: &DeployConfig| {
        Arc::new(SimulatedControlPlane::new(config.region.clone())) as Arc<dyn ControlPlane>
    });
    Server::new(backend)
}

/// Send one request line, collect the emitted lines as JSON values.
async fn roundtrip(server: &Server, request: Value) -> Vec<Value> {
    let mut out: Vec<u8> = Vec::new();
    server
        .handle_line(&request.to_string(), &mut out)
        .await
        .expect("io");
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

fn request(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

const CONFIG: &str =
    r#"{"region": "us-west-2", "runtime_role_arn": "arn:aws:iam::123456789012:role/test"}"#;

#[tokio::test]
async fn provider_info_advertises_capabilities_and_schema() {
    let lines = roundtrip(&server(), request(1, "get_provider_info", json!(null))).await;
    assert_eq!(lines.len(), 1);
    let result = &lines[0]["result"];
    assert_eq!(result["name"], "agentcore");
    let capabilities: Vec<String> =
        serde_json::from_value(result["capabilities"].clone()).unwrap();
    assert_eq!(
        capabilities,
        vec!["plan", "apply", "destroy", "status", "diagnose"]
    );
    // The schema is itself a JSON document.
    let schema: Value =
        serde_json::from_str(result["config_schema"].as_str().unwrap()).unwrap();
    assert_eq!(schema["type"], "object");
}

#[tokio::test]
async fn unknown_method_is_32601() {
    let lines = roundtrip(&server(), request(2, "terraform_apply", json!({}))).await;
    assert_eq!(lines[0]["error"]["code"], -32601);
}

#[tokio::test]
async fn garbage_line_is_a_parse_error() {
    let mut out: Vec<u8> = Vec::new();
    server().handle_line("{not json", &mut out).await.unwrap();
    let response: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);
}

#[tokio::test]
async fn validate_config_reports_errors_and_prefixed_warnings() {
    let bad = json!({"config": "{\"region\": \"nope\", \"runtime_role_arn\": \"nope\"}"});
    let lines = roundtrip(&server(), request(3, "validate_config", bad)).await;
    let result = &lines[0]["result"];
    assert_eq!(result["valid"], false);
    let errors: Vec<String> = serde_json::from_value(result["errors"].clone()).unwrap();
    assert!(errors.iter().any(|e| e.contains("region")));

    let ok = json!({ "config": CONFIG });
    let lines = roundtrip(&server(), request(4, "validate_config", ok)).await;
    let result = &lines[0]["result"];
    assert_eq!(result["valid"], true);
    let errors: Vec<String> = serde_json::from_value(result["errors"].clone()).unwrap();
    assert!(errors.iter().any(|e| e.starts_with("warning: ")));
}

#[tokio::test]
async fn plan_returns_changes_and_summary() {
    let params = json!({
        "pack_json": r#"{"id": "mypack", "version": "v1.0.0", "prompts": {"chat": {}}}"#,
        "deploy_config": CONFIG,
    });
    let lines = roundtrip(&server(), request(5, "plan", params)).await;
    let result = &lines[0]["result"];
    assert_eq!(result["summary"], "Plan: 1 to create, 0 to update, 0 to delete");
    assert_eq!(result["changes"][0]["type"], "agent_runtime");
    assert_eq!(result["changes"][0]["name"], "mypack");
    assert_eq!(result["changes"][0]["action"], "create");
}

#[tokio::test]
async fn plan_rejects_hyphenated_pack_ids_before_any_platform_call() {
    let params = json!({
        "pack_json": r#"{"id": "my-pack", "version": "v1"}"#,
        "deploy_config": CONFIG,
    });
    let lines = roundtrip(&server(), request(6, "plan", params)).await;
    assert_eq!(lines[0]["error"]["code"], -32602);
    assert!(lines[0]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("my-pack"));
}

#[tokio::test]
async fn apply_streams_events_then_returns_state() {
    let params = json!({
        "pack_json": r#"{"id": "mypack", "version": "v1.0.0", "prompts": {"chat": {}}}"#,
        "deploy_config": CONFIG,
    });
    let lines = roundtrip(&server(), request(7, "apply", params)).await;
    assert!(lines.len() >= 3, "progress + resource + response");

    let notifications: Vec<&Value> =
        lines.iter().filter(|l| l["method"] == "event").collect();
    assert!(notifications
        .iter()
        .any(|n| n["params"]["type"] == "progress"));
    assert!(notifications
        .iter()
        .any(|n| n["params"]["type"] == "resource"
            && n["params"]["resource"]["name"] == "mypack"));

    let response = lines.last().unwrap();
    let state: Value =
        serde_json::from_str(response["result"]["adapter_state"].as_str().unwrap()).unwrap();
    assert_eq!(state["pack_id"], "mypack");
    assert_eq!(state["resources"][0]["status"], "created");
    assert!(state["resources"][0]["arn"]
        .as_str()
        .unwrap()
        .contains("us-west-2"));
}

#[tokio::test]
async fn destroy_of_nothing_streams_and_succeeds() {
    let params = json!({ "deploy_config": CONFIG, "prior_state": "" });
    let lines = roundtrip(&server(), request(8, "destroy", params)).await;

    let kinds: Vec<&str> = lines
        .iter()
        .filter(|l| l["method"] == "event")
        .map(|n| n["params"]["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["progress", "complete"]);

    let response = lines.last().unwrap();
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn status_round_trips_the_state_blob() {
    let params = json!({ "deploy_config": CONFIG, "prior_state": "" });
    let lines = roundtrip(&server(), request(9, "status", params)).await;
    let result = &lines[0]["result"];
    assert_eq!(result["status"], "not_deployed");
    assert_eq!(result["state"], "");
    assert_eq!(result["resources"], json!([]));
}

#[tokio::test]
async fn diagnose_reports_config_and_state_checks() {
    let params = json!({ "deploy_config": CONFIG, "prior_state": "{broken" });
    let lines = roundtrip(&server(), request(10, "diagnose", params)).await;
    let checks = lines[0]["result"]["checks"].as_array().unwrap();
    assert!(checks
        .iter()
        .any(|c| c["name"] == "config" && c["status"] == "ok"));
    assert!(checks
        .iter()
        .any(|c| c["name"] == "prior_state" && c["status"] == "warn"));
}

#[tokio::test]
async fn apply_then_destroy_through_the_wire() {
    // One simulator shared across requests so destroy sees apply's work.
    let sim = Arc::new(SimulatedControlPlane::new("us-west-2"));
    let plane = sim.clone();
    let backend: BackendFactory =
        Arc::new(move |_config: &DeployConfig| plane.clone() as Arc<dyn ControlPlane>);
    let server = Server::new(backend);

    let params = json!({
        "pack_json": r#"{"id": "mypack", "version": "v1.0.0",
                         "tools": {"lookup": {}},
                         "agents": {"entry": "coordinator", "members": ["coordinator", "worker"]}}"#,
        "deploy_config": CONFIG,
    });
    let lines = roundtrip(&server, request(11, "apply", params)).await;
    let adapter_state = lines.last().unwrap()["result"]["adapter_state"]
        .as_str()
        .unwrap()
        .to_string();

    let state: Value = serde_json::from_str(&adapter_state).unwrap();
    assert_eq!(state["resources"].as_array().unwrap().len(), 5);

    let params = json!({ "deploy_config": CONFIG, "prior_state": adapter_state });
    let lines = roundtrip(&server, request(12, "destroy", params)).await;
    assert_eq!(lines.last().unwrap()["result"], json!({}));

    assert!(sim.list_runtimes().await.unwrap().is_empty());
    assert!(sim.list_gateways().await.unwrap().is_empty());
}
