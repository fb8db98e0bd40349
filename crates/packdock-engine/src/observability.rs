//! CloudWatch dashboard construction.
//!
//! Pure structural builders: one widget row per runtime, gateway
//! invocation metrics when tools are deployed, and an evaluator score
//! section. Published through the control plane after the evaluator
//! phase when tracing is enabled; failures are warnings, never fatal.

use serde_json::{json, Value};

use packdock_core::config::DeployConfig;
use packdock_core::pack::Pack;
use packdock_core::state::{ResourceKind, ResourceState};

const METRIC_NAMESPACE: &str = "AWS/BedrockAgentCore";
const WIDGET_HEIGHT: u64 = 6;

pub fn build_dashboard(pack: &Pack, config: &DeployConfig, resources: &[ResourceState]) -> Value {
    let mut widgets = Vec::new();
    let mut y = 0u64;

    widgets.push(json!({
        "type": "text",
        "x": 0, "y": y, "width": 24, "height": 2,
        "properties": {
            "markdown": format!(
                "# {} ({})\nDeployed by packdock into {}",
                pack.effective_id(), pack.version, config.region
            )
        }
    }));
    y += 2;

    for rs in resources.iter().filter(|r| r.kind == ResourceKind::AgentRuntime) {
        widgets.push(json!({
            "type": "metric",
            "x": 0, "y": y, "width": 12, "height": WIDGET_HEIGHT,
            "properties": {
                "title": format!("Runtime {} invocations", rs.name),
                "region": config.region,
                "stat": "Sum",
                "period": 300,
                "metrics": [
                    [METRIC_NAMESPACE, "Invocations", "AgentRuntimeName", rs.name],
                    [METRIC_NAMESPACE, "SystemErrors", "AgentRuntimeName", rs.name],
                    [METRIC_NAMESPACE, "UserErrors", "AgentRuntimeName", rs.name]
                ]
            }
        }));
        widgets.push(json!({
            "type": "metric",
            "x": 12, "y": y, "width": 12, "height": WIDGET_HEIGHT,
            "properties": {
                "title": format!("Runtime {} latency", rs.name),
                "region": config.region,
                "stat": "p95",
                "period": 300,
                "metrics": [
                    [METRIC_NAMESPACE, "Latency", "AgentRuntimeName", rs.name]
                ]
            }
        }));
        y += WIDGET_HEIGHT;
    }

    let gateways: Vec<&ResourceState> = resources
        .iter()
        .filter(|r| r.kind == ResourceKind::ToolGateway)
        .collect();
    if !gateways.is_empty() {
        let metrics: Vec<Value> = gateways
            .iter()
            .map(|rs| json!([METRIC_NAMESPACE, "GatewayTargetInvocations", "TargetName", rs.name]))
            .collect();
        widgets.push(json!({
            "type": "metric",
            "x": 0, "y": y, "width": 24, "height": WIDGET_HEIGHT,
            "properties": {
                "title": "Tool gateway invocations",
                "region": config.region,
                "stat": "Sum",
                "period": 300,
                "metrics": metrics
            }
        }));
        y += WIDGET_HEIGHT;
    }

    let evaluators: Vec<&ResourceState> = resources
        .iter()
        .filter(|r| r.kind == ResourceKind::Evaluator)
        .collect();
    if !evaluators.is_empty() {
        let metrics: Vec<Value> = evaluators
            .iter()
            .map(|rs| json!([METRIC_NAMESPACE, "EvaluationScore", "EvaluatorName", rs.name]))
            .collect();
        widgets.push(json!({
            "type": "metric",
            "x": 0, "y": y, "width": 24, "height": WIDGET_HEIGHT,
            "properties": {
                "title": "Evaluator scores",
                "region": config.region,
                "stat": "Average",
                "period": 900,
                "metrics": metrics
            }
        }));
    }

    json!({ "widgets": widgets })
}
