//! Desired-state derivation and diffing.
//!
//! `plan` turns a pack + config into the canonical desired resource list,
//! diffs it against prior state, and emits the action list plus the
//! summary line. The output is deterministic: desired resources follow
//! the apply phase order, and deletes are sorted by key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use packdock_core::config::DeployConfig;
use packdock_core::event::ResourceAction;
use packdock_core::names;
use packdock_core::pack::Pack;
use packdock_core::state::{ResourceKey, ResourceKind, ResourceState};

/// One planned action, as returned to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceChange {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    pub action: ResourceAction,
    pub detail: String,
}

/// The desired resources for a pack + config, in apply order.
pub fn desired_resources(pack: &Pack, config: &DeployConfig) -> Vec<(ResourceKind, String, String)> {
    let pack_id = pack.effective_id();
    let mut desired = Vec::new();

    if let Ok(Some(settings)) = config.memory_settings() {
        let strategies: Vec<String> =
            settings.strategies.iter().map(|s| s.to_string()).collect();
        desired.push((
            ResourceKind::Memory,
            names::memory_name(pack_id),
            format!("memory store ({})", strategies.join(", ")),
        ));
    }

    for tool in pack.tools.keys() {
        desired.push((
            ResourceKind::ToolGateway,
            names::tool_gateway_name(tool),
            format!("gateway target for tool {tool}"),
        ));
    }

    for (prompt, p) in pack.prompts_with_blocklist() {
        let count = p
            .tool_policy
            .as_ref()
            .map(|tp| tp.blocklist.len())
            .unwrap_or(0);
        desired.push((
            ResourceKind::CedarPolicy,
            names::policy_engine_name(prompt),
            format!("policy engine with {count} blocklist entries for prompt {prompt}"),
        ));
    }

    for member in pack.member_names() {
        desired.push((
            ResourceKind::AgentRuntime,
            member.clone(),
            format!("agent runtime for {member}"),
        ));
    }

    if let Some(agents) = &pack.agents {
        for member in &agents.members {
            desired.push((
                ResourceKind::A2aEndpoint,
                names::a2a_endpoint_name(member),
                format!("a2a endpoint for {member}"),
            ));
        }
    }

    let judges: Vec<_> = pack.judge_evals().collect();
    for eval in &judges {
        desired.push((
            ResourceKind::Evaluator,
            names::evaluator_name(&eval.id),
            format!("llm-as-judge evaluator for eval {}", eval.id),
        ));
    }
    if !judges.is_empty() {
        desired.push((
            ResourceKind::OnlineEvalConfig,
            names::online_eval_name(pack_id),
            "online evaluation wiring".to_string(),
        ));
    }

    desired
}

/// Diff desired against prior, producing the change list and summary.
pub fn plan(
    pack: &Pack,
    config: &DeployConfig,
    prior: &BTreeMap<ResourceKey, ResourceState>,
) -> (Vec<ResourceChange>, String) {
    let desired = desired_resources(pack, config);
    let mut changes = Vec::with_capacity(desired.len());

    for (kind, name, detail) in &desired {
        let action = if prior.is_empty() {
            ResourceAction::Create
        } else if prior.contains_key(&(kind.clone(), name.clone())) {
            ResourceAction::Update
        } else {
            ResourceAction::Create
        };
        changes.push(ResourceChange {
            kind: kind.clone(),
            name: name.clone(),
            action,
            detail: detail.clone(),
        });
    }

    // Prior-only keys become deletes, sorted by key for determinism.
    let mut deletes: Vec<&ResourceState> = prior
        .values()
        .filter(|rs| {
            !desired
                .iter()
                .any(|(kind, name, _)| *kind == rs.kind && *name == rs.name)
        })
        .collect();
    deletes.sort_by(|a, b| {
        (a.kind.as_str(), a.name.as_str()).cmp(&(b.kind.as_str(), b.name.as_str()))
    });
    for rs in deletes {
        changes.push(ResourceChange {
            kind: rs.kind.clone(),
            name: rs.name.clone(),
            action: ResourceAction::Delete,
            detail: "no longer present in the pack".to_string(),
        });
    }

    let creates = count(&changes, ResourceAction::Create);
    let updates = count(&changes, ResourceAction::Update);
    let deletes = count(&changes, ResourceAction::Delete);
    let summary = format!("Plan: {creates} to create, {updates} to update, {deletes} to delete");

    (changes, summary)
}

fn count(changes: &[ResourceChange], action: ResourceAction) -> usize {
    changes.iter().filter(|c| c.action == action).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use packdock_core::state::ResourceStatus;

    fn pack() -> Pack {
        serde_json::from_str(
            r#"{"id": "mypack", "version": "v1.0.0",
                "prompts": {"chat": {}},
                "tools": {"lookup": {}}}"#,
        )
        .unwrap()
    }

    #[test]
    fn fresh_plan_is_all_creates() {
        let (changes, summary) = plan(&pack(), &DeployConfig::default(), &BTreeMap::new());
        assert_eq!(changes.len(), 2);
        assert!(changes
            .iter()
            .all(|c| c.action == ResourceAction::Create));
        assert_eq!(summary, "Plan: 2 to create, 0 to update, 0 to delete");
    }

    #[test]
    fn prior_keys_update_and_orphans_delete() {
        let mut prior = BTreeMap::new();
        prior.insert(
            (ResourceKind::AgentRuntime, "mypack".to_string()),
            ResourceState {
                kind: ResourceKind::AgentRuntime,
                name: "mypack".into(),
                arn: "arn".into(),
                status: ResourceStatus::Created,
                metadata: BTreeMap::new(),
            },
        );
        prior.insert(
            (ResourceKind::Evaluator, "old_eval".to_string()),
            ResourceState {
                kind: ResourceKind::Evaluator,
                name: "old_eval".into(),
                arn: "arn2".into(),
                status: ResourceStatus::Created,
                metadata: BTreeMap::new(),
            },
        );

        let (changes, summary) = plan(&pack(), &DeployConfig::default(), &prior);
        let runtime = changes
            .iter()
            .find(|c| c.kind == ResourceKind::AgentRuntime)
            .unwrap();
        assert_eq!(runtime.action, ResourceAction::Update);
        let delete = changes
            .iter()
            .find(|c| c.action == ResourceAction::Delete)
            .unwrap();
        assert_eq!(delete.name, "old_eval");
        assert_eq!(summary, "Plan: 1 to create, 1 to update, 1 to delete");
    }

    #[test]
    fn plan_is_deterministic() {
        let config = DeployConfig::default();
        let (a, _) = plan(&pack(), &config, &BTreeMap::new());
        let (b, _) = plan(&pack(), &config, &BTreeMap::new());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn every_desired_key_appears_exactly_once() {
        let (changes, _) = plan(&pack(), &DeployConfig::default(), &BTreeMap::new());
        let mut keys: Vec<String> = changes
            .iter()
            .map(|c| format!("{}/{}", c.kind, c.name))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), changes.len());
    }
}
