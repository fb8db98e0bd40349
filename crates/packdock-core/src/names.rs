//! Derived resource names.
//!
//! Every platform resource name is derived from pack and config
//! identifiers and must match the platform pattern. Validation runs once,
//! before any platform call; a single bad name fails the whole request.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::DeployConfig;
use crate::pack::Pack;
use crate::state::ResourceKind;

/// Platform name constraint for every derived resource name.
pub const NAME_PATTERN: &str = "^[a-zA-Z][a-zA-Z0-9_]{0,47}$";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(NAME_PATTERN).expect("name regex"));

pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

pub fn memory_name(pack_id: &str) -> String {
    format!("{pack_id}_memory")
}

pub fn policy_engine_name(prompt: &str) -> String {
    format!("{prompt}_policy_engine")
}

pub fn tool_gateway_name(tool: &str) -> String {
    format!("{tool}_tool_gw")
}

pub fn a2a_endpoint_name(member: &str) -> String {
    format!("{member}_a2a")
}

pub fn agents_gateway_name(entry: &str) -> String {
    format!("{entry}_gateway")
}

pub fn evaluator_name(eval_id: &str) -> String {
    format!("{eval_id}_eval")
}

pub fn online_eval_name(pack_id: &str) -> String {
    format!("{pack_id}_online_eval")
}

/// The full set of names an apply of this pack+config will use, paired
/// with the kind each belongs to. The multi-agent `<entry>_gateway` name
/// is reserved alongside the managed kinds.
pub fn collect_derived_names(pack: &Pack, config: &DeployConfig) -> Vec<(ResourceKind, String)> {
    let pack_id = pack.effective_id();
    let mut names = Vec::new();

    if config.memory_store.is_some() {
        names.push((ResourceKind::Memory, memory_name(pack_id)));
    }

    for (prompt, _) in pack.prompts_with_blocklist() {
        names.push((ResourceKind::CedarPolicy, policy_engine_name(prompt)));
    }

    for tool in pack.tools.keys() {
        names.push((ResourceKind::ToolGateway, tool_gateway_name(tool)));
    }

    for member in pack.member_names() {
        names.push((ResourceKind::AgentRuntime, member));
    }

    if let Some(agents) = &pack.agents {
        for member in &agents.members {
            names.push((ResourceKind::A2aEndpoint, a2a_endpoint_name(member)));
        }
        names.push((
            ResourceKind::Other("gateway".into()),
            agents_gateway_name(&agents.entry),
        ));
    }

    let judges: Vec<_> = pack.judge_evals().collect();
    for eval in &judges {
        names.push((ResourceKind::Evaluator, evaluator_name(&eval.id)));
    }
    if !judges.is_empty() {
        names.push((ResourceKind::OnlineEvalConfig, online_eval_name(pack_id)));
    }

    names
}

/// Validate every derived name, returning all failures.
pub fn validate_derived_names(pack: &Pack, config: &DeployConfig) -> Vec<String> {
    collect_derived_names(pack, config)
        .into_iter()
        .filter(|(_, name)| !is_valid_name(name))
        .map(|(kind, name)| {
            format!("derived {kind} name {name:?} does not match {NAME_PATTERN}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;
    use crate::pack::{AgentsConfig, EvalDef, EvalParams, Prompt, ToolPolicy, ToolSpec};

    fn pack_with_everything() -> Pack {
        let mut pack = Pack {
            id: "mypack".into(),
            version: "v1".into(),
            ..Default::default()
        };
        pack.prompts.insert(
            "chat".into(),
            Prompt {
                tool_policy: Some(ToolPolicy {
                    blocklist: vec!["search".into()],
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        pack.tools.insert("lookup".into(), ToolSpec::default());
        pack.agents = Some(AgentsConfig {
            entry: "coordinator".into(),
            members: vec!["coordinator".into(), "worker".into()],
        });
        pack.evals.push(EvalDef {
            id: "quality".into(),
            eval_type: "llm_as_judge".into(),
            trigger: None,
            params: EvalParams::default(),
        });
        pack
    }

    #[test]
    fn derived_names_all_revalidate() {
        let config = DeployConfig {
            memory_store: Some(MemoryStore::Single("episodic".into())),
            ..Default::default()
        };
        let pack = pack_with_everything();
        assert!(validate_derived_names(&pack, &config).is_empty());

        let names: Vec<String> = collect_derived_names(&pack, &config)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert!(names.contains(&"mypack_memory".to_string()));
        assert!(names.contains(&"chat_policy_engine".to_string()));
        assert!(names.contains(&"lookup_tool_gw".to_string()));
        assert!(names.contains(&"coordinator".to_string()));
        assert!(names.contains(&"worker_a2a".to_string()));
        assert!(names.contains(&"coordinator_gateway".to_string()));
        assert!(names.contains(&"quality_eval".to_string()));
        assert!(names.contains(&"mypack_online_eval".to_string()));
    }

    #[test]
    fn hyphenated_ids_fail_validation() {
        let config = DeployConfig::default();
        let pack = Pack {
            id: "my-pack".into(),
            ..Default::default()
        };
        let errors = validate_derived_names(&pack, &config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("my-pack"));
    }

    #[test]
    fn leading_digit_fails_validation() {
        assert!(!is_valid_name("2fast"));
        assert!(!is_valid_name(""));
        assert!(is_valid_name("ok_name_47"));
        // 48 chars is the cap
        assert!(is_valid_name(&format!("a{}", "b".repeat(47))));
        assert!(!is_valid_name(&format!("a{}", "b".repeat(48))));
    }
}
