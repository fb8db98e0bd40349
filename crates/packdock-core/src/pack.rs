//! Prompt-pack input model.
//!
//! The pack is produced by the host's pack-parsing library and arrives as
//! JSON; these types decode it. All maps are `BTreeMap` so that iteration
//! order — and therefore plan output — is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Eval type that produces a managed evaluator resource.
pub const LLM_AS_JUDGE: &str = "llm_as_judge";

/// Prefix marking a platform-builtin evaluator reference.
pub const BUILTIN_EVAL_PREFIX: &str = "builtin.";

/// A declarative description of an agent system: prompts, tools, agents
/// and evals. Read-only input to the adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pack {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub prompts: BTreeMap<String, Prompt>,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolSpec>,
    #[serde(default)]
    pub agents: Option<AgentsConfig>,
    #[serde(default)]
    pub evals: Vec<EvalDef>,
}

impl Pack {
    pub fn from_json(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }

    /// The pack id, substituting `"default"` for an empty one.
    pub fn effective_id(&self) -> &str {
        if self.id.is_empty() {
            "default"
        } else {
            &self.id
        }
    }

    pub fn is_multi_agent(&self) -> bool {
        self.agents.is_some()
    }

    /// Runtime names this pack deploys: the agent members for a
    /// multi-agent pack, otherwise the pack id itself.
    pub fn member_names(&self) -> Vec<String> {
        match &self.agents {
            Some(agents) => agents.members.clone(),
            None => vec![self.effective_id().to_string()],
        }
    }

    /// Prompts carrying a non-empty tool blocklist, in name order.
    pub fn prompts_with_blocklist(&self) -> impl Iterator<Item = (&String, &Prompt)> {
        self.prompts.iter().filter(|(_, p)| {
            p.tool_policy
                .as_ref()
                .is_some_and(|tp| !tp.blocklist.is_empty())
        })
    }

    /// Evals that compile to a managed evaluator resource.
    pub fn judge_evals(&self) -> impl Iterator<Item = &EvalDef> {
        self.evals.iter().filter(|e| e.eval_type == LLM_AS_JUDGE)
    }

    /// Builtin evaluator ids referenced by the pack. These never produce a
    /// managed evaluator but are wired into the online eval config.
    pub fn builtin_eval_ids(&self) -> Vec<String> {
        self.evals
            .iter()
            .filter(|e| e.eval_type != LLM_AS_JUDGE && e.id.starts_with(BUILTIN_EVAL_PREFIX))
            .map(|e| e.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub validators: Vec<ValidatorConfig>,
    #[serde(default)]
    pub tool_policy: Option<ToolPolicy>,
}

/// Declarative tool policy attached to a prompt. Only the blocklist
/// compiles to platform policies; the round/call limits are enforced at
/// runtime by the agent harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPolicy {
    #[serde(default)]
    pub blocklist: Vec<String>,
    #[serde(default)]
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub max_tool_calls_per_turn: Option<u32>,
}

/// Output validators attached to a prompt. Runtime-enforced; carried here
/// only so the pack round-trips intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidatorConfig {
    BannedWords {
        #[serde(default)]
        words: Vec<String>,
    },
    MaxLength {
        limit: usize,
    },
    RegexMatch {
        pattern: String,
    },
    JsonSchema {
        schema: Value,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// Multi-agent topology: one entry agent plus the full member list
/// (the entry is conventionally also a member).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    pub entry: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalDef {
    pub id: String,
    #[serde(rename = "type")]
    pub eval_type: String,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub params: EvalParams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalParams {
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub rating_scale_size: Option<u32>,
    #[serde(default)]
    pub sample_percentage: Option<f64>,
}
