//! Adapter state: the opaque blob round-tripped through the host.
//!
//! The host persists the serialized `AdapterState` string between apply,
//! status, and destroy calls and never looks inside it. Malformed or empty
//! prior state decodes to "nothing deployed" — stale state must not block
//! a fresh apply.

use std::collections::BTreeMap;
use std::fmt;

use jiff::Timestamp;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Composite key addressing one resource in state.
pub type ResourceKey = (ResourceKind, String);

/// Every resource kind the adapter manages. `Other` keeps kinds written by
/// a newer adapter version round-tripping (and deletable) instead of
/// failing the decode.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Memory,
    CedarPolicy,
    ToolGateway,
    AgentRuntime,
    A2aEndpoint,
    Evaluator,
    OnlineEvalConfig,
    Other(String),
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Memory => "memory",
            Self::CedarPolicy => "cedar_policy",
            Self::ToolGateway => "tool_gateway",
            Self::AgentRuntime => "agent_runtime",
            Self::A2aEndpoint => "a2a_endpoint",
            Self::Evaluator => "evaluator",
            Self::OnlineEvalConfig => "online_eval_config",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        match s {
            "memory" => Self::Memory,
            "cedar_policy" => Self::CedarPolicy,
            "tool_gateway" => Self::ToolGateway,
            "agent_runtime" => Self::AgentRuntime,
            "a2a_endpoint" => Self::A2aEndpoint,
            "evaluator" => Self::Evaluator,
            "online_eval_config" => Self::OnlineEvalConfig,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Err(de::Error::custom("resource kind must not be empty"));
        }
        Ok(ResourceKind::from(s.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Created,
    Updated,
    Failed,
    Planned,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Failed => "failed",
            Self::Planned => "planned",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deployed (or attempted) resource. `metadata` carries cross-resource
/// linkage such as `policy_engine_id`, `gateway_id`, or a `container_uri`
/// override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default)]
    pub arn: String,
    pub status: ResourceStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ResourceState {
    pub fn key(&self) -> ResourceKey {
        (self.kind.clone(), self.name.clone())
    }
}

/// The serialized prior-state blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterState {
    pub pack_id: String,
    pub version: String,
    pub deployed_at: Timestamp,
    pub resources: Vec<ResourceState>,
}

impl AdapterState {
    pub fn new(pack_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            pack_id: pack_id.into(),
            version: version.into(),
            deployed_at: Timestamp::now(),
            resources: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Index resources by (kind, name). Later duplicates win, matching the
    /// "last write is authoritative" behavior of repeated applies.
    pub fn index(&self) -> BTreeMap<ResourceKey, ResourceState> {
        self.resources
            .iter()
            .map(|r| (r.key(), r.clone()))
            .collect()
    }
}

/// Decode a prior-state blob. Empty input is "nothing deployed"; malformed
/// input is logged and treated the same way.
pub fn parse_prior_state(blob: &str) -> Option<AdapterState> {
    if blob.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<AdapterState>(blob) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(error = %e, "prior state is malformed; treating as empty");
            None
        }
    }
}

/// Keyed view of prior state for the planner and apply path.
pub fn prior_index(blob: &str) -> BTreeMap<ResourceKey, ResourceState> {
    parse_prior_state(blob)
        .map(|s| s.index())
        .unwrap_or_default()
}
