//! Apply phases, one module per step of the pipeline.
//!
//! Each phase iterates its resources in deterministic order, streams
//! progress/resource/error events through the orchestrator's context, and
//! accumulates partial failures into its [`PhaseResult`].

pub(crate) mod a2a;
pub(crate) mod evaluators;
pub(crate) mod memory;
pub(crate) mod online_eval;
pub(crate) mod policies;
pub(crate) mod runtimes;
pub(crate) mod tools;

use crate::orchestrate::ApplyCx;
use crate::platform::RuntimeSpec;

pub(crate) const ENV_MEMORY_ID: &str = "MEMORY_ID";
pub(crate) const ENV_POLICY_ENGINE_ARN: &str = "POLICY_ENGINE_ARN";
pub(crate) const ENV_A2A_AGENTS: &str = "A2A_AGENTS";

/// Build the runtime spec for one member: per-agent env overrides first,
/// then the pack identity vars, then the cross-phase env (memory, policy
/// engine, a2a map) — the cross-phase values always win.
pub(crate) fn runtime_spec(cx: &ApplyCx<'_, '_>, member: &str) -> RuntimeSpec {
    let overrides = cx.config.agent_overrides.get(member);

    let mut env = overrides.map(|o| o.env.clone()).unwrap_or_default();
    env.insert("PACK_ID".to_string(), cx.pack.effective_id().to_string());
    env.insert("PACK_VERSION".to_string(), cx.pack.version.clone());
    env.insert("AGENT_NAME".to_string(), member.to_string());
    env.extend(cx.config.runtime_env_vars.clone());

    let container_uri = cx.config.container_image_for(member).or_else(|| {
        cx.prior
            .get(&(
                packdock_core::state::ResourceKind::AgentRuntime,
                member.to_string(),
            ))
            .and_then(|rs| rs.metadata.get("container_uri").cloned())
    });

    let protocol = overrides
        .and_then(|o| o.protocol)
        .or(cx.config.protocol)
        .or_else(|| {
            cx.pack
                .is_multi_agent()
                .then_some(packdock_core::config::Protocol::A2a)
        });

    RuntimeSpec {
        role_arn: cx.config.runtime_role_arn.clone(),
        container_uri,
        env,
        protocol,
        tags: cx.tags(),
    }
}
