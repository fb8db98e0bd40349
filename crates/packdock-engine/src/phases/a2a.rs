//! Agent-to-agent wiring (multi-agent packs only).
//!
//! Two steps. **Injection** builds the member-name → runtime-ARN map over
//! every runtime that landed successfully, serializes it into
//! `A2A_AGENTS`, and updates the *entry* agent a second time with the
//! enriched env. **Wiring** records one `a2a_endpoint` resource per
//! member; the platform does no real work for these, but they appear in
//! state for the destroy path.
//!
//! Note the map is injected into the entry agent only — preserved from
//! the original design; revisit if member agents ever need it too.

use std::collections::BTreeMap;

use packdock_core::event::ResourceAction;
use packdock_core::names;
use packdock_core::state::{ResourceKind, ResourceState, ResourceStatus};

use crate::orchestrate::{ApplyCx, PhaseResult};
use crate::progress::{percent, Band};

/// Build the endpoint map and update the entry agent's env with it.
pub(crate) async fn inject(cx: &mut ApplyCx<'_, '_>, runtimes: &[ResourceState]) -> PhaseResult {
    let mut result = PhaseResult::default();
    let Some(agents) = cx.pack.agents.clone() else {
        return result;
    };

    let endpoint_map: BTreeMap<String, String> = runtimes
        .iter()
        .filter(|rs| {
            rs.kind == ResourceKind::AgentRuntime
                && matches!(rs.status, ResourceStatus::Created | ResourceStatus::Updated)
                && agents.members.contains(&rs.name)
        })
        .map(|rs| (rs.name.clone(), rs.arn.clone()))
        .collect();

    let Some(entry_arn) = endpoint_map.get(&agents.entry).cloned() else {
        // Entry agent never came up; nothing to inject into.
        tracing::warn!(
            entry = %agents.entry,
            "entry agent has no runtime ARN; skipping a2a endpoint injection"
        );
        return result;
    };

    let serialized = match serde_json::to_string(&endpoint_map) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "endpoint map serialization failed");
            return result;
        }
    };
    cx.config
        .runtime_env_vars
        .insert(super::ENV_A2A_AGENTS.to_string(), serialized);

    let kind = ResourceKind::AgentRuntime;
    if let Err(abort) = cx.emit_progress(
        "Updating",
        &kind,
        &agents.entry,
        percent(Band::A2a, 0, 1),
    ) {
        result.aborted = Some(abort);
        return result;
    }

    let spec = super::runtime_spec(cx, &agents.entry);
    match cx
        .client
        .update_runtime(cx.ctx, &entry_arn, &agents.entry, spec)
        .await
    {
        Ok(_) => {}
        Err(crate::platform::PlatformError::Cancelled) => {
            result.errors.push(packdock_core::error::DeployError::new(
                "update",
                kind.as_str(),
                &agents.entry,
                "operation cancelled",
                None,
            ));
            result.cancelled = true;
        }
        // The runtime itself already landed; a failed env injection folds
        // into the chain without a second state entry for the entry agent.
        Err(e) => {
            let deploy_error = packdock_core::error::DeployError::new(
                "update",
                kind.as_str(),
                &agents.entry,
                e.to_string(),
                None,
            );
            tracing::error!(entry = %agents.entry, error = %deploy_error, "a2a endpoint injection failed");
            if let Err(abort) =
                cx.emit(packdock_core::event::Event::error(deploy_error.to_string()))
            {
                result.aborted = Some(abort);
            }
            result.errors.push(deploy_error);
        }
    }

    result
}

/// Record the per-member a2a endpoints.
pub(crate) async fn wiring(cx: &mut ApplyCx<'_, '_>, runtimes: &[ResourceState]) -> PhaseResult {
    let mut result = PhaseResult::default();
    let Some(agents) = cx.pack.agents.clone() else {
        return result;
    };
    let total = agents.members.len();

    for (i, member) in agents.members.iter().enumerate() {
        let kind = ResourceKind::A2aEndpoint;
        let name = names::a2a_endpoint_name(member);

        if let Err(abort) =
            cx.emit_progress("Creating", &kind, &name, percent(Band::A2a, i, total))
        {
            result.aborted = Some(abort);
            return result;
        }

        let runtime_arn = runtimes
            .iter()
            .find(|rs| rs.kind == ResourceKind::AgentRuntime && rs.name == *member)
            .map(|rs| rs.arn.clone())
            .unwrap_or_default();

        match cx
            .client
            .ensure_a2a_endpoint(cx.ctx, member, &runtime_arn)
            .await
        {
            Ok(created) => {
                let mut metadata = BTreeMap::new();
                metadata.insert("id".to_string(), created.id);
                metadata.insert("runtime".to_string(), member.clone());
                if !runtime_arn.is_empty() {
                    metadata.insert("runtime_arn".to_string(), runtime_arn);
                }
                result.record(
                    cx,
                    ResourceState {
                        kind,
                        name,
                        arn: created.arn,
                        status: ResourceStatus::Created,
                        metadata,
                    },
                    ResourceAction::Create,
                );
            }
            Err(e) => result.record_failure(cx, "create", &kind, &name, &e),
        }

        if result.aborted.is_some() || result.cancelled {
            return result;
        }
    }

    result
}
