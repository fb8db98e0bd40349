//! Reverse-order teardown.
//!
//! Kinds are destroyed dependents-first: cedar policies (and their
//! engines), evaluators, the online eval config, a2a endpoints, runtimes,
//! gateway targets (then the parent gateways), and memory last. Failures
//! are reported as `error` events but never abort — teardown is
//! best-effort. Only a callback abort or cancellation stops the walk.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;

use packdock_core::arn::extract_resource_id;
use packdock_core::error::DeployError;
use packdock_core::event::{Event, EventResource, ResourceAction};
use packdock_core::state::{parse_prior_state, ResourceKind, ResourceState};

use crate::orchestrate::{CallbackError, EventSink};
use crate::platform::{PlatformClient, PlatformError, RemoteStatus};

/// Teardown order, dependents before dependencies. Memory stays last —
/// it has no downstream consumers, so last is the conservative spot.
const DESTROY_ORDER: [ResourceKind; 7] = [
    ResourceKind::CedarPolicy,
    ResourceKind::Evaluator,
    ResourceKind::OnlineEvalConfig,
    ResourceKind::A2aEndpoint,
    ResourceKind::AgentRuntime,
    ResourceKind::ToolGateway,
    ResourceKind::Memory,
];

#[derive(Debug, Default)]
pub struct DestroyOutcome {
    pub aborted: Option<CallbackError>,
    pub cancelled: bool,
}

pub async fn destroy(
    client: &PlatformClient,
    prior_blob: &str,
    ctx: &CancellationToken,
    sink: &mut EventSink<'_>,
) -> DestroyOutcome {
    let mut outcome = DestroyOutcome::default();

    let Some(state) = parse_prior_state(prior_blob) else {
        if let Err(abort) = sink(&Event::progress("No resources to destroy")) {
            outcome.aborted = Some(abort);
            return outcome;
        }
        if let Err(abort) = sink(&Event::complete()) {
            outcome.aborted = Some(abort);
        }
        return outcome;
    };

    tracing::info!(
        pack_id = %state.pack_id,
        resources = state.resources.len(),
        "starting destroy"
    );

    let total = state.resources.len().max(1);
    let mut done = 0usize;
    let mut gateways = BTreeSet::new();

    for kind in &DESTROY_ORDER {
        for rs in state.resources.iter().filter(|rs| rs.kind == *kind) {
            done += 1;
            let pct = (100 * done / total) as u32;
            if let Err(abort) = sink(&Event::progress(crate::progress::message(
                "Deleting",
                kind.as_str(),
                &rs.name,
                pct,
            ))) {
                outcome.aborted = Some(abort);
                return outcome;
            }

            if let Some(gateway_id) = rs.metadata.get("gateway_id") {
                gateways.insert(gateway_id.clone());
            }

            match delete_resource(client, ctx, rs).await {
                Ok(()) => {
                    if let Err(abort) = sink(&resource_deleted(rs)) {
                        outcome.aborted = Some(abort);
                        return outcome;
                    }
                }
                Err(PlatformError::Cancelled) => {
                    outcome.cancelled = true;
                    return outcome;
                }
                Err(e) => {
                    let deploy_error = DeployError::new(
                        "delete",
                        kind.as_str(),
                        &rs.name,
                        e.to_string(),
                        None,
                    );
                    tracing::error!(kind = %kind, name = %rs.name, error = %deploy_error, "delete failed");
                    if let Err(abort) = sink(&Event::error(deploy_error.to_string())) {
                        outcome.aborted = Some(abort);
                        return outcome;
                    }
                }
            }
        }

        // Once every target of this apply is gone, the parent gateways can
        // be purged and removed.
        if *kind == ResourceKind::ToolGateway {
            for gateway_id in &gateways {
                match client.delete_gateway_purging(ctx, gateway_id).await {
                    Ok(()) => {}
                    Err(PlatformError::Cancelled) => {
                        outcome.cancelled = true;
                        return outcome;
                    }
                    Err(e) => {
                        let deploy_error = DeployError::new(
                            "delete",
                            "tool_gateway",
                            gateway_id,
                            e.to_string(),
                            None,
                        );
                        if let Err(abort) = sink(&Event::error(deploy_error.to_string())) {
                            outcome.aborted = Some(abort);
                            return outcome;
                        }
                    }
                }
            }
        }
    }

    // Kinds this adapter version does not know still complete the stream.
    for rs in state
        .resources
        .iter()
        .filter(|rs| matches!(rs.kind, ResourceKind::Other(_)))
    {
        tracing::warn!(kind = %rs.kind, name = %rs.name, "unknown resource kind; skipping delete");
        if let Err(abort) = sink(&resource_deleted(rs)) {
            outcome.aborted = Some(abort);
            return outcome;
        }
    }

    if let Err(abort) = sink(&Event::complete()) {
        outcome.aborted = Some(abort);
    }
    outcome
}

fn resource_deleted(rs: &ResourceState) -> Event {
    Event::resource(EventResource {
        kind: rs.kind.as_str().to_string(),
        name: rs.name.clone(),
        action: ResourceAction::Delete,
        status: "deleted".to_string(),
        detail: None,
    })
}

fn platform_id(rs: &ResourceState, arn_prefix: &str) -> Option<String> {
    rs.metadata
        .get("id")
        .cloned()
        .or_else(|| extract_resource_id(&rs.arn, arn_prefix).map(str::to_string))
}

async fn delete_resource(
    client: &PlatformClient,
    ctx: &CancellationToken,
    rs: &ResourceState,
) -> Result<(), PlatformError> {
    match &rs.kind {
        ResourceKind::CedarPolicy => {
            let Some(engine_id) = rs
                .metadata
                .get("policy_engine_id")
                .cloned()
                .or_else(|| platform_id(rs, "policy-engine"))
            else {
                // A failed create never got an engine; nothing to delete.
                return Ok(());
            };
            // Explicitly recorded children first, then the retrying engine
            // delete purges whatever the platform generated on its own.
            if let Some(ids) = rs.metadata.get("policy_id") {
                for policy_id in ids.split(',').filter(|s| !s.is_empty()) {
                    client.purge_policy(ctx, &engine_id, policy_id).await?;
                }
            }
            client.delete_policy_engine_retrying(ctx, &engine_id).await
        }
        ResourceKind::Evaluator => match platform_id(rs, "evaluator") {
            Some(id) => client.delete_evaluator(&id).await,
            None => Ok(()),
        },
        ResourceKind::OnlineEvalConfig => match platform_id(rs, "online-eval") {
            Some(id) => client.delete_online_eval_config(&id).await,
            None => Ok(()),
        },
        // Synthetic: nothing on the platform side.
        ResourceKind::A2aEndpoint => Ok(()),
        ResourceKind::AgentRuntime => match platform_id(rs, "runtime") {
            Some(id) => client.delete_runtime(&id).await,
            None => Ok(()),
        },
        ResourceKind::ToolGateway => {
            let (Some(gateway_id), Some(target_id)) =
                (rs.metadata.get("gateway_id"), platform_id(rs, "target"))
            else {
                return Ok(());
            };
            client.delete_gateway_target(ctx, gateway_id, &target_id).await
        }
        ResourceKind::Memory => {
            let Some(id) = platform_id(rs, "memory") else {
                return Ok(());
            };
            match client.memory_status(&id).await {
                // Already on its way out.
                Ok(RemoteStatus::Deleting) => return Ok(()),
                Ok(RemoteStatus::Creating) => {
                    client.wait_memory_settled(ctx, &id).await?;
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            }
            client.delete_memory(&id).await
        }
        ResourceKind::Other(_) => Ok(()),
    }
}
