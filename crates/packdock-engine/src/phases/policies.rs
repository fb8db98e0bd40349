//! Policy engines and cedar policies.
//!
//! One engine per prompt with a non-empty blocklist, plus one platform
//! policy per compiled statement. Engines are associated with the gateway
//! only after every tool target is registered — the engine's
//! admissible-action schema is derived from gateway state — which is why
//! this phase runs after the tools phase and performs association last.

use std::collections::{BTreeMap, BTreeSet};

use packdock_core::error::DeployError;
use packdock_core::event::{Event, ResourceAction};
use packdock_core::names;
use packdock_core::state::{ResourceKind, ResourceState, ResourceStatus};

use crate::orchestrate::{ApplyCx, PhaseResult};
use crate::platform::{PlatformError, PolicyEngineSpec};
use crate::policy;
use crate::progress::{percent, Band};

pub(crate) async fn run(cx: &mut ApplyCx<'_, '_>, registered_tools: &BTreeSet<String>) -> PhaseResult {
    let mut result = PhaseResult::default();

    let prompts: Vec<(String, Vec<String>)> = cx
        .pack
        .prompts_with_blocklist()
        .map(|(name, prompt)| {
            let blocklist = prompt
                .tool_policy
                .as_ref()
                .map(|tp| tp.blocklist.clone())
                .unwrap_or_default();
            (name.clone(), blocklist)
        })
        .collect();
    let total = prompts.len();
    if total == 0 {
        return result;
    }

    let gateway = cx.client.gateway();
    let mut engine_arns = Vec::new();

    for (i, (prompt, blocklist)) in prompts.iter().enumerate() {
        let kind = ResourceKind::CedarPolicy;
        let name = names::policy_engine_name(prompt);

        if let Err(abort) =
            cx.emit_progress("Creating", &kind, &name, percent(Band::Policies, i, total))
        {
            result.aborted = Some(abort);
            return result;
        }

        let spec = PolicyEngineSpec {
            gateway_arn: gateway.as_ref().map(|g| g.arn.clone()),
            tags: cx.tags(),
        };

        let engine = match cx.client.ensure_policy_engine(cx.ctx, &name, spec).await {
            Ok(engine) => engine,
            Err(e) => {
                result.record_failure(cx, "create", &kind, &name, &e);
                if result.aborted.is_some() || result.cancelled {
                    return result;
                }
                continue;
            }
        };

        let statements = policy::compile_blocklist(
            blocklist,
            registered_tools,
            gateway.as_ref().map(|g| g.arn.as_str()).unwrap_or(""),
        );

        let mut policy_ids = Vec::new();
        let mut policy_error: Option<PlatformError> = None;
        for (j, statement) in statements.iter().enumerate() {
            let policy_name = format!("{prompt}_block_{j}");
            match cx
                .client
                .ensure_policy(cx.ctx, &engine.id, &policy_name, statement.clone())
                .await
            {
                Ok(created) => policy_ids.push(created.id),
                Err(e) => {
                    policy_error = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = policy_error {
            result.record_failure(cx, "create", &kind, &name, &e);
            if result.aborted.is_some() || result.cancelled {
                return result;
            }
            continue;
        }

        engine_arns.push(engine.arn.clone());

        let mut metadata = BTreeMap::new();
        metadata.insert("id".to_string(), engine.id.clone());
        metadata.insert("policy_engine_id".to_string(), engine.id);
        metadata.insert("policy_engine_arn".to_string(), engine.arn.clone());
        metadata.insert("policy_id".to_string(), policy_ids.join(","));
        result.record(
            cx,
            ResourceState {
                kind,
                name,
                arn: engine.arn,
                status: ResourceStatus::Created,
                metadata,
            },
            ResourceAction::Create,
        );
        if result.aborted.is_some() {
            return result;
        }
    }

    if !engine_arns.is_empty() {
        cx.config.runtime_env_vars.insert(
            super::ENV_POLICY_ENGINE_ARN.to_string(),
            engine_arns.join(","),
        );
    }

    // Association runs once every engine and every target exists.
    for arn in &engine_arns {
        match cx.client.associate_policy_engine(cx.ctx, arn).await {
            Ok(()) => {}
            Err(PlatformError::Cancelled) => {
                result.errors.push(DeployError::new(
                    "associate",
                    "cedar_policy",
                    arn,
                    "operation cancelled",
                    None,
                ));
                result.cancelled = true;
                return result;
            }
            Err(e) => {
                let deploy_error =
                    DeployError::new("associate", "cedar_policy", arn, e.to_string(), None);
                tracing::error!(engine_arn = %arn, error = %deploy_error, "policy engine association failed");
                if let Err(abort) = cx.emit(Event::error(deploy_error.to_string())) {
                    result.aborted = Some(abort);
                    return result;
                }
                result.errors.push(deploy_error);
            }
        }
    }

    result
}
