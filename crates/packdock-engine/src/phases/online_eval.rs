//! Online eval config: the single aggregate wiring traces from a log
//! group into the pack's evaluators on a sampling schedule.

use std::collections::BTreeMap;

use packdock_core::event::ResourceAction;
use packdock_core::names;
use packdock_core::state::{ResourceKind, ResourceState, ResourceStatus};

use crate::orchestrate::{ApplyCx, PhaseResult};
use crate::platform::OnlineEvalSpec;
use crate::progress::{percent, Band};

/// AWS-managed span log group. Never created by the adapter.
const DEFAULT_LOG_GROUP: &str = "aws/spans";

pub(crate) async fn run(cx: &mut ApplyCx<'_, '_>, evaluators: &[ResourceState]) -> PhaseResult {
    let mut result = PhaseResult::default();
    if cx.pack.judge_evals().next().is_none() {
        return result;
    }

    let kind = ResourceKind::OnlineEvalConfig;
    let name = names::online_eval_name(cx.pack.effective_id());

    if let Err(abort) = cx.emit_progress("Creating", &kind, &name, percent(Band::Evaluators, 1, 1))
    {
        result.aborted = Some(abort);
        return result;
    }

    // Custom evaluator ids from this apply, plus any builtin references.
    let mut evaluator_ids: Vec<String> = evaluators
        .iter()
        .filter(|rs| {
            rs.kind == ResourceKind::Evaluator
                && matches!(rs.status, ResourceStatus::Created | ResourceStatus::Updated)
        })
        .filter_map(|rs| {
            rs.metadata.get("id").cloned().or_else(|| {
                packdock_core::arn::extract_resource_id(&rs.arn, "evaluator")
                    .map(str::to_string)
            })
        })
        .collect();
    evaluator_ids.extend(cx.pack.builtin_eval_ids());

    let sample_percentage = cx
        .pack
        .judge_evals()
        .filter_map(|e| e.params.sample_percentage)
        .find(|p| *p > 0.0)
        .unwrap_or(100.0);

    let user_group = cx
        .config
        .observability
        .as_ref()
        .and_then(|o| o.cloudwatch_log_group.clone());
    let log_group = match &user_group {
        Some(group) => {
            // User-configured groups are created on demand; the default
            // aws/spans group is AWS-managed and must never be.
            if let Err(e) = cx.client.ensure_log_group(group).await {
                result.record_failure(cx, "create", &kind, &name, &e);
                return result;
            }
            group.clone()
        }
        None => DEFAULT_LOG_GROUP.to_string(),
    };

    let spec = OnlineEvalSpec {
        evaluator_ids: evaluator_ids.clone(),
        sample_percentage,
        log_group: log_group.clone(),
    };

    match cx.client.ensure_online_eval_config(cx.ctx, &name, spec).await {
        Ok(created) => {
            let mut metadata = BTreeMap::new();
            metadata.insert("id".to_string(), created.id);
            metadata.insert("log_group".to_string(), log_group);
            metadata.insert("evaluators".to_string(), evaluator_ids.join(","));
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

    result
}
