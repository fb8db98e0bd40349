//! Agent runtimes.
//!
//! The only kind with a real update path: a member present in prior state
//! is updated in place and keeps its ARN; everything else is created (or
//! adopted on conflict).

use std::collections::BTreeMap;

use packdock_core::event::ResourceAction;
use packdock_core::state::{ResourceKind, ResourceState, ResourceStatus};

use crate::orchestrate::{ApplyCx, PhaseResult};
use crate::progress::{percent, Band};

pub(crate) async fn run(cx: &mut ApplyCx<'_, '_>) -> PhaseResult {
    let mut result = PhaseResult::default();
    let members = cx.pack.member_names();
    let total = members.len();

    for (i, member) in members.iter().enumerate() {
        let kind = ResourceKind::AgentRuntime;
        let key = (kind.clone(), member.clone());
        let prior_arn = cx
            .prior
            .get(&key)
            .filter(|rs| !rs.arn.is_empty())
            .map(|rs| rs.arn.clone());

        let verb = if prior_arn.is_some() {
            "Updating"
        } else {
            "Creating"
        };
        if let Err(abort) =
            cx.emit_progress(verb, &kind, member, percent(Band::Runtimes, i, total))
        {
            result.aborted = Some(abort);
            return result;
        }

        let spec = super::runtime_spec(cx, member);
        let container_uri = spec.container_uri.clone();

        let outcome = match &prior_arn {
            Some(arn) => cx.client.update_runtime(cx.ctx, arn, member, spec).await,
            None => cx.client.create_runtime(cx.ctx, member, spec).await,
        };

        match outcome {
            Ok(created) => {
                let (status, action) = if prior_arn.is_some() {
                    (ResourceStatus::Updated, ResourceAction::Update)
                } else {
                    (ResourceStatus::Created, ResourceAction::Create)
                };
                let mut metadata = BTreeMap::new();
                metadata.insert("id".to_string(), created.id);
                if let Some(uri) = container_uri {
                    metadata.insert("container_uri".to_string(), uri);
                }
                result.record(
                    cx,
                    ResourceState {
                        kind,
                        name: member.clone(),
                        arn: created.arn,
                        status,
                        metadata,
                    },
                    action,
                );
            }
            Err(e) => {
                let operation = if prior_arn.is_some() { "update" } else { "create" };
                result.record_failure(cx, operation, &kind, member, &e);
            }
        }

        if result.aborted.is_some() || result.cancelled {
            return result;
        }
    }

    result
}
