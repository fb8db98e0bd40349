//! Memory pre-step.
//!
//! At most one memory store per pack. Its ARN feeds the runtime env as
//! `MEMORY_ID` so every agent in the pack shares it.

use std::collections::BTreeMap;

use packdock_core::event::ResourceAction;
use packdock_core::names;
use packdock_core::state::{ResourceKind, ResourceState, ResourceStatus};

use crate::orchestrate::{ApplyCx, PhaseResult};
use crate::platform::MemorySpec;
use crate::progress::{percent, Band};

pub(crate) async fn run(cx: &mut ApplyCx<'_, '_>) -> PhaseResult {
    let mut result = PhaseResult::default();

    let settings = match cx.config.memory_settings() {
        Ok(Some(settings)) => settings,
        // Validation already ran; nothing configured means nothing to do.
        _ => return result,
    };

    let kind = ResourceKind::Memory;
    let name = names::memory_name(cx.pack.effective_id());
    let spec = MemorySpec {
        strategies: settings.strategies.clone(),
        event_expiry_days: settings.event_expiry_days,
        encryption_key_arn: settings.encryption_key_arn.clone(),
        tags: cx.tags(),
    };

    if let Err(abort) = cx.emit_progress("Creating", &kind, &name, percent(Band::Tools, 0, 1)) {
        result.aborted = Some(abort);
        return result;
    }

    match cx.client.ensure_memory(cx.ctx, &name, spec).await {
        Ok(created) => {
            cx.config
                .runtime_env_vars
                .insert(super::ENV_MEMORY_ID.to_string(), created.arn.clone());

            let mut metadata = BTreeMap::new();
            metadata.insert("id".to_string(), created.id);
            metadata.insert(
                "strategies".to_string(),
                settings
                    .strategies
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            );
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
