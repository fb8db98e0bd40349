//! The apply orchestrator.
//!
//! Drives the phases in strict dependency order, owns the event stream,
//! merges per-phase results, and decides continue-vs-abort. A resource
//! failure never stops the apply — it is folded into the running error
//! chain and later phases still run. Only two things stop it early: the
//! host's callback returning an error, and request cancellation. In every
//! case the state assembled so far is returned so the host can persist it.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use packdock_core::config::{ArenaConfig, DeployConfig};
use packdock_core::error::{DeployError, ErrorChain};
use packdock_core::event::{Event, EventResource, ResourceAction};
use packdock_core::names;
use packdock_core::pack::Pack;
use packdock_core::state::{
    prior_index, AdapterState, ResourceKey, ResourceKind, ResourceState, ResourceStatus,
};
use packdock_core::tags::merge_tags;

use crate::observability;
use crate::phases;
use crate::planner;
use crate::platform::PlatformClient;

/// The host's event callback failed; the stream is aborted.
#[derive(Debug, Clone, Error)]
#[error("event callback failed: {0}")]
pub struct CallbackError(pub String);

pub type EventSink<'a> = dyn FnMut(&Event) -> Result<(), CallbackError> + Send + 'a;

/// What an apply (or dry run) produced. `state` must be persisted by the
/// host regardless of `error`.
#[derive(Debug)]
pub struct ApplyOutcome {
    pub state: AdapterState,
    pub error: Option<ErrorChain>,
    pub aborted: Option<CallbackError>,
}

/// Everything a phase needs: the platform client, the inputs, prior
/// state, the cancellation signal, and the event sink.
pub(crate) struct ApplyCx<'a, 's> {
    pub client: &'a PlatformClient,
    pub pack: &'a Pack,
    pub config: &'a mut DeployConfig,
    pub arena: &'a ArenaConfig,
    pub prior: &'a BTreeMap<ResourceKey, ResourceState>,
    pub ctx: &'a CancellationToken,
    pub sink: &'a mut EventSink<'s>,
}

impl ApplyCx<'_, '_> {
    pub fn emit(&mut self, event: Event) -> Result<(), CallbackError> {
        (self.sink)(&event)
    }

    pub fn emit_progress(
        &mut self,
        verb: &str,
        kind: &ResourceKind,
        name: &str,
        pct: u32,
    ) -> Result<(), CallbackError> {
        self.emit(Event::progress(crate::progress::message(
            verb,
            kind.as_str(),
            name,
            pct,
        )))
    }

    /// Merged resource tags for this apply.
    pub fn tags(&self) -> BTreeMap<String, String> {
        merge_tags(self.pack.effective_id(), &self.config.tags)
    }
}

/// Accumulated output of one phase.
#[derive(Default)]
pub(crate) struct PhaseResult {
    pub resources: Vec<ResourceState>,
    pub errors: ErrorChain,
    pub aborted: Option<CallbackError>,
    pub cancelled: bool,
}

impl PhaseResult {
    /// Record a successful resource: state first, then the event — a
    /// callback abort must not lose the resource from state.
    pub fn record(
        &mut self,
        cx: &mut ApplyCx<'_, '_>,
        resource: ResourceState,
        action: ResourceAction,
    ) {
        let event = Event::resource(EventResource {
            kind: resource.kind.as_str().to_string(),
            name: resource.name.clone(),
            action,
            status: resource.status.to_string(),
            detail: None,
        });
        self.resources.push(resource);
        if let Err(abort) = cx.emit(event) {
            self.aborted = Some(abort);
        }
    }

    /// Record a per-resource failure: error event, a `failed` state entry
    /// with no ARN (so the destroyer still sees it), and the chain entry.
    /// Cancellation instead stops the apply without a failed entry.
    pub fn record_failure(
        &mut self,
        cx: &mut ApplyCx<'_, '_>,
        operation: &str,
        kind: &ResourceKind,
        name: &str,
        error: &crate::platform::PlatformError,
    ) {
        if matches!(error, crate::platform::PlatformError::Cancelled) {
            self.errors.push(DeployError::new(
                operation,
                kind.as_str(),
                name,
                "operation cancelled",
                None,
            ));
            self.cancelled = true;
            return;
        }

        let deploy_error =
            DeployError::new(operation, kind.as_str(), name, error.to_string(), None);
        tracing::error!(kind = %kind, name, error = %deploy_error, "resource operation failed");

        if let Err(abort) = cx.emit(Event::error(deploy_error.to_string())) {
            self.aborted = Some(abort);
        }
        self.resources.push(ResourceState {
            kind: kind.clone(),
            name: name.to_string(),
            arn: String::new(),
            status: ResourceStatus::Failed,
            metadata: BTreeMap::new(),
        });
        self.errors.push(deploy_error);
    }
}

struct Totals {
    resources: Vec<ResourceState>,
    errors: ErrorChain,
}

impl Totals {
    fn new() -> Self {
        Self {
            resources: Vec::new(),
            errors: ErrorChain::new(),
        }
    }

    /// Merge a phase result. `Some(..)` means stop now: a callback abort
    /// (carrying the error) or cancellation (carrying `None`).
    fn absorb(&mut self, result: PhaseResult) -> Option<Option<CallbackError>> {
        self.resources.extend(result.resources);
        self.errors.absorb(result.errors);
        if let Some(abort) = result.aborted {
            return Some(Some(abort));
        }
        if result.cancelled {
            return Some(None);
        }
        None
    }

    fn finish(self, pack: &Pack, aborted: Option<CallbackError>) -> ApplyOutcome {
        let mut state = AdapterState::new(pack.effective_id(), pack.version.clone());
        state.resources = self.resources;
        ApplyOutcome {
            state,
            error: self.errors.into_option(),
            aborted,
        }
    }
}

/// Run a full apply.
///
/// Fatal input problems (config validation, derived-name validation)
/// return `Err` before any platform call; everything after that returns
/// an [`ApplyOutcome`] whose state the host must persist.
pub async fn apply(
    client: &PlatformClient,
    pack: &Pack,
    config: &mut DeployConfig,
    arena: &ArenaConfig,
    prior_blob: &str,
    ctx: &CancellationToken,
    sink: &mut EventSink<'_>,
) -> Result<ApplyOutcome, DeployError> {
    let mut problems = config.validate();
    problems.extend(names::validate_derived_names(pack, config));
    if !problems.is_empty() {
        return Err(DeployError::configuration(problems.join("; ")));
    }

    let prior = prior_index(prior_blob);

    if config.dry_run {
        return Ok(dry_run_apply(pack, config, &prior, sink));
    }

    tracing::info!(
        pack_id = pack.effective_id(),
        version = %pack.version,
        prior = prior.len(),
        "starting apply"
    );

    let mut cx = ApplyCx {
        client,
        pack,
        config,
        arena,
        prior: &prior,
        ctx,
        sink,
    };
    let mut totals = Totals::new();

    // 1. Memory
    let result = phases::memory::run(&mut cx).await;
    if let Some(stop) = totals.absorb(result) {
        return Ok(totals.finish(pack, stop));
    }

    // 2. Tool gateway targets
    let result = phases::tools::run(&mut cx).await;
    let registered: BTreeSet<String> = result
        .resources
        .iter()
        .filter(|r| r.status != ResourceStatus::Failed)
        .filter_map(|r| r.metadata.get("tool").cloned())
        .collect();
    if let Some(stop) = totals.absorb(result) {
        return Ok(totals.finish(pack, stop));
    }

    // 3. Policy engines + cedar policies
    let result = phases::policies::run(&mut cx, &registered).await;
    if let Some(stop) = totals.absorb(result) {
        return Ok(totals.finish(pack, stop));
    }

    // 4. Agent runtimes
    let result = phases::runtimes::run(&mut cx).await;
    let runtime_states = result.resources.clone();
    if let Some(stop) = totals.absorb(result) {
        return Ok(totals.finish(pack, stop));
    }

    // 5 + 6. A2A endpoint injection and wiring (multi-agent only)
    if pack.is_multi_agent() {
        let result = phases::a2a::inject(&mut cx, &runtime_states).await;
        if let Some(stop) = totals.absorb(result) {
            return Ok(totals.finish(pack, stop));
        }

        let result = phases::a2a::wiring(&mut cx, &runtime_states).await;
        if let Some(stop) = totals.absorb(result) {
            return Ok(totals.finish(pack, stop));
        }
    }

    // 7. Evaluators
    let result = phases::evaluators::run(&mut cx).await;
    let evaluator_states = result.resources.clone();
    if let Some(stop) = totals.absorb(result) {
        return Ok(totals.finish(pack, stop));
    }

    // 8. Online eval config
    let result = phases::online_eval::run(&mut cx, &evaluator_states).await;
    if let Some(stop) = totals.absorb(result) {
        return Ok(totals.finish(pack, stop));
    }

    // Observability supplement: publish the dashboard when tracing is on.
    // Never fatal.
    if cx
        .config
        .observability
        .as_ref()
        .is_some_and(|o| o.tracing_enabled)
    {
        let body = observability::build_dashboard(pack, cx.config, &totals.resources);
        let name = format!("{}-packdock", pack.effective_id());
        if let Err(e) = client.put_dashboard(&name, body).await {
            tracing::warn!(error = %e, "dashboard publish failed");
        }
    }

    tracing::info!(
        resources = totals.resources.len(),
        failures = totals.errors.len(),
        "apply finished"
    );
    Ok(totals.finish(pack, None))
}

/// Dry run: record the desired set with `planned` status, stream the
/// events, mutate nothing.
fn dry_run_apply(
    pack: &Pack,
    config: &DeployConfig,
    prior: &BTreeMap<ResourceKey, ResourceState>,
    sink: &mut EventSink<'_>,
) -> ApplyOutcome {
    let (changes, summary) = planner::plan(pack, config, prior);
    let mut totals = Totals::new();
    let mut aborted = None;

    if let Err(abort) = sink(&Event::progress(format!("Dry run: {summary} (0%)"))) {
        aborted = Some(abort);
    }

    let planned: Vec<_> = changes
        .iter()
        .filter(|c| c.action != ResourceAction::Delete)
        .collect();
    let total = planned.len();

    for (i, change) in planned.iter().enumerate() {
        if aborted.is_some() {
            break;
        }
        let pct = (100 * (i + 1) / total.max(1)) as u32;
        if let Err(abort) = sink(&Event::progress(crate::progress::message(
            "Planning",
            change.kind.as_str(),
            &change.name,
            pct,
        ))) {
            aborted = Some(abort);
            break;
        }

        let arn = prior
            .get(&(change.kind.clone(), change.name.clone()))
            .map(|rs| rs.arn.clone())
            .unwrap_or_default();
        let resource = ResourceState {
            kind: change.kind.clone(),
            name: change.name.clone(),
            arn,
            status: ResourceStatus::Planned,
            metadata: BTreeMap::new(),
        };
        let event = Event::resource(EventResource {
            kind: resource.kind.as_str().to_string(),
            name: resource.name.clone(),
            action: change.action,
            status: resource.status.to_string(),
            detail: Some(change.detail.clone()),
        });
        totals.resources.push(resource);
        if let Err(abort) = sink(&event) {
            aborted = Some(abort);
            break;
        }
    }

    totals.finish(pack, aborted)
}
