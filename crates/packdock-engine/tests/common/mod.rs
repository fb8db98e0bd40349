//! Shared fixtures for the engine integration tests: pack/config
//! builders, an event collector, and a failure-injecting wrapper around
//! the simulated control plane.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use packdock_core::config::{ArenaConfig, DeployConfig};
use packdock_core::event::Event;
use packdock_core::pack::Pack;
use packdock_engine::orchestrate::CallbackError;
use packdock_engine::platform::{
    BoxFuture, ControlPlane, Created, EvaluatorSpec, GatewaySpec, GatewayTargetSpec,
    GatewayUpdate, MemorySpec, OnlineEvalSpec, PlatformClient, PlatformError, PolicyEngineSpec,
    RemoteResource, RemoteStatus, RuntimeSpec, SimulatedControlPlane,
};
use packdock_engine::ApplyOutcome;

pub const REGION: &str = "us-west-2";
pub const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/test";

pub fn single_agent_pack() -> Pack {
    serde_json::from_str(
        r#"{"id": "mypack", "version": "v1.0.0", "prompts": {"chat": {}}}"#,
    )
    .unwrap()
}

pub fn multi_agent_pack() -> Pack {
    serde_json::from_str(
        r#"{"id": "mypack", "version": "v1.0.0",
            "prompts": {"chat": {}},
            "tools": {"lookup": {}},
            "agents": {"entry": "coordinator", "members": ["coordinator", "worker"]}}"#,
    )
    .unwrap()
}

pub fn config() -> DeployConfig {
    DeployConfig {
        region: REGION.into(),
        runtime_role_arn: ROLE_ARN.into(),
        ..Default::default()
    }
}

pub fn client(plane: Arc<dyn ControlPlane>) -> PlatformClient {
    PlatformClient::new(plane).with_poll_settings(Duration::from_millis(1), 5)
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn collecting_sink(log: EventLog) -> impl FnMut(&Event) -> Result<(), CallbackError> + Send {
    move |event| {
        log.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A sink that fails on the n-th event (1-based), collecting before that.
pub fn aborting_sink(
    log: EventLog,
    fail_at: usize,
) -> impl FnMut(&Event) -> Result<(), CallbackError> + Send {
    let mut seen = 0usize;
    move |event| {
        seen += 1;
        if seen >= fail_at {
            return Err(CallbackError("host went away".into()));
        }
        log.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub async fn run_apply(
    plane: Arc<dyn ControlPlane>,
    pack: &Pack,
    config: &mut DeployConfig,
    prior: &str,
) -> (ApplyOutcome, Vec<Event>) {
    let client = client(plane);
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let mut sink = collecting_sink(log.clone());
    let ctx = CancellationToken::new();
    let outcome = packdock_engine::apply(
        &client,
        pack,
        config,
        &ArenaConfig::default(),
        prior,
        &ctx,
        &mut sink,
    )
    .await
    .expect("apply pre-flight");
    let events = log.lock().unwrap().clone();
    (outcome, events)
}

/// Resource events only, as (kind, name, action, status) tuples.
pub fn resource_events(events: &[Event]) -> Vec<(String, String, String, String)> {
    events
        .iter()
        .filter_map(|e| e.resource.as_ref())
        .map(|r| {
            (
                r.kind.clone(),
                r.name.clone(),
                r.action.as_str().to_string(),
                r.status.clone(),
            )
        })
        .collect()
}

// ── failure injection ───────────────────────────────────────────────────

/// Delegates to the simulator, failing any operation whose name was
/// registered with [`FailingControlPlane::fail_on`].
pub struct FailingControlPlane {
    inner: Arc<SimulatedControlPlane>,
    fail: Mutex<BTreeSet<&'static str>>,
}

impl FailingControlPlane {
    pub fn new(inner: Arc<SimulatedControlPlane>) -> Self {
        Self {
            inner,
            fail: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn fail_on(&self, op: &'static str) {
        self.fail.lock().unwrap().insert(op);
    }

    fn check(&self, op: &'static str) -> Result<(), PlatformError> {
        if self.fail.lock().unwrap().contains(op) {
            Err(PlatformError::Api(format!("injected failure in {op}")))
        } else {
            Ok(())
        }
    }
}

macro_rules! delegate {
    ($this:expr, $op:literal, $call:expr) => {
        Box::pin(async move {
            $this.check($op)?;
            $call.await
        })
    };
}

impl ControlPlane for FailingControlPlane {
    fn create_memory(
        &self,
        name: String,
        spec: MemorySpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(self, "create_memory", self.inner.create_memory(name, spec))
    }

    fn get_memory(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        delegate!(self, "get_memory", self.inner.get_memory(id))
    }

    fn list_memories(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        delegate!(self, "list_memories", self.inner.list_memories())
    }

    fn delete_memory(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(self, "delete_memory", self.inner.delete_memory(id))
    }

    fn create_runtime(
        &self,
        name: String,
        spec: RuntimeSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(self, "create_runtime", self.inner.create_runtime(name, spec))
    }

    fn update_runtime(
        &self,
        arn: String,
        name: String,
        spec: RuntimeSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(self, "update_runtime", self.inner.update_runtime(arn, name, spec))
    }

    fn get_runtime(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        delegate!(self, "get_runtime", self.inner.get_runtime(id))
    }

    fn list_runtimes(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        delegate!(self, "list_runtimes", self.inner.list_runtimes())
    }

    fn delete_runtime(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(self, "delete_runtime", self.inner.delete_runtime(id))
    }

    fn create_gateway(
        &self,
        name: String,
        spec: GatewaySpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(self, "create_gateway", self.inner.create_gateway(name, spec))
    }

    fn update_gateway(
        &self,
        id: String,
        update: GatewayUpdate,
    ) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(self, "update_gateway", self.inner.update_gateway(id, update))
    }

    fn get_gateway(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        delegate!(self, "get_gateway", self.inner.get_gateway(id))
    }

    fn list_gateways(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        delegate!(self, "list_gateways", self.inner.list_gateways())
    }

    fn delete_gateway(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(self, "delete_gateway", self.inner.delete_gateway(id))
    }

    fn create_gateway_target(
        &self,
        gateway_id: String,
        name: String,
        spec: GatewayTargetSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(
            self,
            "create_gateway_target",
            self.inner.create_gateway_target(gateway_id, name, spec)
        )
    }

    fn list_gateway_targets(
        &self,
        gateway_id: String,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        delegate!(
            self,
            "list_gateway_targets",
            self.inner.list_gateway_targets(gateway_id)
        )
    }

    fn delete_gateway_target(
        &self,
        gateway_id: String,
        target_id: String,
    ) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(
            self,
            "delete_gateway_target",
            self.inner.delete_gateway_target(gateway_id, target_id)
        )
    }

    fn create_policy_engine(
        &self,
        name: String,
        spec: PolicyEngineSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(
            self,
            "create_policy_engine",
            self.inner.create_policy_engine(name, spec)
        )
    }

    fn get_policy_engine(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        delegate!(self, "get_policy_engine", self.inner.get_policy_engine(id))
    }

    fn list_policy_engines(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        delegate!(self, "list_policy_engines", self.inner.list_policy_engines())
    }

    fn delete_policy_engine(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(self, "delete_policy_engine", self.inner.delete_policy_engine(id))
    }

    fn create_policy(
        &self,
        engine_id: String,
        name: String,
        statement: String,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(
            self,
            "create_policy",
            self.inner.create_policy(engine_id, name, statement)
        )
    }

    fn get_policy(
        &self,
        engine_id: String,
        policy_id: String,
    ) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        delegate!(self, "get_policy", self.inner.get_policy(engine_id, policy_id))
    }

    fn list_policies(
        &self,
        engine_id: String,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        delegate!(self, "list_policies", self.inner.list_policies(engine_id))
    }

    fn delete_policy(
        &self,
        engine_id: String,
        policy_id: String,
    ) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(
            self,
            "delete_policy",
            self.inner.delete_policy(engine_id, policy_id)
        )
    }

    fn create_a2a_endpoint(
        &self,
        member: String,
        runtime_arn: String,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(
            self,
            "create_a2a_endpoint",
            self.inner.create_a2a_endpoint(member, runtime_arn)
        )
    }

    fn create_evaluator(
        &self,
        name: String,
        spec: EvaluatorSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(self, "create_evaluator", self.inner.create_evaluator(name, spec))
    }

    fn get_evaluator(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        delegate!(self, "get_evaluator", self.inner.get_evaluator(id))
    }

    fn list_evaluators(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        delegate!(self, "list_evaluators", self.inner.list_evaluators())
    }

    fn delete_evaluator(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(self, "delete_evaluator", self.inner.delete_evaluator(id))
    }

    fn create_online_eval_config(
        &self,
        name: String,
        spec: OnlineEvalSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        delegate!(
            self,
            "create_online_eval_config",
            self.inner.create_online_eval_config(name, spec)
        )
    }

    fn get_online_eval_config(
        &self,
        id: String,
    ) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        delegate!(
            self,
            "get_online_eval_config",
            self.inner.get_online_eval_config(id)
        )
    }

    fn list_online_eval_configs(
        &self,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        delegate!(
            self,
            "list_online_eval_configs",
            self.inner.list_online_eval_configs()
        )
    }

    fn delete_online_eval_config(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(
            self,
            "delete_online_eval_config",
            self.inner.delete_online_eval_config(id)
        )
    }

    fn ensure_log_group(&self, name: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(self, "ensure_log_group", self.inner.ensure_log_group(name))
    }

    fn put_dashboard(
        &self,
        name: String,
        body: Value,
    ) -> BoxFuture<'_, Result<(), PlatformError>> {
        delegate!(self, "put_dashboard", self.inner.put_dashboard(name, body))
    }
}
