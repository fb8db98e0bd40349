//! In-memory control plane.
//!
//! Backs `dry_run` flows and the test suites. Behaves like the real
//! platform where the engine cares: names are unique per kind (a second
//! create conflicts, so the adopt path runs for real), ARNs are
//! deterministic and carry the region, deletes of absent resources report
//! `NotFound`, and a resource seeded as `Deleting` fades out after a
//! configurable number of list observations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use serde_json::Value;

use packdock_core::state::ResourceKind;

use super::{
    BoxFuture, ControlPlane, Created, EvaluatorSpec, GatewaySpec, GatewayTargetSpec,
    GatewayUpdate, MemorySpec, OnlineEvalSpec, PlatformError, PolicyEngineSpec, RemoteResource,
    RemoteStatus, RuntimeSpec,
};

const SIM_ACCOUNT: &str = "123456789012";

#[derive(Debug, Clone)]
struct SimResource {
    id: String,
    arn: String,
    name: String,
    status: RemoteStatus,
    /// List observations left before a `Deleting` resource disappears.
    fade: Option<u32>,
}

impl SimResource {
    fn remote(&self) -> RemoteResource {
        RemoteResource {
            id: self.id.clone(),
            arn: self.arn.clone(),
            name: self.name.clone(),
            status: self.status.clone(),
        }
    }
}

#[derive(Default)]
struct SimState {
    memories: BTreeMap<String, SimResource>,
    runtimes: BTreeMap<String, SimResource>,
    gateways: BTreeMap<String, SimResource>,
    targets: BTreeMap<String, BTreeMap<String, SimResource>>,
    engines: BTreeMap<String, SimResource>,
    policies: BTreeMap<String, BTreeMap<String, SimResource>>,
    evaluators: BTreeMap<String, SimResource>,
    online: BTreeMap<String, SimResource>,
    gateway_associations: BTreeMap<String, String>,
    runtime_envs: BTreeMap<String, BTreeMap<String, String>>,
    policy_statements: BTreeMap<String, String>,
    log_groups: BTreeSet<String>,
    dashboards: BTreeMap<String, Value>,
    mutations: u64,
}

pub struct SimulatedControlPlane {
    region: String,
    state: Mutex<SimState>,
}

impl SimulatedControlPlane {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            state: Mutex::new(SimState::default()),
        }
    }

    fn arn(&self, path: &str) -> String {
        format!(
            "arn:aws:bedrock-agentcore:{}:{}:{}",
            self.region, SIM_ACCOUNT, path
        )
    }

    fn build(&self, prefix: &str, path_prefix: &str, name: &str) -> SimResource {
        let id = format!("{prefix}-{name}");
        SimResource {
            arn: self.arn(&format!("{path_prefix}/{id}")),
            id,
            name: name.to_string(),
            status: RemoteStatus::Ready,
            fade: None,
        }
    }

    // ── test hooks ───────────────────────────────────────────────────────

    /// Total create/update/delete calls observed. Used to assert that no
    /// mutation happens after a callback abort or cancellation.
    pub fn mutation_count(&self) -> u64 {
        self.state.lock().expect("sim lock").mutations
    }

    /// Pre-seed a top-level resource in `Deleting` state that disappears
    /// after `fade` list observations.
    pub fn seed_deleting(&self, kind: &ResourceKind, name: &str, fade: u32) {
        let mut state = self.state.lock().expect("sim lock");
        let (map, prefix, path) = match kind {
            ResourceKind::Memory => (&mut state.memories, "mem", "memory"),
            ResourceKind::AgentRuntime => (&mut state.runtimes, "rt", "runtime"),
            ResourceKind::Evaluator => (&mut state.evaluators, "eval", "evaluator"),
            ResourceKind::OnlineEvalConfig => (&mut state.online, "oec", "online-eval"),
            ResourceKind::CedarPolicy => (&mut state.engines, "pe", "policy-engine"),
            _ => panic!("seed_deleting: unsupported kind {kind}"),
        };
        let id = format!("{prefix}-{name}");
        map.insert(
            name.to_string(),
            SimResource {
                arn: format!(
                    "arn:aws:bedrock-agentcore:{}:{}:{}/{}",
                    self.region, SIM_ACCOUNT, path, id
                ),
                id,
                name: name.to_string(),
                status: RemoteStatus::Deleting,
                fade: Some(fade),
            },
        );
    }

    pub fn runtime_env(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.state
            .lock()
            .expect("sim lock")
            .runtime_envs
            .get(name)
            .cloned()
    }

    pub fn gateway_association(&self, gateway_id: &str) -> Option<String> {
        self.state
            .lock()
            .expect("sim lock")
            .gateway_associations
            .get(gateway_id)
            .cloned()
    }

    pub fn policy_statement(&self, policy_id: &str) -> Option<String> {
        self.state
            .lock()
            .expect("sim lock")
            .policy_statements
            .get(policy_id)
            .cloned()
    }

    pub fn log_groups(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("sim lock")
            .log_groups
            .iter()
            .cloned()
            .collect()
    }

    pub fn dashboards(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("sim lock")
            .dashboards
            .keys()
            .cloned()
            .collect()
    }
}

fn create_in(
    map: &mut BTreeMap<String, SimResource>,
    resource: SimResource,
    kind: &str,
) -> Result<Created, PlatformError> {
    if map.contains_key(&resource.name) {
        return Err(PlatformError::Conflict(format!(
            "{kind} {} already exists",
            resource.name
        )));
    }
    let created = Created {
        id: resource.id.clone(),
        arn: resource.arn.clone(),
    };
    map.insert(resource.name.clone(), resource);
    Ok(created)
}

fn get_in(map: &BTreeMap<String, SimResource>, id: &str) -> Result<RemoteStatus, PlatformError> {
    map.values()
        .find(|r| r.id == id)
        .map(|r| r.status.clone())
        .ok_or_else(|| PlatformError::NotFound(id.to_string()))
}

/// Advance `Deleting` fade-outs, then snapshot.
fn list_in(map: &mut BTreeMap<String, SimResource>) -> Vec<RemoteResource> {
    let mut gone = Vec::new();
    for (name, r) in map.iter_mut() {
        if let Some(fade) = &mut r.fade {
            if *fade == 0 {
                gone.push(name.clone());
            } else {
                *fade -= 1;
            }
        }
    }
    for name in gone {
        map.remove(&name);
    }
    map.values().map(SimResource::remote).collect()
}

fn delete_in(map: &mut BTreeMap<String, SimResource>, id: &str) -> Result<(), PlatformError> {
    let name = map
        .values()
        .find(|r| r.id == id)
        .map(|r| r.name.clone())
        .ok_or_else(|| PlatformError::NotFound(id.to_string()))?;
    map.remove(&name);
    Ok(())
}

impl ControlPlane for SimulatedControlPlane {
    fn create_memory(
        &self,
        name: String,
        _spec: MemorySpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let resource = self.build("mem", "memory", &name);
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            create_in(&mut state.memories, resource, "memory")
        })
    }

    fn get_memory(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        Box::pin(async move { get_in(&self.state.lock().expect("sim lock").memories, &id) })
    }

    fn list_memories(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        Box::pin(async move { Ok(list_in(&mut self.state.lock().expect("sim lock").memories)) })
    }

    fn delete_memory(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            delete_in(&mut state.memories, &id)
        })
    }

    fn create_runtime(
        &self,
        name: String,
        spec: RuntimeSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let resource = self.build("rt", "runtime", &name);
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            state.runtime_envs.insert(name.clone(), spec.env.clone());
            create_in(&mut state.runtimes, resource, "runtime")
        })
    }

    fn update_runtime(
        &self,
        arn: String,
        name: String,
        spec: RuntimeSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            state.runtime_envs.insert(name.clone(), spec.env.clone());
            // Updates adopt the caller's ARN: an update of a runtime the
            // simulator never saw (prior state from elsewhere) upserts it.
            let id = state
                .runtimes
                .get(&name)
                .map(|r| r.id.clone())
                .unwrap_or_else(|| format!("rt-{name}"));
            state.runtimes.insert(
                name.clone(),
                SimResource {
                    id: id.clone(),
                    arn: arn.clone(),
                    name: name.clone(),
                    status: RemoteStatus::Ready,
                    fade: None,
                },
            );
            Ok(Created { id, arn })
        })
    }

    fn get_runtime(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        Box::pin(async move { get_in(&self.state.lock().expect("sim lock").runtimes, &id) })
    }

    fn list_runtimes(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        Box::pin(async move { Ok(list_in(&mut self.state.lock().expect("sim lock").runtimes)) })
    }

    fn delete_runtime(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            delete_in(&mut state.runtimes, &id)
        })
    }

    fn create_gateway(
        &self,
        name: String,
        _spec: GatewaySpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let resource = self.build("gw", "gateway", &name);
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            create_in(&mut state.gateways, resource, "gateway")
        })
    }

    fn update_gateway(
        &self,
        id: String,
        update: GatewayUpdate,
    ) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            if !state.gateways.values().any(|g| g.id == id) {
                return Err(PlatformError::NotFound(id));
            }
            state
                .gateway_associations
                .insert(id, update.policy_engine_arn);
            Ok(())
        })
    }

    fn get_gateway(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        Box::pin(async move { get_in(&self.state.lock().expect("sim lock").gateways, &id) })
    }

    fn list_gateways(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        Box::pin(async move { Ok(list_in(&mut self.state.lock().expect("sim lock").gateways)) })
    }

    fn delete_gateway(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            if state
                .targets
                .get(&id)
                .is_some_and(|targets| !targets.is_empty())
            {
                return Err(PlatformError::Api(format!(
                    "gateway {id} still has registered targets"
                )));
            }
            state.targets.remove(&id);
            delete_in(&mut state.gateways, &id)
        })
    }

    fn create_gateway_target(
        &self,
        gateway_id: String,
        name: String,
        _spec: GatewayTargetSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let id = format!("tgt-{name}");
            let arn = self.arn(&format!("gateway/{gateway_id}/target/{id}"));
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            if !state.gateways.values().any(|g| g.id == gateway_id) {
                return Err(PlatformError::NotFound(gateway_id));
            }
            let targets = state.targets.entry(gateway_id).or_default();
            create_in(
                targets,
                SimResource {
                    id,
                    arn,
                    name,
                    status: RemoteStatus::Ready,
                    fade: None,
                },
                "gateway target",
            )
        })
    }

    fn list_gateway_targets(
        &self,
        gateway_id: String,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            Ok(state
                .targets
                .get_mut(&gateway_id)
                .map(list_in)
                .unwrap_or_default())
        })
    }

    fn delete_gateway_target(
        &self,
        gateway_id: String,
        target_id: String,
    ) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            let targets = state
                .targets
                .get_mut(&gateway_id)
                .ok_or_else(|| PlatformError::NotFound(gateway_id.clone()))?;
            delete_in(targets, &target_id)
        })
    }

    fn create_policy_engine(
        &self,
        name: String,
        _spec: PolicyEngineSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let resource = self.build("pe", "policy-engine", &name);
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            create_in(&mut state.engines, resource, "policy engine")
        })
    }

    fn get_policy_engine(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        Box::pin(async move { get_in(&self.state.lock().expect("sim lock").engines, &id) })
    }

    fn list_policy_engines(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        Box::pin(async move { Ok(list_in(&mut self.state.lock().expect("sim lock").engines)) })
    }

    fn delete_policy_engine(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            if state
                .policies
                .get(&id)
                .is_some_and(|policies| !policies.is_empty())
            {
                return Err(PlatformError::Api(format!(
                    "policy engine {id} still has attached policies"
                )));
            }
            state.policies.remove(&id);
            delete_in(&mut state.engines, &id)
        })
    }

    fn create_policy(
        &self,
        engine_id: String,
        name: String,
        statement: String,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let id = format!("pol-{name}");
            let arn = self.arn(&format!("policy-engine/{engine_id}/policy/{id}"));
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            if !state.engines.values().any(|e| e.id == engine_id) {
                return Err(PlatformError::NotFound(engine_id));
            }
            state.policy_statements.insert(id.clone(), statement);
            let policies = state.policies.entry(engine_id).or_default();
            create_in(
                policies,
                SimResource {
                    id,
                    arn,
                    name,
                    status: RemoteStatus::Ready,
                    fade: None,
                },
                "policy",
            )
        })
    }

    fn get_policy(
        &self,
        engine_id: String,
        policy_id: String,
    ) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        Box::pin(async move {
            let state = self.state.lock().expect("sim lock");
            let policies = state
                .policies
                .get(&engine_id)
                .ok_or_else(|| PlatformError::NotFound(engine_id.clone()))?;
            get_in(policies, &policy_id)
        })
    }

    fn list_policies(
        &self,
        engine_id: String,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            Ok(state
                .policies
                .get_mut(&engine_id)
                .map(list_in)
                .unwrap_or_default())
        })
    }

    fn delete_policy(
        &self,
        engine_id: String,
        policy_id: String,
    ) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            let policies = state
                .policies
                .get_mut(&engine_id)
                .ok_or_else(|| PlatformError::NotFound(engine_id.clone()))?;
            delete_in(policies, &policy_id)
        })
    }

    fn create_a2a_endpoint(
        &self,
        member: String,
        _runtime_arn: String,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        // Synthetic: nothing is stored, the ARN is derived from the member.
        Box::pin(async move {
            Ok(Created {
                id: format!("a2a-{member}"),
                arn: self.arn(&format!("runtime-endpoint/{member}")),
            })
        })
    }

    fn create_evaluator(
        &self,
        name: String,
        _spec: EvaluatorSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let resource = self.build("eval", "evaluator", &name);
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            create_in(&mut state.evaluators, resource, "evaluator")
        })
    }

    fn get_evaluator(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        Box::pin(async move { get_in(&self.state.lock().expect("sim lock").evaluators, &id) })
    }

    fn list_evaluators(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        Box::pin(async move { Ok(list_in(&mut self.state.lock().expect("sim lock").evaluators)) })
    }

    fn delete_evaluator(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            delete_in(&mut state.evaluators, &id)
        })
    }

    fn create_online_eval_config(
        &self,
        name: String,
        _spec: OnlineEvalSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>> {
        Box::pin(async move {
            let resource = self.build("oec", "online-eval", &name);
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            create_in(&mut state.online, resource, "online eval config")
        })
    }

    fn get_online_eval_config(
        &self,
        id: String,
    ) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>> {
        Box::pin(async move { get_in(&self.state.lock().expect("sim lock").online, &id) })
    }

    fn list_online_eval_configs(
        &self,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>> {
        Box::pin(async move { Ok(list_in(&mut self.state.lock().expect("sim lock").online)) })
    }

    fn delete_online_eval_config(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("sim lock");
            state.mutations += 1;
            delete_in(&mut state.online, &id)
        })
    }

    fn ensure_log_group(&self, name: String) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            self.state.lock().expect("sim lock").log_groups.insert(name);
            Ok(())
        })
    }

    fn put_dashboard(&self, name: String, body: Value) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            self.state
                .lock()
                .expect("sim lock")
                .dashboards
                .insert(name, body);
            Ok(())
        })
    }
}
