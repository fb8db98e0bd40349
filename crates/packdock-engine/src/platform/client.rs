//! The platform client: reconciliation protocol over a raw [`ControlPlane`].
//!
//! Three behaviors live here, shared by every phase:
//!
//! * **Readiness polling** — after every mutating call the client polls
//!   the resource until it reaches its terminal ready state (5s interval,
//!   60 attempts).
//! * **Create-or-adopt** — a `Conflict` on create is a normal outcome: the
//!   post-condition of `ensure_*` is "a ready resource with this name
//!   exists", regardless of whether this call created it. A conflicting
//!   resource stuck in `Deleting` is waited out and the create retried.
//! * **Lazy parent gateway** — the first tool target creates (or adopts)
//!   the parent gateway and caches its identity; every later target in the
//!   same apply reuses it. The cache is per-client, and a client must not
//!   be shared across concurrent applies.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use packdock_core::state::{ResourceKind, ResourceState};

use super::{
    BoxFuture, ControlPlane, Created, GatewaySpec, GatewayTargetSpec, GatewayUpdate,
    MemorySpec, OnlineEvalSpec, PlatformError, PolicyEngineSpec, RemoteResource, RemoteStatus,
    ResourceHealth, RuntimeSpec,
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_POLL_ATTEMPTS: u32 = 60;

/// Attempts for deleting a policy engine whose auto-generated children are
/// cleaned up asynchronously after the gateway goes away.
pub const ENGINE_DELETE_ATTEMPTS: u32 = 12;

/// Identity of the lazily created parent gateway.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    pub id: String,
    pub arn: String,
    pub name: String,
}

pub struct PlatformClient {
    plane: Arc<dyn ControlPlane>,
    poll_interval: Duration,
    max_poll_attempts: u32,
    gateway: Mutex<Option<GatewayHandle>>,
}

impl PlatformClient {
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            plane,
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            gateway: Mutex::new(None),
        }
    }

    /// Shrink the poll budget. Test hook — production keeps the defaults.
    pub fn with_poll_settings(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    /// The parent gateway created during this apply, if any.
    pub fn gateway(&self) -> Option<GatewayHandle> {
        self.gateway.lock().expect("gateway lock").clone()
    }

    // ── ensure operations (create-or-adopt + wait) ──────────────────────

    pub async fn ensure_memory(
        &self,
        ctx: &CancellationToken,
        name: &str,
        spec: MemorySpec,
    ) -> Result<Created, PlatformError> {
        let plane = Arc::clone(&self.plane);
        let owned_name = name.to_string();
        self.create_or_adopt(ctx, ResourceKind::Memory, None, name, move || {
            let plane = Arc::clone(&plane);
            let name = owned_name.clone();
            let spec = spec.clone();
            Box::pin(async move { plane.create_memory(name, spec).await })
        })
        .await
    }

    pub async fn create_runtime(
        &self,
        ctx: &CancellationToken,
        name: &str,
        spec: RuntimeSpec,
    ) -> Result<Created, PlatformError> {
        let plane = Arc::clone(&self.plane);
        let owned_name = name.to_string();
        self.create_or_adopt(ctx, ResourceKind::AgentRuntime, None, name, move || {
            let plane = Arc::clone(&plane);
            let name = owned_name.clone();
            let spec = spec.clone();
            Box::pin(async move { plane.create_runtime(name, spec).await })
        })
        .await
    }

    /// Update path for runtimes — the only kind the design updates in
    /// place. The prior ARN is preserved in the result.
    pub async fn update_runtime(
        &self,
        ctx: &CancellationToken,
        arn: &str,
        name: &str,
        spec: RuntimeSpec,
    ) -> Result<Created, PlatformError> {
        self.check_cancelled(ctx)?;
        let created = self
            .plane
            .update_runtime(arn.to_string(), name.to_string(), spec)
            .await?;
        self.wait_ready(ctx, &ResourceKind::AgentRuntime, None, &created.id, name)
            .await?;
        Ok(created)
    }

    /// Create (or adopt) a tool target under the lazily created parent
    /// gateway. Returns the target identity together with the gateway it
    /// landed in.
    pub async fn ensure_gateway_target(
        &self,
        ctx: &CancellationToken,
        name: &str,
        target: GatewayTargetSpec,
        gateway_spec: &GatewaySpec,
    ) -> Result<(Created, GatewayHandle), PlatformError> {
        let gateway = self.ensure_parent_gateway(ctx, name, gateway_spec).await?;

        let plane = Arc::clone(&self.plane);
        let gateway_id = gateway.id.clone();
        let owned_name = name.to_string();
        let created = self
            .create_or_adopt(
                ctx,
                ResourceKind::ToolGateway,
                Some(gateway.id.clone()),
                name,
                move || {
                    let plane = Arc::clone(&plane);
                    let gateway_id = gateway_id.clone();
                    let name = owned_name.clone();
                    let target = target.clone();
                    Box::pin(async move { plane.create_gateway_target(gateway_id, name, target).await })
                },
            )
            .await?;

        Ok((created, gateway))
    }

    pub async fn ensure_policy_engine(
        &self,
        ctx: &CancellationToken,
        name: &str,
        spec: PolicyEngineSpec,
    ) -> Result<Created, PlatformError> {
        let plane = Arc::clone(&self.plane);
        let owned_name = name.to_string();
        self.create_or_adopt(ctx, ResourceKind::CedarPolicy, None, name, move || {
            let plane = Arc::clone(&plane);
            let name = owned_name.clone();
            let spec = spec.clone();
            Box::pin(async move { plane.create_policy_engine(name, spec).await })
        })
        .await
    }

    pub async fn ensure_policy(
        &self,
        ctx: &CancellationToken,
        engine_id: &str,
        name: &str,
        statement: String,
    ) -> Result<Created, PlatformError> {
        let plane = Arc::clone(&self.plane);
        let owned_engine = engine_id.to_string();
        let owned_name = name.to_string();
        self.create_or_adopt(
            ctx,
            ResourceKind::CedarPolicy,
            Some(engine_id.to_string()),
            name,
            move || {
                let plane = Arc::clone(&plane);
                let engine_id = owned_engine.clone();
                let name = owned_name.clone();
                let statement = statement.clone();
                Box::pin(async move { plane.create_policy(engine_id, name, statement).await })
            },
        )
        .await
    }

    /// A2A endpoints are synthetic: immediate success, no readiness poll.
    pub async fn ensure_a2a_endpoint(
        &self,
        ctx: &CancellationToken,
        member: &str,
        runtime_arn: &str,
    ) -> Result<Created, PlatformError> {
        self.check_cancelled(ctx)?;
        self.plane
            .create_a2a_endpoint(member.to_string(), runtime_arn.to_string())
            .await
    }

    pub async fn ensure_evaluator(
        &self,
        ctx: &CancellationToken,
        name: &str,
        spec: super::EvaluatorSpec,
    ) -> Result<Created, PlatformError> {
        let plane = Arc::clone(&self.plane);
        let owned_name = name.to_string();
        self.create_or_adopt(ctx, ResourceKind::Evaluator, None, name, move || {
            let plane = Arc::clone(&plane);
            let name = owned_name.clone();
            let spec = spec.clone();
            Box::pin(async move { plane.create_evaluator(name, spec).await })
        })
        .await
    }

    pub async fn ensure_online_eval_config(
        &self,
        ctx: &CancellationToken,
        name: &str,
        spec: OnlineEvalSpec,
    ) -> Result<Created, PlatformError> {
        let plane = Arc::clone(&self.plane);
        let owned_name = name.to_string();
        self.create_or_adopt(ctx, ResourceKind::OnlineEvalConfig, None, name, move || {
            let plane = Arc::clone(&plane);
            let name = owned_name.clone();
            let spec = spec.clone();
            Box::pin(async move { plane.create_online_eval_config(name, spec).await })
        })
        .await
    }

    pub async fn ensure_log_group(&self, name: &str) -> Result<(), PlatformError> {
        self.plane.ensure_log_group(name.to_string()).await
    }

    pub async fn put_dashboard(
        &self,
        name: &str,
        body: serde_json::Value,
    ) -> Result<(), PlatformError> {
        self.plane.put_dashboard(name.to_string(), body).await
    }

    /// Attach a policy engine to the parent gateway in enforcing mode.
    /// Must run after every tool target is registered — the engine's
    /// admissible-action schema is derived from gateway state. No gateway
    /// means nothing to associate.
    pub async fn associate_policy_engine(
        &self,
        ctx: &CancellationToken,
        engine_arn: &str,
    ) -> Result<(), PlatformError> {
        let Some(gateway) = self.gateway() else {
            tracing::debug!(engine_arn, "no gateway in this apply; skipping policy association");
            return Ok(());
        };

        self.check_cancelled(ctx)?;
        self.plane
            .update_gateway(
                gateway.id.clone(),
                GatewayUpdate {
                    policy_engine_arn: engine_arn.to_string(),
                    enforcement_mode: "ENFORCE".to_string(),
                },
            )
            .await?;
        self.wait_gateway_ready(ctx, &gateway.id).await
    }

    // ── destroy-side operations ──────────────────────────────────────────

    pub async fn memory_status(&self, id: &str) -> Result<RemoteStatus, PlatformError> {
        self.plane.get_memory(id.to_string()).await
    }

    pub async fn delete_memory(&self, id: &str) -> Result<(), PlatformError> {
        ignore_not_found(self.plane.delete_memory(id.to_string()).await)
    }

    /// Wait for a memory stuck in `Creating` to settle before deletion.
    pub async fn wait_memory_settled(
        &self,
        ctx: &CancellationToken,
        id: &str,
    ) -> Result<(), PlatformError> {
        for _ in 0..self.max_poll_attempts {
            self.check_cancelled(ctx)?;
            match self.plane.get_memory(id.to_string()).await {
                Ok(RemoteStatus::Creating) => self.tick(ctx).await?,
                Ok(_) => return Ok(()),
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Err(PlatformError::ReadinessTimeout {
            kind: ResourceKind::Memory,
            attempts: self.max_poll_attempts,
        })
    }

    pub async fn delete_runtime(&self, id: &str) -> Result<(), PlatformError> {
        ignore_not_found(self.plane.delete_runtime(id.to_string()).await)
    }

    pub async fn delete_evaluator(&self, id: &str) -> Result<(), PlatformError> {
        ignore_not_found(self.plane.delete_evaluator(id.to_string()).await)
    }

    pub async fn delete_online_eval_config(&self, id: &str) -> Result<(), PlatformError> {
        ignore_not_found(self.plane.delete_online_eval_config(id.to_string()).await)
    }

    pub async fn delete_gateway_target(
        &self,
        ctx: &CancellationToken,
        gateway_id: &str,
        target_id: &str,
    ) -> Result<(), PlatformError> {
        // A target mid-creation cannot be deleted; wait for it to settle.
        for _ in 0..self.max_poll_attempts {
            self.check_cancelled(ctx)?;
            let targets = self.plane.list_gateway_targets(gateway_id.to_string()).await?;
            match targets.iter().find(|t| t.id == target_id) {
                Some(t) if t.status == RemoteStatus::Creating => self.tick(ctx).await?,
                Some(_) => break,
                None => return Ok(()),
            }
        }
        ignore_not_found(
            self.plane
                .delete_gateway_target(gateway_id.to_string(), target_id.to_string())
                .await,
        )
    }

    /// Delete a parent gateway: purge every remaining target, wait for the
    /// target set to drain, then delete the gateway itself.
    pub async fn delete_gateway_purging(
        &self,
        ctx: &CancellationToken,
        gateway_id: &str,
    ) -> Result<(), PlatformError> {
        let targets = match self.plane.list_gateway_targets(gateway_id.to_string()).await {
            Ok(targets) => targets,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        for target in targets {
            self.delete_gateway_target(ctx, gateway_id, &target.id).await?;
        }

        for _ in 0..self.max_poll_attempts {
            self.check_cancelled(ctx)?;
            let remaining = self.plane.list_gateway_targets(gateway_id.to_string()).await?;
            if remaining.is_empty() {
                break;
            }
            self.tick(ctx).await?;
        }

        ignore_not_found(self.plane.delete_gateway(gateway_id.to_string()).await)
    }

    pub async fn purge_policy(
        &self,
        ctx: &CancellationToken,
        engine_id: &str,
        policy_id: &str,
    ) -> Result<(), PlatformError> {
        self.check_cancelled(ctx)?;
        ignore_not_found(
            self.plane
                .delete_policy(engine_id.to_string(), policy_id.to_string())
                .await,
        )
    }

    pub async fn purge_policies(&self, engine_id: &str) -> Result<(), PlatformError> {
        let policies = match self.plane.list_policies(engine_id.to_string()).await {
            Ok(policies) => policies,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        for policy in policies {
            ignore_not_found(
                self.plane
                    .delete_policy(engine_id.to_string(), policy.id.clone())
                    .await,
            )?;
        }
        Ok(())
    }

    /// Delete a policy engine, retrying while AWS-generated child policies
    /// (invisible to list) are cleaned up asynchronously.
    pub async fn delete_policy_engine_retrying(
        &self,
        ctx: &CancellationToken,
        engine_id: &str,
    ) -> Result<(), PlatformError> {
        let mut last_err = None;
        for attempt in 1..=ENGINE_DELETE_ATTEMPTS {
            self.check_cancelled(ctx)?;
            self.purge_policies(engine_id).await?;
            match self.plane.delete_policy_engine(engine_id.to_string()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_not_found() => return Ok(()),
                Err(PlatformError::Cancelled) => return Err(PlatformError::Cancelled),
                Err(e) => {
                    tracing::debug!(
                        engine_id,
                        attempt,
                        error = %e,
                        "policy engine delete blocked; retrying"
                    );
                    last_err = Some(e);
                    if attempt < ENGINE_DELETE_ATTEMPTS {
                        self.tick(ctx).await?;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| PlatformError::Api("policy engine delete failed".into())))
    }

    // ── health probe ─────────────────────────────────────────────────────

    /// Per-resource health probe for the status checker.
    pub async fn probe(&self, resource: &ResourceState) -> ResourceHealth {
        let id = resource
            .metadata
            .get("id")
            .cloned()
            .or_else(|| id_from_arn(&resource.kind, &resource.arn));

        match &resource.kind {
            ResourceKind::A2aEndpoint => {
                if resource.arn.is_empty() {
                    ResourceHealth::Missing
                } else {
                    ResourceHealth::Healthy
                }
            }
            ResourceKind::ToolGateway => {
                let Some(gateway_id) = resource.metadata.get("gateway_id") else {
                    return ResourceHealth::Missing;
                };
                let Some(id) = id else {
                    return ResourceHealth::Missing;
                };
                match self.plane.list_gateway_targets(gateway_id.clone()).await {
                    Ok(targets) => match targets.iter().find(|t| t.id == id) {
                        Some(t) if t.status == RemoteStatus::Ready => ResourceHealth::Healthy,
                        Some(_) => ResourceHealth::Unhealthy,
                        None => ResourceHealth::Missing,
                    },
                    Err(e) if e.is_not_found() => ResourceHealth::Missing,
                    Err(_) => ResourceHealth::Unhealthy,
                }
            }
            ResourceKind::CedarPolicy => {
                let Some(engine_id) = resource.metadata.get("policy_engine_id") else {
                    return ResourceHealth::Missing;
                };
                health_from(self.plane.get_policy_engine(engine_id.clone()).await)
            }
            ResourceKind::Memory => match id {
                Some(id) => health_from(self.plane.get_memory(id).await),
                None => ResourceHealth::Missing,
            },
            ResourceKind::AgentRuntime => match id {
                Some(id) => health_from(self.plane.get_runtime(id).await),
                None => ResourceHealth::Missing,
            },
            ResourceKind::Evaluator => match id {
                Some(id) => health_from(self.plane.get_evaluator(id).await),
                None => ResourceHealth::Missing,
            },
            ResourceKind::OnlineEvalConfig => match id {
                Some(id) => health_from(self.plane.get_online_eval_config(id).await),
                None => ResourceHealth::Missing,
            },
            ResourceKind::Other(kind) => {
                tracing::warn!(kind = %kind, name = %resource.name, "unknown resource kind in state");
                ResourceHealth::Missing
            }
        }
    }

    // ── internals ────────────────────────────────────────────────────────

    async fn ensure_parent_gateway(
        &self,
        ctx: &CancellationToken,
        first_target: &str,
        spec: &GatewaySpec,
    ) -> Result<GatewayHandle, PlatformError> {
        if let Some(handle) = self.gateway() {
            return Ok(handle);
        }

        let name = format!("{first_target}-gw");
        self.check_cancelled(ctx)?;

        let created = match self.plane.create_gateway(name.clone(), spec.clone()).await {
            Ok(created) => created,
            Err(PlatformError::Conflict(_)) => {
                match self.find_gateway_by_name(&name).await? {
                    Some(existing) if existing.status == RemoteStatus::Deleting => {
                        self.wait_gateway_gone(ctx, &name).await?;
                        self.plane.create_gateway(name.clone(), spec.clone()).await?
                    }
                    Some(existing) => Created {
                        id: existing.id,
                        arn: existing.arn,
                    },
                    None => {
                        return Err(PlatformError::Api(format!(
                            "gateway {name:?} conflicted on create but was not found by name"
                        )))
                    }
                }
            }
            Err(e) => return Err(e),
        };

        self.wait_gateway_ready(ctx, &created.id).await?;

        let handle = GatewayHandle {
            id: created.id,
            arn: created.arn,
            name,
        };
        tracing::info!(gateway = %handle.name, id = %handle.id, "parent gateway ready");
        *self.gateway.lock().expect("gateway lock") = Some(handle.clone());
        Ok(handle)
    }

    async fn create_or_adopt<F>(
        &self,
        ctx: &CancellationToken,
        kind: ResourceKind,
        scope: Option<String>,
        name: &str,
        create: F,
    ) -> Result<Created, PlatformError>
    where
        F: Fn() -> BoxFuture<'static, Result<Created, PlatformError>>,
    {
        self.check_cancelled(ctx)?;
        let created = match create().await {
            Ok(created) => created,
            Err(PlatformError::Conflict(_)) => {
                tracing::debug!(kind = %kind, name, "create conflicted; adopting existing resource");
                match self.find_by_name(&kind, scope.as_deref(), name).await? {
                    Some(existing) if existing.status == RemoteStatus::Deleting => {
                        self.wait_gone(ctx, &kind, scope.as_deref(), name).await?;
                        create().await?
                    }
                    Some(existing) => {
                        self.wait_ready(ctx, &kind, scope.as_deref(), &existing.id, name)
                            .await?;
                        return Ok(Created {
                            id: existing.id,
                            arn: existing.arn,
                        });
                    }
                    None => {
                        return Err(PlatformError::Api(format!(
                            "{kind} {name:?} conflicted on create but was not found by name"
                        )))
                    }
                }
            }
            Err(e) => return Err(e),
        };

        self.wait_ready(ctx, &kind, scope.as_deref(), &created.id, name)
            .await?;
        Ok(created)
    }

    async fn wait_ready(
        &self,
        ctx: &CancellationToken,
        kind: &ResourceKind,
        scope: Option<&str>,
        id: &str,
        name: &str,
    ) -> Result<(), PlatformError> {
        for _ in 0..self.max_poll_attempts {
            self.check_cancelled(ctx)?;
            match self.status_of(kind, scope, id).await? {
                RemoteStatus::Ready => return Ok(()),
                RemoteStatus::Failed(reason) => {
                    return Err(PlatformError::TerminalFailure {
                        kind: kind.clone(),
                        name: name.to_string(),
                        reason: reason.unwrap_or_else(|| "no failure reason reported".into()),
                    })
                }
                status => {
                    tracing::trace!(kind = %kind, name, ?status, "waiting for readiness");
                    self.tick(ctx).await?;
                }
            }
        }
        Err(PlatformError::ReadinessTimeout {
            kind: kind.clone(),
            attempts: self.max_poll_attempts,
        })
    }

    async fn wait_gone(
        &self,
        ctx: &CancellationToken,
        kind: &ResourceKind,
        scope: Option<&str>,
        name: &str,
    ) -> Result<(), PlatformError> {
        for _ in 0..self.max_poll_attempts {
            self.check_cancelled(ctx)?;
            if self.find_by_name(kind, scope, name).await?.is_none() {
                return Ok(());
            }
            self.tick(ctx).await?;
        }
        Err(PlatformError::ReadinessTimeout {
            kind: kind.clone(),
            attempts: self.max_poll_attempts,
        })
    }

    async fn wait_gateway_ready(
        &self,
        ctx: &CancellationToken,
        id: &str,
    ) -> Result<(), PlatformError> {
        for _ in 0..self.max_poll_attempts {
            self.check_cancelled(ctx)?;
            match self.plane.get_gateway(id.to_string()).await? {
                RemoteStatus::Ready => return Ok(()),
                RemoteStatus::Failed(reason) => {
                    return Err(PlatformError::TerminalFailure {
                        kind: ResourceKind::ToolGateway,
                        name: id.to_string(),
                        reason: reason.unwrap_or_else(|| "no failure reason reported".into()),
                    })
                }
                _ => self.tick(ctx).await?,
            }
        }
        Err(PlatformError::ReadinessTimeout {
            kind: ResourceKind::ToolGateway,
            attempts: self.max_poll_attempts,
        })
    }

    async fn wait_gateway_gone(
        &self,
        ctx: &CancellationToken,
        name: &str,
    ) -> Result<(), PlatformError> {
        for _ in 0..self.max_poll_attempts {
            self.check_cancelled(ctx)?;
            if self.find_gateway_by_name(name).await?.is_none() {
                return Ok(());
            }
            self.tick(ctx).await?;
        }
        Err(PlatformError::ReadinessTimeout {
            kind: ResourceKind::ToolGateway,
            attempts: self.max_poll_attempts,
        })
    }

    async fn find_gateway_by_name(
        &self,
        name: &str,
    ) -> Result<Option<RemoteResource>, PlatformError> {
        let gateways = self.plane.list_gateways().await?;
        Ok(gateways.into_iter().find(|g| g.name == name))
    }

    async fn find_by_name(
        &self,
        kind: &ResourceKind,
        scope: Option<&str>,
        name: &str,
    ) -> Result<Option<RemoteResource>, PlatformError> {
        let listed = match (kind, scope) {
            (ResourceKind::Memory, _) => self.plane.list_memories().await?,
            (ResourceKind::AgentRuntime, _) => self.plane.list_runtimes().await?,
            (ResourceKind::ToolGateway, Some(gateway_id)) => {
                self.plane.list_gateway_targets(gateway_id.to_string()).await?
            }
            (ResourceKind::CedarPolicy, Some(engine_id)) => {
                self.plane.list_policies(engine_id.to_string()).await?
            }
            (ResourceKind::CedarPolicy, None) => self.plane.list_policy_engines().await?,
            (ResourceKind::Evaluator, _) => self.plane.list_evaluators().await?,
            (ResourceKind::OnlineEvalConfig, _) => self.plane.list_online_eval_configs().await?,
            (kind, _) => {
                return Err(PlatformError::Api(format!(
                    "kind {kind} has no list operation"
                )))
            }
        };
        Ok(listed.into_iter().find(|r| r.name == name))
    }

    async fn status_of(
        &self,
        kind: &ResourceKind,
        scope: Option<&str>,
        id: &str,
    ) -> Result<RemoteStatus, PlatformError> {
        match (kind, scope) {
            (ResourceKind::Memory, _) => self.plane.get_memory(id.to_string()).await,
            (ResourceKind::AgentRuntime, _) => self.plane.get_runtime(id.to_string()).await,
            (ResourceKind::ToolGateway, Some(gateway_id)) => {
                let targets = self.plane.list_gateway_targets(gateway_id.to_string()).await?;
                targets
                    .into_iter()
                    .find(|t| t.id == id)
                    .map(|t| t.status)
                    .ok_or_else(|| PlatformError::NotFound(format!("gateway target {id}")))
            }
            (ResourceKind::CedarPolicy, Some(engine_id)) => {
                self.plane
                    .get_policy(engine_id.to_string(), id.to_string())
                    .await
            }
            (ResourceKind::CedarPolicy, None) => self.plane.get_policy_engine(id.to_string()).await,
            (ResourceKind::Evaluator, _) => self.plane.get_evaluator(id.to_string()).await,
            (ResourceKind::OnlineEvalConfig, _) => {
                self.plane.get_online_eval_config(id.to_string()).await
            }
            // Synthetic kinds are ready the moment they exist.
            _ => Ok(RemoteStatus::Ready),
        }
    }

    fn check_cancelled(&self, ctx: &CancellationToken) -> Result<(), PlatformError> {
        if ctx.is_cancelled() {
            Err(PlatformError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn tick(&self, ctx: &CancellationToken) -> Result<(), PlatformError> {
        tokio::select! {
            _ = ctx.cancelled() => Err(PlatformError::Cancelled),
            _ = tokio::time::sleep(self.poll_interval) => Ok(()),
        }
    }
}

fn ignore_not_found(result: Result<(), PlatformError>) -> Result<(), PlatformError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

fn health_from(status: Result<RemoteStatus, PlatformError>) -> ResourceHealth {
    match status {
        Ok(RemoteStatus::Ready) => ResourceHealth::Healthy,
        Ok(_) => ResourceHealth::Unhealthy,
        Err(e) if e.is_not_found() => ResourceHealth::Missing,
        Err(_) => ResourceHealth::Unhealthy,
    }
}

/// Resolve a platform id from a stored ARN by kind.
fn id_from_arn(kind: &ResourceKind, arn: &str) -> Option<String> {
    let prefix = match kind {
        ResourceKind::Memory => "memory",
        ResourceKind::AgentRuntime => "runtime",
        ResourceKind::Evaluator => "evaluator",
        ResourceKind::OnlineEvalConfig => "online-eval",
        ResourceKind::ToolGateway => "target",
        ResourceKind::CedarPolicy => "policy-engine",
        _ => return None,
    };
    packdock_core::arn::extract_resource_id(arn, prefix).map(str::to_string)
}
