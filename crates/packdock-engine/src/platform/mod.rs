//! Platform boundary.
//!
//! [`ControlPlane`] is the typed façade over the managed platform's
//! control-plane API — one create/get/list/delete (and where supported,
//! update) family per resource kind. The AWS binding is supplied by the
//! embedding host; this workspace ships [`sim::SimulatedControlPlane`]
//! for dry-run flows and tests.
//!
//! [`client::PlatformClient`] layers the reconciliation protocol on top:
//! readiness polling, create-or-adopt on conflict, and the lazily created
//! parent gateway.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use packdock_core::config::MemoryStrategy;
use packdock_core::state::ResourceKind;

pub mod client;
pub mod sim;

pub use client::{GatewayHandle, PlatformClient};
pub use sim::SimulatedControlPlane;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a successful create (or adopt): the platform identity of the
/// resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: String,
    pub arn: String,
}

/// Unified lifecycle status across kinds. Each kind's wire spelling
/// (`READY` vs `ACTIVE`, `CREATE_FAILED` vs `FAILED`) is a backend
/// concern; the engine only distinguishes terminal-ready, terminal-failed,
/// and the transitional states it has to wait out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Ready,
    Creating,
    Updating,
    Deleting,
    Failed(Option<String>),
}

impl RemoteStatus {
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating | Self::Deleting)
    }
}

/// A resource as the platform reports it in list/get responses.
#[derive(Debug, Clone)]
pub struct RemoteResource {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub status: RemoteStatus,
}

/// Health probe outcome for the status checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceHealth {
    Healthy,
    Unhealthy,
    Missing,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    /// A resource with the requested name already exists. Normal outcome:
    /// the client adopts it.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Api(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{kind} did not become ready after {attempts} attempts")]
    ReadinessTimeout { kind: ResourceKind, attempts: u32 },

    #[error("{kind} {name:?} failed: {reason}")]
    TerminalFailure {
        kind: ResourceKind,
        name: String,
        reason: String,
    },
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ── creation payloads ────────────────────────────────────────────────────
//
// Discriminated platform payloads are modeled as tagged sums; every
// variant is a compile-time known case.

#[derive(Debug, Clone)]
pub struct MemorySpec {
    pub strategies: Vec<MemoryStrategy>,
    pub event_expiry_days: i64,
    pub encryption_key_arn: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct GatewaySpec {
    pub role_arn: String,
    pub auth: GatewayAuth,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum GatewayAuth {
    Iam,
    Jwt {
        discovery_url: String,
        allowed_audience: Vec<String>,
        allowed_clients: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct GatewayTargetSpec {
    pub description: Option<String>,
    pub wiring: TargetWiring,
    pub credentials: TargetCredentials,
}

/// Where a gateway target actually dispatches to.
#[derive(Debug, Clone)]
pub enum TargetWiring {
    /// Tool defined inline by its schema; the platform hosts the stub.
    InlineSchema { schema: Value },
    OpenApi { endpoint: String },
    Lambda { lambda_arn: String },
    ApiGateway { api_id: String, stage: Option<String> },
}

#[derive(Debug, Clone)]
pub enum TargetCredentials {
    GatewayRole,
    OauthProvider { provider_arn: String },
    ApiKey { secret_ref: String },
}

#[derive(Debug, Clone)]
pub struct PolicyEngineSpec {
    pub gateway_arn: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RuntimeSpec {
    pub role_arn: String,
    pub container_uri: Option<String>,
    pub env: BTreeMap<String, String>,
    pub protocol: Option<packdock_core::config::Protocol>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalLevel {
    Session,
    Trace,
}

#[derive(Debug, Clone)]
pub struct RatingLevel {
    pub value: u32,
    pub label: String,
    pub definition: String,
}

#[derive(Debug, Clone)]
pub struct EvaluatorSpec {
    pub level: EvalLevel,
    pub instructions: String,
    pub model: String,
    pub rating_scale: Vec<RatingLevel>,
}

#[derive(Debug, Clone)]
pub struct OnlineEvalSpec {
    pub evaluator_ids: Vec<String>,
    pub sample_percentage: f64,
    pub log_group: String,
}

/// Gateway mutation used to attach a policy engine once all targets are
/// registered.
#[derive(Debug, Clone)]
pub struct GatewayUpdate {
    pub policy_engine_arn: String,
    pub enforcement_mode: String,
}

// ── the control plane ────────────────────────────────────────────────────

/// Raw control-plane operations, one family per resource kind.
///
/// Implementations perform single API calls and report status verbatim;
/// polling, adoption, and sequencing live in [`PlatformClient`]. Arguments
/// are owned so implementations can move them into their futures.
pub trait ControlPlane: Send + Sync {
    // memory
    fn create_memory(&self, name: String, spec: MemorySpec)
        -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn get_memory(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>>;
    fn list_memories(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>>;
    fn delete_memory(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>>;

    // agent runtime
    fn create_runtime(&self, name: String, spec: RuntimeSpec)
        -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn update_runtime(
        &self,
        arn: String,
        name: String,
        spec: RuntimeSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn get_runtime(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>>;
    fn list_runtimes(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>>;
    fn delete_runtime(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>>;

    // gateway + targets
    fn create_gateway(&self, name: String, spec: GatewaySpec)
        -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn update_gateway(
        &self,
        id: String,
        update: GatewayUpdate,
    ) -> BoxFuture<'_, Result<(), PlatformError>>;
    fn get_gateway(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>>;
    fn list_gateways(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>>;
    fn delete_gateway(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>>;
    fn create_gateway_target(
        &self,
        gateway_id: String,
        name: String,
        spec: GatewayTargetSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn list_gateway_targets(
        &self,
        gateway_id: String,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>>;
    fn delete_gateway_target(
        &self,
        gateway_id: String,
        target_id: String,
    ) -> BoxFuture<'_, Result<(), PlatformError>>;

    // policy engine + policies
    fn create_policy_engine(
        &self,
        name: String,
        spec: PolicyEngineSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn get_policy_engine(&self, id: String)
        -> BoxFuture<'_, Result<RemoteStatus, PlatformError>>;
    fn list_policy_engines(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>>;
    fn delete_policy_engine(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>>;
    fn create_policy(
        &self,
        engine_id: String,
        name: String,
        statement: String,
    ) -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn get_policy(
        &self,
        engine_id: String,
        policy_id: String,
    ) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>>;
    fn list_policies(
        &self,
        engine_id: String,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>>;
    fn delete_policy(
        &self,
        engine_id: String,
        policy_id: String,
    ) -> BoxFuture<'_, Result<(), PlatformError>>;

    // a2a endpoints — synthetic: the platform does no real work, but the
    // call surface exists so failures and adoption behave uniformly
    fn create_a2a_endpoint(
        &self,
        member: String,
        runtime_arn: String,
    ) -> BoxFuture<'_, Result<Created, PlatformError>>;

    // evaluators + online eval config
    fn create_evaluator(
        &self,
        name: String,
        spec: EvaluatorSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn get_evaluator(&self, id: String) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>>;
    fn list_evaluators(&self) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>>;
    fn delete_evaluator(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>>;
    fn create_online_eval_config(
        &self,
        name: String,
        spec: OnlineEvalSpec,
    ) -> BoxFuture<'_, Result<Created, PlatformError>>;
    fn get_online_eval_config(
        &self,
        id: String,
    ) -> BoxFuture<'_, Result<RemoteStatus, PlatformError>>;
    fn list_online_eval_configs(
        &self,
    ) -> BoxFuture<'_, Result<Vec<RemoteResource>, PlatformError>>;
    fn delete_online_eval_config(&self, id: String) -> BoxFuture<'_, Result<(), PlatformError>>;

    // observability plumbing
    fn ensure_log_group(&self, name: String) -> BoxFuture<'_, Result<(), PlatformError>>;
    fn put_dashboard(
        &self,
        name: String,
        body: Value,
    ) -> BoxFuture<'_, Result<(), PlatformError>>;
}
