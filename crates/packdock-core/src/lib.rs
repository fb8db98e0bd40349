//! packdock-core
//!
//! Pure domain types and helpers shared across the packdock workspace:
//! pack and deploy-config models, adapter state, derived-name rules,
//! the deployment error taxonomy, and the streamed event envelope.
//! No AWS dependency — this is the shared vocabulary of the adapter.

pub mod arn;
pub mod config;
pub mod error;
pub mod event;
pub mod names;
pub mod pack;
pub mod state;
pub mod tags;

pub use crate::config::{
    A2aAuth, A2aAuthMode, AgentOverride, ArenaConfig, ArenaToolSpec, DeployConfig,
    MemorySettings, MemoryStore, MemoryStrategy, Observability, Protocol, ToolsConfig,
};
pub use crate::error::{classify_message, DeployError, ErrorCategory, ErrorChain, ParseError};
pub use crate::event::{Event, EventResource, EventType, ResourceAction};
pub use crate::pack::{AgentsConfig, EvalDef, EvalParams, Pack, Prompt, ToolPolicy, ToolSpec};
pub use crate::state::{AdapterState, ResourceKey, ResourceKind, ResourceState, ResourceStatus};
