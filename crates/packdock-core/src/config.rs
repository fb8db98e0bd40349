//! Deploy configuration: decode, normalization, and validation.
//!
//! `DeployConfig` is the host-supplied deployment input. `validate()`
//! returns every problem found as a plain string so the RPC layer can
//! hand the full list back in one response; `warnings()` returns the
//! non-fatal findings surfaced by `validate_config`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::arn;
use crate::tags;

static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[a-z]+-\d+$").expect("region regex"));

/// Memory event expiry bounds (days). 0 means "platform default".
pub const MEMORY_EXPIRY_MIN: i64 = 3;
pub const MEMORY_EXPIRY_MAX: i64 = 365;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub runtime_role_arn: String,
    #[serde(default)]
    pub memory_store: Option<MemoryStore>,
    #[serde(default)]
    pub tools: Option<ToolsConfig>,
    #[serde(default)]
    pub observability: Option<Observability>,
    #[serde(default)]
    pub a2a_auth: Option<A2aAuth>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub container_image: Option<String>,
    #[serde(default)]
    pub agent_overrides: BTreeMap<String, AgentOverride>,
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// Environment injected into every runtime. Populated phase by phase
    /// during apply (MEMORY_ID, POLICY_ENGINE_ARN, A2A_AGENTS); never
    /// serialized back to the host.
    #[serde(skip)]
    pub runtime_env_vars: BTreeMap<String, String>,
}

impl DeployConfig {
    pub fn from_json(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }

    /// Resolve the `memory_store` union into concrete settings.
    ///
    /// `Ok(None)` means no memory is configured. Alias resolution and
    /// deduplication happen here; bounds problems come back as strings so
    /// `validate()` can fold them into its list.
    pub fn memory_settings(&self) -> Result<Option<MemorySettings>, Vec<String>> {
        let Some(store) = &self.memory_store else {
            return Ok(None);
        };

        let (raw, expiry, key) = match store {
            MemoryStore::Single(s) => (vec![s.clone()], 0, None),
            MemoryStore::List(v) => (v.clone(), 0, None),
            MemoryStore::Detailed {
                strategies,
                event_expiry_days,
                encryption_key_arn,
            } => (
                strategies.clone(),
                event_expiry_days.unwrap_or(0),
                encryption_key_arn.clone(),
            ),
        };

        let mut errors = Vec::new();
        let mut strategies: Vec<MemoryStrategy> = Vec::new();
        for s in &raw {
            match s.parse::<MemoryStrategy>() {
                Ok(st) => {
                    if !strategies.contains(&st) {
                        strategies.push(st);
                    }
                }
                Err(()) => errors.push(format!(
                    "memory_store: unknown strategy {s:?} (expected one of episodic, semantic, summary, user_preference)"
                )),
            }
        }

        if strategies.is_empty() && errors.is_empty() {
            errors.push("memory_store: at least one strategy is required".into());
        }

        if expiry != 0 && !(MEMORY_EXPIRY_MIN..=MEMORY_EXPIRY_MAX).contains(&expiry) {
            errors.push(format!(
                "memory_store: event_expiry_days must be 0 or between {MEMORY_EXPIRY_MIN} and {MEMORY_EXPIRY_MAX}, got {expiry}"
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Some(MemorySettings {
            strategies,
            event_expiry_days: expiry,
            encryption_key_arn: key,
        }))
    }

    /// Hard validation errors. Empty vec means the config is deployable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !REGION_RE.is_match(&self.region) {
            errors.push(format!(
                "region {:?} is not a valid AWS region identifier",
                self.region
            ));
        }

        if !arn::is_role_arn(&self.runtime_role_arn) {
            errors.push(format!(
                "runtime_role_arn {:?} is not a valid IAM role ARN",
                self.runtime_role_arn
            ));
        }

        if let Err(mut memory_errors) = self.memory_settings() {
            errors.append(&mut memory_errors);
        }

        if let Some(auth) = &self.a2a_auth {
            if auth.mode == A2aAuthMode::Jwt
                && auth.discovery_url.as_deref().unwrap_or("").is_empty()
            {
                errors.push("a2a_auth: jwt mode requires a discovery_url".into());
            }
        }

        errors.extend(tags::validate_tags(&self.tags));
        errors
    }

    /// Non-fatal findings, reported by `validate_config` with a
    /// `"warning: "` prefix.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.observability.is_none() {
            warnings
                .push("no observability configured; traces will not be forwarded".into());
        }

        if let Some(auth) = &self.a2a_auth {
            if auth.mode == A2aAuthMode::Iam
                && !(auth.allowed_audience.is_empty() && auth.allowed_clients.is_empty())
            {
                warnings.push(
                    "a2a_auth: allowed_audience and allowed_clients are ignored in iam mode"
                        .into(),
                );
            }
        }

        if self.tags.len() > tags::MAX_TAGS - 10 {
            warnings.push(format!(
                "{} tags configured; the platform limit is {}",
                self.tags.len(),
                tags::MAX_TAGS
            ));
        }

        if self.dry_run {
            warnings.push("dry_run is set; apply will record a plan without mutating the platform".into());
        }

        warnings
    }

    /// Container image for a runtime, with per-agent overrides winning.
    pub fn container_image_for(&self, member: &str) -> Option<String> {
        self.agent_overrides
            .get(member)
            .and_then(|o| o.container_image.clone())
            .or_else(|| self.container_image.clone())
    }
}

/// The `memory_store` config field: a scalar alias, a strategy list, or a
/// full object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemoryStore {
    Single(String),
    List(Vec<String>),
    Detailed {
        strategies: Vec<String>,
        #[serde(default)]
        event_expiry_days: Option<i64>,
        #[serde(default)]
        encryption_key_arn: Option<String>,
    },
}

/// Resolved memory configuration after alias and dedup handling.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySettings {
    pub strategies: Vec<MemoryStrategy>,
    pub event_expiry_days: i64,
    pub encryption_key_arn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStrategy {
    Episodic,
    Semantic,
    Summary,
    UserPreference,
}

impl FromStr for MemoryStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "episodic" | "session" => Ok(Self::Episodic),
            "semantic" | "persistent" => Ok(Self::Semantic),
            "summary" => Ok(Self::Summary),
            "user_preference" => Ok(Self::UserPreference),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MemoryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Summary => "summary",
            Self::UserPreference => "user_preference",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub code_interpreter: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observability {
    #[serde(default)]
    pub cloudwatch_log_group: Option<String>,
    #[serde(default)]
    pub tracing_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aAuth {
    pub mode: A2aAuthMode,
    #[serde(default)]
    pub discovery_url: Option<String>,
    #[serde(default)]
    pub allowed_audience: Vec<String>,
    #[serde(default)]
    pub allowed_clients: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum A2aAuthMode {
    Iam,
    Jwt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Http,
    A2a,
    Both,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentOverride {
    #[serde(default)]
    pub container_image: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub protocol: Option<Protocol>,
}

/// Per-tool wiring supplied by the host arena: where each pack tool
/// actually lives (HTTP endpoint, Lambda, or API Gateway binding) and how
/// the gateway authenticates to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenaConfig {
    #[serde(default)]
    pub tools: BTreeMap<String, ArenaToolSpec>,
}

impl ArenaConfig {
    pub fn from_json(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenaToolSpec {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub lambda_arn: Option<String>,
    #[serde(default)]
    pub api_gateway: Option<ApiGatewayBinding>,
    #[serde(default)]
    pub credentials: Option<CredentialConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiGatewayBinding {
    pub api_id: String,
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub provider_arn: Option<String>,
    #[serde(default)]
    pub api_key_ref: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
}
