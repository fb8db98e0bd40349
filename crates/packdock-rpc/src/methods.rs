//! Method dispatch: the adapter's verbs over the JSON-RPC channel.
//!
//! Parsing and validation failures surface immediately as the response
//! error. Apply and destroy stream `event` notifications through the
//! output writer before their terminal response; when apply ends with an
//! accumulated error the response is a server error whose `data` still
//! carries the serialized state — the host must persist it regardless.

use std::io::Write;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use packdock_core::config::{ArenaConfig, DeployConfig};
use packdock_core::error::ParseError;
use packdock_core::event::Event;
use packdock_core::names;
use packdock_core::pack::Pack;
use packdock_core::state::parse_prior_state;
use packdock_engine::orchestrate::CallbackError;
use packdock_engine::platform::{ControlPlane, PlatformClient};

use crate::protocol::{JsonRpcError, JsonRpcNotification};
use crate::schema;

/// Produces the control plane for one request. A fresh client per request
/// keeps the gateway cache from leaking across applies; the deployable
/// build embeds the AWS binding through this same seam.
pub type BackendFactory = Arc<dyn Fn(&DeployConfig) -> Arc<dyn ControlPlane> + Send + Sync>;

pub struct Handler {
    backend: BackendFactory,
}

#[derive(Debug, Deserialize)]
struct ValidateConfigParams {
    config: String,
}

#[derive(Debug, Deserialize)]
struct PlanParams {
    pack_json: String,
    deploy_config: String,
    #[serde(default)]
    arena_config: Option<String>,
    #[serde(default)]
    prior_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyParams {
    deploy_config: String,
    #[serde(default)]
    prior_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    deploy_config: String,
    #[serde(default)]
    prior_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiagnoseParams {
    #[serde(default)]
    deploy_config: Option<String>,
    #[serde(default)]
    prior_state: Option<String>,
}

impl Handler {
    pub fn new(backend: BackendFactory) -> Self {
        Self { backend }
    }

    pub async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
        out: &mut (dyn Write + Send),
    ) -> Result<Value, JsonRpcError> {
        match method {
            "get_provider_info" => Ok(provider_info()),
            "validate_config" => validate_config(decode(params)?),
            "plan" => plan(decode(params)?),
            "apply" => self.apply(decode(params)?, out).await,
            "destroy" => self.destroy(decode(params)?, out).await,
            "status" => self.status(decode(params)?).await,
            "diagnose" => Ok(diagnose(decode(params)?)),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    async fn apply(
        &self,
        params: PlanParams,
        out: &mut (dyn Write + Send),
    ) -> Result<Value, JsonRpcError> {
        let (pack, mut config, arena) = parse_inputs(&params)?;
        validate_inputs(&pack, &config)?;

        let plane = (self.backend)(&config);
        let client = PlatformClient::new(plane);
        let ctx = CancellationToken::new();
        let mut sink =
            |event: &Event| -> Result<(), CallbackError> { write_event(&mut *out, event) };

        let outcome = packdock_engine::apply(
            &client,
            &pack,
            &mut config,
            &arena,
            params.prior_state.as_deref().unwrap_or(""),
            &ctx,
            &mut sink,
        )
        .await
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

        let adapter_state = outcome
            .state
            .to_json()
            .map_err(|e| JsonRpcError::server_error(e.to_string(), None))?;

        if let Some(abort) = outcome.aborted {
            return Err(JsonRpcError::server_error(
                abort.to_string(),
                Some(json!({"adapter_state": adapter_state})),
            ));
        }
        if let Some(chain) = outcome.error {
            return Err(JsonRpcError::server_error(
                chain.to_string(),
                Some(json!({"adapter_state": adapter_state})),
            ));
        }
        Ok(json!({ "adapter_state": adapter_state }))
    }

    async fn destroy(
        &self,
        params: DestroyParams,
        out: &mut (dyn Write + Send),
    ) -> Result<Value, JsonRpcError> {
        let config = DeployConfig::from_json(&params.deploy_config)
            .map_err(|e| JsonRpcError::invalid_params(format!("invalid deploy config JSON: {e}")))?;

        let plane = (self.backend)(&config);
        let client = PlatformClient::new(plane);
        let ctx = CancellationToken::new();
        let mut sink =
            |event: &Event| -> Result<(), CallbackError> { write_event(&mut *out, event) };

        let outcome = packdock_engine::destroy(
            &client,
            params.prior_state.as_deref().unwrap_or(""),
            &ctx,
            &mut sink,
        )
        .await;

        if let Some(abort) = outcome.aborted {
            return Err(JsonRpcError::server_error(abort.to_string(), None));
        }
        // Per-resource teardown failures were already streamed as error
        // events; the terminal result stays clean (best-effort contract).
        Ok(json!({}))
    }

    async fn status(&self, params: StatusParams) -> Result<Value, JsonRpcError> {
        let config = DeployConfig::from_json(&params.deploy_config)
            .map_err(|e| JsonRpcError::invalid_params(format!("invalid deploy config JSON: {e}")))?;

        let plane = (self.backend)(&config);
        let client = PlatformClient::new(plane);
        let report =
            packdock_engine::status(&client, params.prior_state.as_deref().unwrap_or("")).await;
        serde_json::to_value(report).map_err(|e| JsonRpcError::server_error(e.to_string(), None))
    }
}

fn provider_info() -> Value {
    json!({
        "name": "agentcore",
        "version": env!("CARGO_PKG_VERSION"),
        "capabilities": ["plan", "apply", "destroy", "status", "diagnose"],
        "config_schema": schema::config_schema().to_string(),
    })
}

fn validate_config(params: ValidateConfigParams) -> Result<Value, JsonRpcError> {
    let config = match DeployConfig::from_json(&params.config) {
        Ok(config) => config,
        Err(e) => {
            return Ok(json!({
                "valid": false,
                "errors": [format!("invalid deploy config JSON: {e}")],
            }))
        }
    };

    let errors = config.validate();
    let valid = errors.is_empty();
    let mut reported = errors;
    reported.extend(config.warnings().into_iter().map(|w| format!("warning: {w}")));

    Ok(json!({ "valid": valid, "errors": reported }))
}

fn plan(params: PlanParams) -> Result<Value, JsonRpcError> {
    let (pack, config, _arena) = parse_inputs(&params)?;
    validate_inputs(&pack, &config)?;

    let prior = packdock_core::state::prior_index(params.prior_state.as_deref().unwrap_or(""));
    let (changes, summary) = packdock_engine::plan(&pack, &config, &prior);

    Ok(json!({ "changes": changes, "summary": summary }))
}

fn diagnose(params: DiagnoseParams) -> Value {
    let mut checks = Vec::new();

    match &params.deploy_config {
        Some(blob) => match DeployConfig::from_json(blob) {
            Ok(config) => {
                let errors = config.validate();
                if errors.is_empty() {
                    checks.push(check("config", "ok", "deploy config is valid"));
                } else {
                    checks.push(check("config", "fail", &errors.join("; ")));
                }
                for warning in config.warnings() {
                    checks.push(check("config", "warn", &warning));
                }
            }
            Err(e) => checks.push(check("config", "fail", &format!("not parseable: {e}"))),
        },
        None => checks.push(check("config", "warn", "no deploy config supplied")),
    }

    match &params.prior_state {
        Some(blob) if !blob.trim().is_empty() => match parse_prior_state(blob) {
            Some(state) => checks.push(check(
                "prior_state",
                "ok",
                &format!("{} resources recorded", state.resources.len()),
            )),
            None => checks.push(check(
                "prior_state",
                "warn",
                "prior state is malformed and will be treated as empty",
            )),
        },
        _ => checks.push(check("prior_state", "ok", "no prior deployment")),
    }

    json!({ "checks": checks })
}

fn check(name: &str, status: &str, message: &str) -> Value {
    json!({ "name": name, "status": status, "message": message })
}

fn parse_inputs(
    params: &PlanParams,
) -> Result<(Pack, DeployConfig, ArenaConfig), JsonRpcError> {
    let pack = Pack::from_json(&params.pack_json)
        .map_err(|e| JsonRpcError::invalid_params(ParseError::Pack(e).to_string()))?;
    let config = DeployConfig::from_json(&params.deploy_config)
        .map_err(|e| JsonRpcError::invalid_params(ParseError::Config(e).to_string()))?;
    let arena = match &params.arena_config {
        Some(blob) => ArenaConfig::from_json(blob)
            .map_err(|e| JsonRpcError::invalid_params(ParseError::Arena(e).to_string()))?,
        None => ArenaConfig::default(),
    };
    Ok((pack, config, arena))
}

/// Config and derived-name validation, run before any platform call. A
/// single bad name fails the whole request.
fn validate_inputs(pack: &Pack, config: &DeployConfig) -> Result<(), JsonRpcError> {
    let mut problems = config.validate();
    problems.extend(names::validate_derived_names(pack, config));
    if problems.is_empty() {
        Ok(())
    } else {
        Err(JsonRpcError::invalid_params(problems.join("; ")))
    }
}

fn write_event(out: &mut (dyn Write + Send), event: &Event) -> Result<(), CallbackError> {
    let line = serde_json::to_string(&JsonRpcNotification::event(event))
        .map_err(|e| CallbackError(e.to_string()))?;
    writeln!(out, "{line}")
        .and_then(|_| out.flush())
        .map_err(|e| CallbackError(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}
