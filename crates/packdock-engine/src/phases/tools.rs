//! Tool gateway targets.
//!
//! One logical resource per pack tool. The first target lazily creates
//! the shared parent gateway (see [`PlatformClient`]); every target's
//! state entry records the parent so the destroyer can find it.

use std::collections::BTreeMap;

use packdock_core::config::{A2aAuthMode, ArenaToolSpec};
use packdock_core::event::ResourceAction;
use packdock_core::names;
use packdock_core::state::{ResourceKind, ResourceState, ResourceStatus};

use crate::orchestrate::{ApplyCx, PhaseResult};
use crate::platform::{GatewayAuth, GatewaySpec, GatewayTargetSpec, TargetCredentials, TargetWiring};
use crate::progress::{percent, Band};

pub(crate) async fn run(cx: &mut ApplyCx<'_, '_>) -> PhaseResult {
    let mut result = PhaseResult::default();
    let total = cx.pack.tools.len();
    if total == 0 {
        return result;
    }

    let gateway_spec = GatewaySpec {
        role_arn: cx.config.runtime_role_arn.clone(),
        auth: gateway_auth(cx),
        tags: cx.tags(),
    };

    let tools: Vec<(String, Option<serde_json::Value>)> = cx
        .pack
        .tools
        .iter()
        .map(|(name, spec)| (name.clone(), spec.input_schema.clone()))
        .collect();

    for (i, (tool, input_schema)) in tools.iter().enumerate() {
        let kind = ResourceKind::ToolGateway;
        let name = names::tool_gateway_name(tool);

        if let Err(abort) =
            cx.emit_progress("Creating", &kind, &name, percent(Band::Tools, i, total))
        {
            result.aborted = Some(abort);
            return result;
        }

        let arena_spec = cx.arena.tools.get(tool);
        let target = GatewayTargetSpec {
            description: cx
                .pack
                .tools
                .get(tool)
                .and_then(|t| t.description.clone()),
            wiring: wiring_for(arena_spec, input_schema),
            credentials: credentials_for(arena_spec),
        };

        match cx
            .client
            .ensure_gateway_target(cx.ctx, &name, target, &gateway_spec)
            .await
        {
            Ok((created, gateway)) => {
                let mut metadata = BTreeMap::new();
                metadata.insert("id".to_string(), created.id);
                metadata.insert("tool".to_string(), tool.clone());
                metadata.insert("gateway_id".to_string(), gateway.id);
                metadata.insert("gateway_arn".to_string(), gateway.arn);
                metadata.insert("gateway_name".to_string(), gateway.name);
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

        if result.aborted.is_some() || result.cancelled {
            return result;
        }
    }

    result
}

fn gateway_auth(cx: &ApplyCx<'_, '_>) -> GatewayAuth {
    match &cx.config.a2a_auth {
        Some(auth) if auth.mode == A2aAuthMode::Jwt => GatewayAuth::Jwt {
            discovery_url: auth.discovery_url.clone().unwrap_or_default(),
            allowed_audience: auth.allowed_audience.clone(),
            allowed_clients: auth.allowed_clients.clone(),
        },
        _ => GatewayAuth::Iam,
    }
}

/// Arena wiring wins over the pack's inline schema.
fn wiring_for(arena: Option<&ArenaToolSpec>, input_schema: &Option<serde_json::Value>) -> TargetWiring {
    if let Some(spec) = arena {
        if let Some(endpoint) = &spec.endpoint {
            return TargetWiring::OpenApi {
                endpoint: endpoint.clone(),
            };
        }
        if let Some(lambda_arn) = &spec.lambda_arn {
            return TargetWiring::Lambda {
                lambda_arn: lambda_arn.clone(),
            };
        }
        if let Some(binding) = &spec.api_gateway {
            return TargetWiring::ApiGateway {
                api_id: binding.api_id.clone(),
                stage: binding.stage.clone(),
            };
        }
    }
    TargetWiring::InlineSchema {
        schema: input_schema
            .clone()
            .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
    }
}

fn credentials_for(arena: Option<&ArenaToolSpec>) -> TargetCredentials {
    let Some(creds) = arena.and_then(|s| s.credentials.as_ref()) else {
        return TargetCredentials::GatewayRole;
    };
    if let Some(provider_arn) = &creds.provider_arn {
        TargetCredentials::OauthProvider {
            provider_arn: provider_arn.clone(),
        }
    } else if let Some(secret_ref) = &creds.api_key_ref {
        TargetCredentials::ApiKey {
            secret_ref: secret_ref.clone(),
        }
    } else {
        TargetCredentials::GatewayRole
    }
}
