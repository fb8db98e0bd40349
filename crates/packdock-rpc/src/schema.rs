//! JSON Schema for the deploy configuration, handed to the host through
//! `get_provider_info` so it can validate and template configs without
//! round-tripping through `validate_config`.

use serde_json::{json, Value};

use packdock_core::names::NAME_PATTERN;

pub fn config_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "packdock deploy configuration",
        "type": "object",
        "required": ["region", "runtime_role_arn"],
        "additionalProperties": false,
        "properties": {
            "region": {
                "type": "string",
                "pattern": "^[a-z]{2}-[a-z]+-\\d+$",
                "description": "AWS region the pack deploys into"
            },
            "runtime_role_arn": {
                "type": "string",
                "pattern": "^arn:aws[a-z-]*:iam::\\d{12}:role/.+$",
                "description": "IAM role assumed by every agent runtime"
            },
            "memory_store": {
                "description": "Memory configuration: a strategy alias, a strategy list, or the full object form",
                "oneOf": [
                    {"type": "string"},
                    {"type": "array", "items": {"type": "string"}},
                    {
                        "type": "object",
                        "required": ["strategies"],
                        "properties": {
                            "strategies": {"type": "array", "items": {"type": "string"}},
                            "event_expiry_days": {"type": "integer", "minimum": 0, "maximum": 365},
                            "encryption_key_arn": {"type": "string"}
                        }
                    }
                ]
            },
            "tools": {
                "type": "object",
                "properties": {
                    "code_interpreter": {"type": "boolean"}
                }
            },
            "observability": {
                "type": "object",
                "properties": {
                    "cloudwatch_log_group": {"type": "string"},
                    "tracing_enabled": {"type": "boolean"}
                }
            },
            "a2a_auth": {
                "type": "object",
                "required": ["mode"],
                "properties": {
                    "mode": {"enum": ["iam", "jwt"]},
                    "discovery_url": {"type": "string"},
                    "allowed_audience": {"type": "array", "items": {"type": "string"}},
                    "allowed_clients": {"type": "array", "items": {"type": "string"}}
                }
            },
            "tags": {
                "type": "object",
                "additionalProperties": {"type": "string"}
            },
            "dry_run": {"type": "boolean"},
            "container_image": {"type": "string"},
            "agent_overrides": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "container_image": {"type": "string"},
                        "env": {"type": "object", "additionalProperties": {"type": "string"}},
                        "protocol": {"enum": ["http", "a2a", "both"]}
                    }
                }
            },
            "protocol": {"enum": ["http", "a2a", "both"]}
        },
        "x-name-pattern": NAME_PATTERN
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_self_consistent() {
        let schema = config_schema();
        assert_eq!(schema["type"], "object");
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&Value::from("region")));
        assert!(required.contains(&Value::from("runtime_role_arn")));
        // Every documented config key is present.
        for key in [
            "memory_store",
            "tools",
            "observability",
            "a2a_auth",
            "tags",
            "dry_run",
            "container_image",
            "agent_overrides",
        ] {
            assert!(schema["properties"].get(key).is_some(), "{key}");
        }
    }
}
