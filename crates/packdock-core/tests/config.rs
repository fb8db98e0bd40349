use std::collections::BTreeMap;

use packdock_core::config::{A2aAuth, A2aAuthMode, DeployConfig, MemoryStore, MemoryStrategy};

fn valid_config() -> DeployConfig {
    DeployConfig {
        region: "us-west-2".into(),
        runtime_role_arn: "arn:aws:iam::123456789012:role/test".into(),
        ..Default::default()
    }
}

#[test]
fn minimal_config_validates() {
    assert!(valid_config().validate().is_empty());
}

#[test]
fn bad_region_and_role_are_reported_together() {
    let config = DeployConfig {
        region: "US-WEST-2".into(),
        runtime_role_arn: "not-an-arn".into(),
        ..Default::default()
    };
    let errors = config.validate();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("region"));
    assert!(errors[1].contains("runtime_role_arn"));
}

#[test]
fn memory_store_scalar_alias() {
    let mut config = valid_config();
    config.memory_store = serde_json::from_str(r#""session""#).ok();
    let settings = config.memory_settings().unwrap().unwrap();
    assert_eq!(settings.strategies, vec![MemoryStrategy::Episodic]);
    assert_eq!(settings.event_expiry_days, 0);
}

#[test]
fn memory_store_array_dedupes_after_alias_resolution() {
    let mut config = valid_config();
    config.memory_store =
        serde_json::from_str(r#"["session", "episodic", "persistent", "semantic"]"#).ok();
    let settings = config.memory_settings().unwrap().unwrap();
    assert_eq!(
        settings.strategies,
        vec![MemoryStrategy::Episodic, MemoryStrategy::Semantic]
    );
}

#[test]
fn memory_store_object_form() {
    let mut config = valid_config();
    config.memory_store = serde_json::from_str(
        r#"{"strategies": ["summary"], "event_expiry_days": 30,
            "encryption_key_arn": "arn:aws:kms:us-west-2:123456789012:key/abc"}"#,
    )
    .ok();
    let settings = config.memory_settings().unwrap().unwrap();
    assert_eq!(settings.event_expiry_days, 30);
    assert!(settings.encryption_key_arn.is_some());
}

#[test]
fn memory_expiry_out_of_range() {
    let mut config = valid_config();
    config.memory_store = Some(MemoryStore::Detailed {
        strategies: vec!["episodic".into()],
        event_expiry_days: Some(2),
        encryption_key_arn: None,
    });
    let errors = config.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("event_expiry_days"));
}

#[test]
fn unknown_memory_strategy_is_an_error() {
    let mut config = valid_config();
    config.memory_store = Some(MemoryStore::Single("eidetic".into()));
    let errors = config.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("eidetic"));
}

#[test]
fn jwt_auth_requires_discovery_url() {
    let mut config = valid_config();
    config.a2a_auth = Some(A2aAuth {
        mode: A2aAuthMode::Jwt,
        discovery_url: None,
        allowed_audience: vec![],
        allowed_clients: vec![],
    });
    let errors = config.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("discovery_url"));
}

#[test]
fn iam_auth_with_audience_only_warns() {
    let mut config = valid_config();
    config.a2a_auth = Some(A2aAuth {
        mode: A2aAuthMode::Iam,
        discovery_url: None,
        allowed_audience: vec!["aud".into()],
        allowed_clients: vec![],
    });
    assert!(config.validate().is_empty());
    assert!(config
        .warnings()
        .iter()
        .any(|w| w.contains("allowed_audience")));
}

#[test]
fn tag_errors_fold_into_validate() {
    let mut config = valid_config();
    let mut tags = BTreeMap::new();
    tags.insert(String::new(), "v".into());
    config.tags = tags;
    let errors = config.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("tag keys"));
}

#[test]
fn container_image_override_wins() {
    let mut config = valid_config();
    config.container_image = Some("registry/base:latest".into());
    config.agent_overrides.insert(
        "worker".into(),
        serde_json::from_str(r#"{"container_image": "registry/worker:2"}"#).unwrap(),
    );
    assert_eq!(
        config.container_image_for("worker").as_deref(),
        Some("registry/worker:2")
    );
    assert_eq!(
        config.container_image_for("coordinator").as_deref(),
        Some("registry/base:latest")
    );
}

#[test]
fn protocol_field_decodes() {
    let config: DeployConfig = serde_json::from_str(
        r#"{"region": "us-east-1", "runtime_role_arn": "arn:aws:iam::123456789012:role/r",
            "protocol": "both"}"#,
    )
    .unwrap();
    assert_eq!(config.protocol, Some(packdock_core::config::Protocol::Both));
}
