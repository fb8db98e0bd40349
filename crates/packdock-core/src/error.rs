//! Deployment error taxonomy.
//!
//! Every structured failure carries a category (classified from the
//! underlying platform message) and a stock remediation hint. Per-resource
//! failures during apply/destroy are collected into an [`ErrorChain`] —
//! order-preserving, but still a single error value for the response
//! envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal input decode failures, surfaced directly as the RPC error.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid pack JSON: {0}")]
    Pack(#[source] serde_json::Error),

    #[error("invalid deploy config JSON: {0}")]
    Config(#[source] serde_json::Error),

    #[error("invalid arena config JSON: {0}")]
    Arena(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Permission,
    Network,
    Timeout,
    Configuration,
    Resource,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permission => "permission",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Configuration => "configuration",
            Self::Resource => "resource",
        }
    }

    /// Stock remediation hint included in the formatted message.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::Permission => {
                "check that the caller role has the bedrock-agentcore permissions for this operation"
            }
            Self::Network => "check network connectivity and the configured region endpoint",
            Self::Timeout => "the platform did not settle in time; retry once the resource leaves its transitional state",
            Self::Configuration => "fix the deploy configuration and re-run validate_config",
            Self::Resource => "inspect the resource in the AWS console and re-apply",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword classification over the platform's error text,
/// case-insensitive. Order matters: the first matching category wins, and
/// `resource` is the default bucket.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_ascii_lowercase();

    const PERMISSION: &[&str] = &["access denied", "accessdenied", "unauthorized", "forbidden", "not authorized"];
    const NETWORK: &[&str] = &["connection refused", "connection reset", "dns", "tls", "unreachable", "no such host"];
    const TIMEOUT: &[&str] = &["timed out", "timeout", "deadline exceeded", "cancel", "did not become ready"];
    const CONFIGURATION: &[&str] = &["validation", "invalid", "malformed", "mismatch"];

    if PERMISSION.iter().any(|k| lower.contains(k)) {
        ErrorCategory::Permission
    } else if NETWORK.iter().any(|k| lower.contains(k)) {
        ErrorCategory::Network
    } else if TIMEOUT.iter().any(|k| lower.contains(k)) {
        ErrorCategory::Timeout
    } else if CONFIGURATION.iter().any(|k| lower.contains(k)) {
        ErrorCategory::Configuration
    } else {
        ErrorCategory::Resource
    }
}

/// A structured deployment failure for one resource operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployError {
    pub operation: String,
    pub resource_type: String,
    pub resource_name: String,
    pub category: ErrorCategory,
    pub message: String,
    pub remediation: String,
    pub cause: Option<String>,
}

impl DeployError {
    /// Build an error, classifying the category from the message (or the
    /// cause when present — the platform text lives there).
    pub fn new(
        operation: impl Into<String>,
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
        message: impl Into<String>,
        cause: Option<String>,
    ) -> Self {
        let message = message.into();
        let category = classify_message(cause.as_deref().unwrap_or(&message));
        Self {
            operation: operation.into(),
            resource_type: resource_type.into(),
            resource_name: resource_name.into(),
            category,
            remediation: category.remediation().to_string(),
            message,
            cause,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            operation: "validate".into(),
            resource_type: "config".into(),
            resource_name: String::new(),
            category: ErrorCategory::Configuration,
            remediation: ErrorCategory::Configuration.remediation().to_string(),
            message,
            cause: None,
        }
    }
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {:?} failed: {}",
            self.operation, self.resource_type, self.resource_name, self.message
        )?;
        if let Some(cause) = &self.cause {
            write!(f, " (cause: {cause})")?;
        }
        write!(f, " [hint: {}]", self.remediation)
    }
}

impl std::error::Error for DeployError {}

/// Accumulated non-fatal failures across an apply or destroy. Each entry
/// is preserved in arrival order; `Display` joins them with `"; "` so the
/// first failure leads the combined message.
#[derive(Debug, Clone, Default)]
pub struct ErrorChain {
    errors: Vec<DeployError>,
}

impl ErrorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: DeployError) {
        self.errors.push(error);
    }

    pub fn absorb(&mut self, mut other: ErrorChain) {
        self.errors.append(&mut other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[DeployError] {
        &self.errors
    }

    pub fn into_option(self) -> Option<ErrorChain> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for ErrorChain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorChain {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_buckets() {
        assert_eq!(classify_message("Access Denied for role"), ErrorCategory::Permission);
        assert_eq!(classify_message("connection refused"), ErrorCategory::Network);
        assert_eq!(classify_message("operation timed out"), ErrorCategory::Timeout);
        assert_eq!(classify_message("ValidationException: bad field"), ErrorCategory::Configuration);
        assert_eq!(classify_message("something odd happened"), ErrorCategory::Resource);
    }

    #[test]
    fn display_format_includes_cause_and_hint() {
        let e = DeployError::new(
            "create",
            "agent_runtime",
            "mypack",
            "create failed",
            Some("throttled".into()),
        );
        let s = e.to_string();
        assert!(s.starts_with("create agent_runtime \"mypack\" failed: create failed"));
        assert!(s.contains("(cause: throttled)"));
        assert!(s.contains("[hint: "));
    }

    #[test]
    fn chain_preserves_order() {
        let mut chain = ErrorChain::new();
        chain.push(DeployError::new("create", "memory", "m", "first", None));
        chain.push(DeployError::new("create", "evaluator", "e", "second", None));
        let s = chain.to_string();
        let first = s.find("first").unwrap();
        let second = s.find("second").unwrap();
        assert!(first < second);
        assert!(s.contains("; "));
    }
}
