//! Cedar policy compilation.
//!
//! Translates a prompt's declarative tool blocklist into standalone
//! `forbid` statements against the gateway's action schema. Only
//! blocklists compile: validators and the max-rounds / max-tool-calls
//! limits are enforced at runtime by the agent harness and must never
//! produce statements here.

use std::collections::BTreeSet;

/// Compile a blocklist into one standalone statement per entry.
///
/// Entries whose tool is not registered with the gateway are dropped —
/// unregistered actions cannot be referenced in the platform's policy
/// schema. The platform rejects multi-statement policies, so each
/// returned string is a complete policy on its own.
pub fn compile_blocklist(
    blocklist: &[String],
    registered_tools: &BTreeSet<String>,
    gateway_arn: &str,
) -> Vec<String> {
    let mut statements = Vec::new();

    for tool in blocklist {
        if !registered_tools.contains(tool) {
            tracing::warn!(
                tool = %tool,
                "blocklisted tool is not registered with the gateway; dropping entry"
            );
            continue;
        }

        let escaped = escape(tool);
        statements.push(format!(
            "forbid (principal,\n        action == Platform::Action::\"{escaped}___{escaped}\",\n        resource == Platform::Gateway::\"{gateway_arn}\");"
        ));
    }

    statements
}

/// Escape double quotes and backslashes for embedding in a Cedar string.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
