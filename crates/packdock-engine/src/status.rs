//! Deployment status aggregation.
//!
//! Probes every resource in prior state and rolls the answers up:
//! everything healthy → `deployed`, anything else → `degraded`, nothing
//! deployed → `not_deployed`. The state blob is round-tripped unchanged.

use serde::{Deserialize, Serialize};

use packdock_core::state::parse_prior_state;

use crate::platform::{PlatformClient, ResourceHealth};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    pub resources: Vec<StatusEntry>,
    pub state: String,
}

pub async fn status(client: &PlatformClient, prior_blob: &str) -> StatusReport {
    let Some(state) = parse_prior_state(prior_blob) else {
        return StatusReport {
            status: "not_deployed".to_string(),
            resources: Vec::new(),
            state: prior_blob.to_string(),
        };
    };

    if state.resources.is_empty() {
        return StatusReport {
            status: "not_deployed".to_string(),
            resources: Vec::new(),
            state: prior_blob.to_string(),
        };
    }

    let mut entries = Vec::with_capacity(state.resources.len());
    let mut all_healthy = true;

    for rs in &state.resources {
        let health = client.probe(rs).await;
        if health != ResourceHealth::Healthy {
            all_healthy = false;
        }
        entries.push(StatusEntry {
            kind: rs.kind.as_str().to_string(),
            name: rs.name.clone(),
            status: match health {
                ResourceHealth::Healthy => "healthy",
                ResourceHealth::Unhealthy => "unhealthy",
                ResourceHealth::Missing => "missing",
            }
            .to_string(),
        });
    }

    StatusReport {
        status: if all_healthy { "deployed" } else { "degraded" }.to_string(),
        resources: entries,
        state: prior_blob.to_string(),
    }
}
