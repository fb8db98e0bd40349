use std::sync::Arc;

use packdock_core::config::DeployConfig;
use packdock_engine::platform::{ControlPlane, SimulatedControlPlane};
use packdock_rpc::{BackendFactory, Server};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Logs go to stderr so they never interleave with the protocol on
    // stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "packdock adapter starting");

    // One control plane per request so the gateway cache never crosses
    // applies. This binary wires the in-memory backend (dry runs, local
    // development, conformance tests); deployable builds embed the AWS
    // control-plane binding through the same factory.
    let backend: BackendFactory = Arc::new(|config: &DeployConfig| {
        Arc::new(SimulatedControlPlane::new(config.region.clone())) as Arc<dyn ControlPlane>
    });

    Server::new(backend).run().await
}
