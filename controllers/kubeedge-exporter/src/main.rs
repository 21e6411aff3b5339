//! KubeEdge Exporter
//!
//! Projects KubeEdge `Device` twins and cluster `Node` presence into an
//! in-memory view and serves it over HTTP.
//!
//! - `GET /` renders every device twin with the nodes its selector matches
//! - `GET /metrics` exposes the twins of one fixed device as Prometheus gauges

mod config;
mod controller;
mod error;
mod events;
mod ingester;
mod presenter;
mod selector;
mod store;
mod test_utils;
mod watcher;


use crate::config::ExporterConfig;
use crate::error::ControllerError;
use controller::Controller;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube's rustls stack needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    info!("Starting KubeEdge Exporter");

    // Load configuration from environment variables
    let config = ExporterConfig::from_env()?;

    info!("Configuration:");
    info!("  API server: {}", config.api_server.as_deref().unwrap_or("from kubeconfig"));
    info!("  Kubeconfig: {}", config.kubeconfig_path.as_deref().unwrap_or("inferred"));
    info!("  Namespace: {}", config.namespace);
    info!("  Listen: {}", config.listen_addr());
    info!("  Track nodes: {}", config.track_nodes);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    shutdown.cancel();
                }
                Err(e) => warn!("Could not listen for shutdown signal: {}", e),
            }
        });
    }

    // Initialize and run controller
    let controller = Controller::new(&config, shutdown).await?;
    controller.run().await?;

    Ok(())
}
