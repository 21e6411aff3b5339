//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the watchers,
//! the event ingester and the HTTP presenter together and supervises the
//! resulting background tasks.

use crate::config::ExporterConfig;
use crate::error::ControllerError;
use crate::ingester::EventIngester;
use crate::presenter::{router, AppState};
use crate::store::{DeviceCache, NodeRegistry};
use crate::watcher::Watcher;
use crds::Device;
use k8s_openapi::api::core::v1::Node;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main controller for the KubeEdge exporter.
#[derive(Debug)]
pub struct Controller {
    device_watcher: JoinHandle<Result<(), ControllerError>>,
    node_watcher: Option<JoinHandle<Result<(), ControllerError>>>,
    ingester: JoinHandle<()>,
    server: JoinHandle<Result<(), ControllerError>>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    ///
    /// Fails if the Kubernetes client cannot be built or the HTTP listener
    /// cannot be bound.
    pub async fn new(config: &ExporterConfig, shutdown: CancellationToken) -> Result<Self, ControllerError> {
        info!("Initializing KubeEdge exporter");

        // Create Kubernetes client
        let kube_client = build_client(config).await?;
        let device_api: Api<Device> = Api::namespaced(kube_client.clone(), &config.namespace);
        let node_api: Api<Node> = Api::all(kube_client);

        // Bind first so an unusable listen address aborts startup
        let listen_addr = config.listen_addr();
        let listener = TcpListener::bind(&listen_addr)
            .await
            .map_err(|e| ControllerError::Server(format!("could not listen on {}: {}", listen_addr, e)))?;
        info!("Listening on {}", listen_addr);

        let devices = Arc::new(DeviceCache::new());
        let nodes = Arc::new(NodeRegistry::new());

        // Capacity 1: a slow ingester stalls the watchers
        let (device_tx, device_rx) = mpsc::channel(1);
        let (node_tx, node_rx) = if config.track_nodes {
            let (tx, rx) = mpsc::channel(1);
            (Some(tx), Some(rx))
        } else {
            info!("Node tracking disabled");
            (None, None)
        };

        let watcher = Arc::new(Watcher::new(device_api, node_api, shutdown.clone()));

        let device_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_devices(device_tx).await })
        };

        let node_watcher = node_tx.map(|tx| {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_nodes(tx).await })
        });

        let ingester = EventIngester::new(devices.clone(), nodes.clone(), device_rx, node_rx, shutdown.clone());
        let ingester = tokio::spawn(ingester.run());

        let app = router(AppState::new(devices, nodes));
        let server = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await
                    .map_err(|e| ControllerError::Server(format!("HTTP server failed: {}", e)))
            })
        };

        Ok(Self {
            device_watcher,
            node_watcher,
            ingester,
            server,
            shutdown,
        })
    }

    /// Runs the controller until shutdown or until any task exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("KubeEdge exporter running");

        let result = tokio::select! {
            result = &mut self.server => task_result(result, "HTTP server"),
            result = &mut self.device_watcher => task_result(result, "Device watcher"),
            result = wait_optional(&mut self.node_watcher) => task_result(result, "Node watcher"),
            result = &mut self.ingester => result
                .map_err(|e| ControllerError::Watch(format!("Event ingester panicked: {}", e))),
        };

        // take the remaining tasks down with whichever one ended first
        self.shutdown.cancel();
        info!("KubeEdge exporter stopped");
        result
    }
}

/// Builds the Kubernetes client from an explicit kubeconfig or the inferred
/// environment, applying the API server override if one is configured.
async fn build_client(config: &ExporterConfig) -> Result<Client, ControllerError> {
    let mut kube_config = match &config.kubeconfig_path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                ControllerError::InvalidConfig(format!("could not read kubeconfig {}: {}", path, e))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| ControllerError::InvalidConfig(format!("could not load kubeconfig {}: {}", path, e)))?
        }
        None => Config::infer().await.map_err(|e| {
            ControllerError::InvalidConfig(format!("could not infer Kubernetes configuration: {}", e))
        })?,
    };

    if let Some(server) = &config.api_server {
        kube_config.cluster_url = server
            .parse()
            .map_err(|e| ControllerError::InvalidConfig(format!("invalid API server URL {}: {}", server, e)))?;
    }
    info!("Kubernetes API server: {}", kube_config.cluster_url);

    Ok(Client::try_from(kube_config)?)
}

async fn wait_optional<T>(handle: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn task_result(
    result: Result<Result<(), ControllerError>, JoinError>,
    task: &str,
) -> Result<(), ControllerError> {
    result.map_err(|e| ControllerError::Watch(format!("{} panicked: {}", task, e)))?
}
