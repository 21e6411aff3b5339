//! Event ingestion.
//!
//! A single task multiplexes the device and node event channels and applies
//! each event to the matching store. It is the only writer of both stores
//! and touches one store per event.

use crate::events::{DeviceEvent, EventKind, NodeEvent};
use crate::selector::PlacementGroup;
use crate::store::{DeviceCache, NodeRegistry, TwinRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consumes watch events and keeps `DeviceCache` / `NodeRegistry` current.
#[derive(Debug)]
pub struct EventIngester {
    devices: Arc<DeviceCache>,
    nodes: Arc<NodeRegistry>,
    device_events: Option<mpsc::Receiver<DeviceEvent>>,
    node_events: Option<mpsc::Receiver<NodeEvent>>,
    shutdown: CancellationToken,
}

impl EventIngester {
    /// Creates an ingester. `node_events` is `None` when node tracking is off.
    pub fn new(
        devices: Arc<DeviceCache>,
        nodes: Arc<NodeRegistry>,
        device_events: mpsc::Receiver<DeviceEvent>,
        node_events: Option<mpsc::Receiver<NodeEvent>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            devices,
            nodes,
            device_events: Some(device_events),
            node_events,
            shutdown,
        }
    }

    /// Runs until cancelled or until every inbound channel is closed.
    pub async fn run(mut self) {
        info!("Starting event ingester (node tracking: {})", self.node_events.is_some());

        loop {
            if self.device_events.is_none() && self.node_events.is_none() {
                info!("All event channels closed, stopping ingester");
                break;
            }

            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested, stopping ingester");
                    break;
                }
                event = next_event(&mut self.device_events) => match event {
                    Some(event) => self.apply_device_event(event).await,
                    None => {
                        warn!("Device event channel closed");
                        self.device_events = None;
                    }
                },
                event = next_event(&mut self.node_events) => match event {
                    Some(event) => self.apply_node_event(event).await,
                    None => {
                        warn!("Node event channel closed");
                        self.node_events = None;
                    }
                },
            }
        }
    }

    /// Applies one device event to the device cache.
    pub async fn apply_device_event(&self, event: DeviceEvent) {
        let device = event.object;
        match event.kind {
            EventKind::Deleted => {
                if self.devices.remove(&device.name).await {
                    debug!("Device deleted: {}", device.name);
                } else {
                    debug!("Device deleted but was not cached: {}", device.name);
                }
            }
            EventKind::Added | EventKind::Modified => {
                let mut seen = HashSet::new();
                for twin in &device.twins {
                    if !seen.insert(twin.property_name.as_str()) {
                        warn!(
                            "Device {} has more than one twin named '{}'; their metrics samples collapse into one",
                            device.name, twin.property_name
                        );
                    }
                }

                let placement = PlacementGroup::flatten(device.node_selector.as_ref());
                let twins: Vec<TwinRecord> = device
                    .twins
                    .into_iter()
                    .map(|twin| TwinRecord::new(twin, placement.clone()))
                    .collect();
                debug!(
                    "Device {:?}: {} ({} twins, {} placement groups)",
                    event.kind,
                    device.name,
                    twins.len(),
                    placement.len()
                );
                self.devices.upsert(device.name, twins).await;
            }
            EventKind::Unknown => {
                warn!("Unexpected event type for device {}, ignoring", device.name);
            }
        }
    }

    /// Applies one node event to the node registry.
    pub async fn apply_node_event(&self, event: NodeEvent) {
        let node = event.object;
        match event.kind {
            EventKind::Added | EventKind::Modified => {
                let now = chrono::Utc::now().timestamp();
                debug!("Node {:?}: {} at {}", event.kind, node.name, now);
                self.nodes.set(node.name, now).await;
            }
            EventKind::Deleted => {
                if self.nodes.remove(&node.name).await {
                    debug!("Node deleted: {}", node.name);
                } else {
                    debug!("Node deleted but was not registered: {}", node.name);
                }
            }
            EventKind::Unknown => {
                warn!("Unexpected event type for node {}, ignoring", node.name);
            }
        }
    }
}

/// Receives from an optional channel; a missing channel never yields.
async fn next_event<T>(channel: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match channel {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
