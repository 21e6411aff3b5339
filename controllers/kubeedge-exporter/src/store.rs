//! In-memory projection of the watched resources.
//!
//! `DeviceCache` and `NodeRegistry` each own an independent lock. Callers
//! only see whole-value operations; snapshots clone out under the read lock
//! and release it before any rendering happens.

use crate::selector::PlacementGroup;
use crds::{Twin, TwinProperty};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A device property as projected for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwinRecord {
    pub name: String,
    pub actual: TwinProperty,
    pub expected: TwinProperty,
    /// Copy of the owning device's placement groups
    pub placement: Vec<PlacementGroup>,
}

impl TwinRecord {
    pub fn new(twin: Twin, placement: Vec<PlacementGroup>) -> Self {
        Self {
            name: twin.property_name,
            actual: twin.reported,
            expected: twin.desired,
            placement,
        }
    }
}

/// Twin list of one device. Shared so snapshots never copy twin data.
pub type TwinList = Arc<[TwinRecord]>;

/// Point-in-time copy of the device cache, ordered by device name.
pub type DeviceSnapshot = BTreeMap<String, TwinList>;

/// Point-in-time copy of the node registry: name -> last transition (epoch seconds).
pub type NodeSnapshot = BTreeMap<String, i64>;

/// Device name -> current twin list.
#[derive(Debug, Default)]
pub struct DeviceCache {
    devices: RwLock<BTreeMap<String, TwinList>>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole twin list of `name`.
    pub async fn upsert(&self, name: impl Into<String>, twins: Vec<TwinRecord>) {
        let twins: TwinList = twins.into();
        self.devices.write().await.insert(name.into(), twins);
    }

    /// Drops `name`; returns whether it was cached.
    pub async fn remove(&self, name: &str) -> bool {
        self.devices.write().await.remove(name).is_some()
    }

    #[cfg(test)]
    pub async fn get(&self, name: &str) -> Option<TwinList> {
        self.devices.read().await.get(name).cloned()
    }

    pub async fn snapshot(&self) -> DeviceSnapshot {
        self.devices.read().await.clone()
    }
}

/// Node name -> last Added/Modified observation.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<BTreeMap<String, i64>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, name: impl Into<String>, last_transition: i64) {
        self.nodes.write().await.insert(name.into(), last_transition);
    }

    /// Drops `name`; returns whether it was registered.
    pub async fn remove(&self, name: &str) -> bool {
        self.nodes.write().await.remove(name).is_some()
    }

    #[cfg(test)]
    pub async fn get(&self, name: &str) -> Option<i64> {
        self.nodes.read().await.get(name).copied()
    }

    pub async fn snapshot(&self) -> NodeSnapshot {
        self.nodes.read().await.clone()
    }
}
