//! Typed watch events delivered to the ingester.
//!
//! Objects are converted into payload records at the watch boundary, so the
//! ingester only ever receives a device payload on the device channel and a
//! node payload on the node channel.

use crate::error::ControllerError;
use crds::{Device, NodeSelector, Twin};
use k8s_openapi::api::core::v1::Node;

/// What happened to the watched object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
    /// Anything the watch source could not classify
    Unknown,
}

/// A tagged change notification for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent<T> {
    pub kind: EventKind,
    pub object: T,
}

impl<T> WatchEvent<T> {
    pub fn new(kind: EventKind, object: T) -> Self {
        Self { kind, object }
    }
}

pub type DeviceEvent = WatchEvent<DeviceRecord>;
pub type NodeEvent = WatchEvent<NodeRecord>;

/// Device payload: identity, placement selector and reported twins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceRecord {
    pub name: String,
    pub node_selector: Option<NodeSelector>,
    pub twins: Vec<Twin>,
}

impl TryFrom<&Device> for DeviceRecord {
    type Error = ControllerError;

    fn try_from(device: &Device) -> Result<Self, Self::Error> {
        let name = object_name(device.metadata.name.as_deref(), "Device")?;
        Ok(Self {
            name,
            node_selector: device.spec.node_selector.clone(),
            twins: device
                .status
                .as_ref()
                .map(|status| status.twins.clone())
                .unwrap_or_default(),
        })
    }
}

/// Node payload: only the name is projected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeRecord {
    pub name: String,
}

impl TryFrom<&Node> for NodeRecord {
    type Error = ControllerError;

    fn try_from(node: &Node) -> Result<Self, Self::Error> {
        Ok(Self {
            name: object_name(node.metadata.name.as_deref(), "Node")?,
        })
    }
}

fn object_name(name: Option<&str>, kind: &str) -> Result<String, ControllerError> {
    match name {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(ControllerError::MalformedPayload(format!("{} without metadata.name", kind))),
    }
}
