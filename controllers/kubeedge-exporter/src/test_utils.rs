//! Test utilities for building watched objects and events
//!
//! This module provides helpers for creating test data and setting up test scenarios.

#[cfg(test)]
use crate::events::{DeviceEvent, DeviceRecord, EventKind, NodeEvent, NodeRecord, WatchEvent};
#[cfg(test)]
use crds::{Device, DeviceSpec, DeviceStatus, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, Twin, TwinProperty};
#[cfg(test)]
use k8s_openapi::api::core::v1::Node;
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Helper to create a twin with plain reported/desired values
#[cfg(test)]
pub fn twin(name: &str, actual: &str, desired: &str) -> Twin {
    Twin {
        property_name: name.to_string(),
        reported: TwinProperty {
            value: actual.to_string(),
            ..Default::default()
        },
        desired: TwinProperty {
            value: desired.to_string(),
            ..Default::default()
        },
    }
}

/// Helper to create a node-name match expression
#[cfg(test)]
pub fn requirement(operator: &str, values: &[&str]) -> NodeSelectorRequirement {
    NodeSelectorRequirement {
        key: String::new(),
        operator: operator.to_string(),
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}

/// Helper to create a Device CR with a single selector term
#[cfg(test)]
pub fn device(name: &str, expressions: Vec<NodeSelectorRequirement>, twins: Vec<Twin>) -> Device {
    let node_selector = (!expressions.is_empty()).then(|| NodeSelector {
        node_selector_terms: vec![NodeSelectorTerm {
            match_expressions: expressions,
        }],
    });
    let mut device = Device::new(
        name,
        DeviceSpec {
            node_selector,
            ..Default::default()
        },
    );
    device.metadata.namespace = Some("default".to_string());
    device.status = Some(DeviceStatus { twins });
    device
}

/// Helper to create a Node with only a name
#[cfg(test)]
pub fn node(name: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Helper to create a device event straight from a Device CR
#[cfg(test)]
pub fn device_event(kind: EventKind, device: &Device) -> DeviceEvent {
    match DeviceRecord::try_from(device) {
        Ok(record) => WatchEvent::new(kind, record),
        Err(e) => panic!("test device must be well formed: {e}"),
    }
}

/// Helper to create a node event for a bare node name
#[cfg(test)]
pub fn node_event(kind: EventKind, name: &str) -> NodeEvent {
    WatchEvent::new(kind, NodeRecord { name: name.to_string() })
}
