//! Device CRD
//!
//! KubeEdge edge device: protocol wiring, node placement and reported twins.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::node_selector::NodeSelector;
use crate::protocol::ProtocolConfig;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "devices.kubeedge.io",
    version = "v1alpha1",
    kind = "Device",
    namespaced,
    status = "DeviceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSpec {
    /// Reference to the DeviceModel this device instantiates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model_ref: Option<LocalObjectReference>,

    /// Protocol used to talk to the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolConfig>,

    /// Nodes the device is expected to be attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<NodeSelector>,
}

/// Name-only reference to an object in the same namespace
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct LocalObjectReference {
    /// Name of the referenced object
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Reported and desired values, one entry per device property
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub twins: Vec<Twin>,
}

/// A single device property with its reported and desired value
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Twin {
    /// Property name, unique within the device
    #[serde(default)]
    pub property_name: String,

    /// Value last reported by the device
    #[serde(default)]
    pub reported: TwinProperty,

    /// Value requested by the cloud side
    #[serde(default)]
    pub desired: TwinProperty,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct TwinProperty {
    /// Raw value as a string
    #[serde(default)]
    pub value: String,

    /// Free-form metadata (timestamp, type, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}
