//! KubeEdge CRD Definitions
//!
//! Kubernetes Custom Resource Definitions consumed by the KubeEdge exporter.

pub mod device;
pub mod node_selector;
pub mod protocol;

pub use device::*;
pub use node_selector::*;
pub use protocol::*;
