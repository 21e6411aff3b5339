//! Controller-specific error types.
//!
//! Only startup and configuration failures escape to `main`; everything
//! raised while ingesting events or rendering is logged and absorbed.

use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the KubeEdge exporter.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Watched object could not be turned into an event payload
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// HTTP listener failed
    #[error("HTTP server error: {0}")]
    Server(String),
}
