//! Exporter configuration.
//!
//! Read once from the environment at startup.

use crate::error::ControllerError;
use std::env;

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
const DEFAULT_LISTEN_PORT: u16 = 9100;
const DEFAULT_NAMESPACE: &str = "default";

/// Runtime configuration for the exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Overrides the API server URL from the kubeconfig
    pub api_server: Option<String>,
    /// Explicit kubeconfig; falls back to in-cluster / default discovery
    pub kubeconfig_path: Option<String>,
    pub listen_address: String,
    pub listen_port: u16,
    /// Namespace the Device watcher is scoped to
    pub namespace: String,
    /// Whether Node objects are watched at all
    pub track_nodes: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            api_server: None,
            kubeconfig_path: None,
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            namespace: DEFAULT_NAMESPACE.to_string(),
            track_nodes: true,
        }
    }
}

impl ExporterConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_port = match non_empty("LISTEN_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ControllerError::InvalidConfig(format!("LISTEN_PORT '{}' is not a valid port: {}", raw, e))
            })?,
            None => defaults.listen_port,
        };

        let track_nodes = match non_empty("TRACK_NODES") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ControllerError::InvalidConfig(format!("TRACK_NODES '{}' is not a boolean", raw))
            })?,
            None => defaults.track_nodes,
        };

        Ok(Self {
            api_server: non_empty("KUBE_API_SERVER"),
            kubeconfig_path: non_empty("KUBECONFIG_PATH"),
            listen_address: non_empty("LISTEN_ADDRESS").unwrap_or(defaults.listen_address),
            listen_port,
            namespace: non_empty("WATCH_NAMESPACE").unwrap_or(defaults.namespace),
            track_nodes,
        })
    }

    /// `<address>:<port>` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        if self.listen_address.contains(':') && !self.listen_address.starts_with('[') {
            // bare IPv6 literal
            format!("[{}]:{}", self.listen_address, self.listen_port)
        } else {
            format!("{}:{}", self.listen_address, self.listen_port)
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ExporterConfig::from_lookup(lookup_from(&[])).expect("defaults should load");
        assert_eq!(config, ExporterConfig::default());
        assert_eq!(config.listen_addr(), "0.0.0.0:9100");
    }

    #[test]
    fn test_reads_all_variables() {
        let config = ExporterConfig::from_lookup(lookup_from(&[
            ("KUBE_API_SERVER", "https://10.0.0.1:6443"),
            ("KUBECONFIG_PATH", "/etc/kube/config"),
            ("LISTEN_ADDRESS", "127.0.0.1"),
            ("LISTEN_PORT", "8080"),
            ("WATCH_NAMESPACE", "edge"),
            ("TRACK_NODES", "no"),
        ]))
        .expect("config should load");

        assert_eq!(config.api_server.as_deref(), Some("https://10.0.0.1:6443"));
        assert_eq!(config.kubeconfig_path.as_deref(), Some("/etc/kube/config"));
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.namespace, "edge");
        assert!(!config.track_nodes);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = ExporterConfig::from_lookup(lookup_from(&[
            ("LISTEN_ADDRESS", ""),
            ("KUBE_API_SERVER", "  "),
        ]))
        .expect("config should load");
        assert_eq!(config.listen_address, "0.0.0.0");
        assert!(config.api_server.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = ExporterConfig::from_lookup(lookup_from(&[("LISTEN_PORT", "99999")]));
        assert!(matches!(result, Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_toggle_is_rejected() {
        let result = ExporterConfig::from_lookup(lookup_from(&[("TRACK_NODES", "maybe")]));
        assert!(matches!(result, Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_ipv6_listen_address_is_bracketed() {
        let config = ExporterConfig::from_lookup(lookup_from(&[("LISTEN_ADDRESS", "::")]))
            .expect("config should load");
        assert_eq!(config.listen_addr(), "[::]:9100");
    }
}
