//! HTTP presentation of the projected state.
//!
//! `GET /` renders a human-readable dump of every device twin with its
//! matched nodes, followed by the node registry. `GET /metrics` exposes the
//! twins of a single fixed device as Prometheus gauges.
//!
//! Handlers snapshot both stores and release the locks before evaluating
//! selectors, so rendering cost never holds up the ingester.

use crate::selector::{matching_nodes, render_matches};
use crate::store::{DeviceCache, DeviceSnapshot, NodeRegistry, NodeSnapshot};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// The only device exported on `/metrics`. Other devices are only visible
/// in the dump.
pub const METRICS_DEVICE: &str = "cpu-sensor-tag01";

const METRIC_NAME: &str = "cpu_kubeedge_exporter";
const METRIC_HELP: &str = "Actual and expected twin values of the exported KubeEdge device";
const DUMP_HEADER: &str = "Displays the matched nodes, the device, the sensor name and the value:\n";

/// Shared read handles for the HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub devices: Arc<DeviceCache>,
    pub nodes: Arc<NodeRegistry>,
}

impl AppState {
    pub fn new(devices: Arc<DeviceCache>, nodes: Arc<NodeRegistry>) -> Self {
        Self { devices, nodes }
    }

    async fn snapshot(&self) -> (DeviceSnapshot, NodeSnapshot) {
        // one lock at a time, each released before the next is taken
        let devices = self.devices.snapshot().await;
        let nodes = self.nodes.snapshot().await;
        (devices, nodes)
    }
}

/// Builds the exporter router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dump))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dump(State(state): State<AppState>) -> impl IntoResponse {
    let (devices, nodes) = state.snapshot().await;
    debug!("Dump request over {} devices and {} nodes", devices.len(), nodes.len());
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_dump(&devices, &nodes),
    )
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (devices, nodes) = state.snapshot().await;
    debug!("Metrics request over {} devices", devices.len());
    let body = match render_metrics(&devices, &nodes) {
        Ok(body) => body,
        Err(e) => {
            error!("Could not render metrics: {}", e);
            String::new()
        }
    };
    ([(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())], body)
}

/// Renders one line per twin plus a trailing node registry dump.
pub fn render_dump(devices: &DeviceSnapshot, nodes: &NodeSnapshot) -> String {
    let node_names: Vec<&str> = nodes.keys().map(String::as_str).collect();
    let mut message = String::from(DUMP_HEADER);

    for (device, twins) in devices {
        for twin in twins.iter() {
            let matched = render_matches(&matching_nodes(&node_names, &twin.placement));
            message.push_str(&format!(
                "Node: {} -> {}::{}: actual value: {}\t expected value:{}\n",
                matched, device, twin.name, twin.actual.value, twin.expected.value
            ));
        }
    }

    message.push_str("\n\n\n\n");
    for (name, last_transition) in nodes {
        message.push_str(&format!("{} {}\n", name, last_transition));
    }
    message
}

/// Renders the Prometheus exposition for [`METRICS_DEVICE`].
///
/// Two samples per twin (`type="actual"` and `type="expected"`). A value
/// that is not numeric, including the empty value of a twin that has not
/// reported yet, is exported as `NaN`. Twins sharing a property name share
/// a label set, so the last one rendered wins.
pub fn render_metrics(devices: &DeviceSnapshot, nodes: &NodeSnapshot) -> Result<String, prometheus::Error> {
    let registry = Registry::new();
    let gauge = GaugeVec::new(
        Opts::new(METRIC_NAME, METRIC_HELP),
        &["device", "node", "sensor", "type"],
    )?;
    registry.register(Box::new(gauge.clone()))?;

    if let Some(twins) = devices.get(METRICS_DEVICE) {
        let node_names: Vec<&str> = nodes.keys().map(String::as_str).collect();
        for twin in twins.iter() {
            let matched = render_matches(&matching_nodes(&node_names, &twin.placement));
            for (kind, property) in [("actual", &twin.actual), ("expected", &twin.expected)] {
                gauge
                    .with_label_values(&[METRICS_DEVICE, matched.as_str(), twin.name.as_str(), kind])
                    .set(sample_value(&twin.name, kind, &property.value));
            }
        }
    }

    let families = registry.gather();
    if families.is_empty() {
        // the encoder drops families without samples
        return Ok(format!("# HELP {METRIC_NAME} {METRIC_HELP}\n# TYPE {METRIC_NAME} gauge\n"));
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

fn sample_value(sensor: &str, kind: &str, raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) => value,
        Err(_) => {
            debug!("{} value of {}::{} is not numeric: '{}'", kind, METRICS_DEVICE, sensor, raw);
            f64::NAN
        }
    }
}
