//! Kubernetes resource watchers.
//!
//! This module watches Device and Node resources and forwards every change
//! as a typed event to the ingester. Objects are converted to payload
//! records here; objects that cannot be converted are logged and skipped.

use crate::error::ControllerError;
use crate::events::{DeviceEvent, EventKind, NodeEvent, WatchEvent};
use crds::Device;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::{Api, Resource, ResourceExt};
use kube_runtime::{WatchStreamExt, watcher};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Turns kube-runtime watcher events into Added/Modified/Deleted notifications.
///
/// The watcher only reports "applied"; the translator remembers which names
/// it has already announced to tell additions from modifications, and emits
/// deletions for objects that disappeared while the watch was re-listing.
#[derive(Debug)]
pub struct EventTranslator<K> {
    known: HashMap<String, K>,
    relisted: Option<HashSet<String>>,
}

impl<K> Default for EventTranslator<K> {
    fn default() -> Self {
        Self {
            known: HashMap::new(),
            relisted: None,
        }
    }
}

impl<K: Resource + Clone> EventTranslator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, event: watcher::Event<K>) -> Vec<(EventKind, K)> {
        match event {
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(obj) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(obj.name_any());
                }
                vec![self.applied(obj)]
            }
            watcher::Event::InitDone => {
                let Some(relisted) = self.relisted.take() else {
                    return Vec::new();
                };
                let stale: Vec<String> = self
                    .known
                    .keys()
                    .filter(|name| !relisted.contains(*name))
                    .cloned()
                    .collect();
                stale
                    .iter()
                    .filter_map(|name| self.known.remove(name))
                    .map(|obj| (EventKind::Deleted, obj))
                    .collect()
            }
            watcher::Event::Apply(obj) => vec![self.applied(obj)],
            watcher::Event::Delete(obj) => {
                self.known.remove(&obj.name_any());
                vec![(EventKind::Deleted, obj)]
            }
        }
    }

    fn applied(&mut self, obj: K) -> (EventKind, K) {
        let kind = match self.known.insert(obj.name_any(), obj.clone()) {
            Some(_) => EventKind::Modified,
            None => EventKind::Added,
        };
        (kind, obj)
    }
}

/// Watches one resource type and forwards translated events to `sender`.
///
/// Returns `Ok` when shutdown is requested or the receiver is gone. Watch
/// errors are logged; the stream backs off and re-lists on its own.
async fn forward_events<K, R>(
    api: Api<K>,
    sender: mpsc::Sender<WatchEvent<R>>,
    shutdown: CancellationToken,
    resource_name: &str,
) -> Result<(), ControllerError>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
    R: for<'a> TryFrom<&'a K, Error = ControllerError>,
{
    info!("Starting {} watcher", resource_name);

    let mut stream = Box::pin(watcher(api, watcher::Config::default()).default_backoff());
    let mut translator = EventTranslator::new();

    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => {
                info!("{} watcher stopped", resource_name);
                return Ok(());
            }
            next = stream.next() => next,
        };

        let event = match next {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!("{} watcher stream error: {}", resource_name, e);
                continue;
            }
            None => {
                return Err(ControllerError::Watch(format!("{} watch stream ended", resource_name)));
            }
        };

        match &event {
            watcher::Event::Init => debug!("{} watcher (re)listing", resource_name),
            watcher::Event::InitDone => info!("{} watcher initialization complete", resource_name),
            _ => {}
        }

        for (kind, object) in translator.translate(event) {
            let record = match R::try_from(&object) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping {} {:?} event: {}", resource_name, kind, e);
                    continue;
                }
            };
            // Blocks while the ingester is busy; that is the only backpressure.
            if sender.send(WatchEvent::new(kind, record)).await.is_err() {
                info!("{} event receiver dropped, stopping watcher", resource_name);
                return Ok(());
            }
        }
    }
}

/// Watches Kubernetes resources for changes.
#[derive(Debug)]
pub struct Watcher {
    device_api: Api<Device>,
    node_api: Api<Node>,
    shutdown: CancellationToken,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(device_api: Api<Device>, node_api: Api<Node>, shutdown: CancellationToken) -> Self {
        Self {
            device_api,
            node_api,
            shutdown,
        }
    }

    /// Starts watching Device resources.
    pub async fn watch_devices(&self, sender: mpsc::Sender<DeviceEvent>) -> Result<(), ControllerError> {
        forward_events(self.device_api.clone(), sender, self.shutdown.clone(), "Device").await
    }

    /// Starts watching Node resources.
    pub async fn watch_nodes(&self, sender: mpsc::Sender<NodeEvent>) -> Result<(), ControllerError> {
        forward_events(self.node_api.clone(), sender, self.shutdown.clone(), "Node").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{device, node, twin};

    fn kinds<K: ResourceExt>(events: &[(EventKind, K)]) -> Vec<(EventKind, String)> {
        events.iter().map(|(kind, obj)| (*kind, obj.name_any())).collect()
    }

    fn named(kind: EventKind, name: &str) -> (EventKind, String) {
        (kind, name.to_string())
    }

    #[test]
    fn test_initial_list_is_added() {
        let mut translator = EventTranslator::new();
        assert!(translator.translate(watcher::Event::Init).is_empty());

        let events = translator.translate(watcher::Event::InitApply(node("edge1")));
        assert_eq!(kinds(&events), vec![named(EventKind::Added, "edge1")]);
        assert!(translator.translate(watcher::Event::InitDone).is_empty());
    }

    #[test]
    fn test_first_apply_is_added_then_modified() {
        let mut translator = EventTranslator::new();
        let dev = device("sensor-x", vec![], vec![twin("temp", "21", "22")]);

        let first = translator.translate(watcher::Event::Apply(dev.clone()));
        let second = translator.translate(watcher::Event::Apply(dev));

        assert_eq!(kinds(&first), vec![named(EventKind::Added, "sensor-x")]);
        assert_eq!(kinds(&second), vec![named(EventKind::Modified, "sensor-x")]);
    }

    #[test]
    fn test_delete_forgets_object() {
        let mut translator = EventTranslator::new();
        translator.translate(watcher::Event::Apply(node("edge1")));

        let deleted = translator.translate(watcher::Event::Delete(node("edge1")));
        assert_eq!(kinds(&deleted), vec![named(EventKind::Deleted, "edge1")]);

        let again = translator.translate(watcher::Event::Apply(node("edge1")));
        assert_eq!(kinds(&again), vec![named(EventKind::Added, "edge1")]);
    }

    #[test]
    fn test_relist_deletes_vanished_objects() {
        let mut translator = EventTranslator::new();
        translator.translate(watcher::Event::Init);
        translator.translate(watcher::Event::InitApply(node("edge1")));
        translator.translate(watcher::Event::InitApply(node("edge2")));
        translator.translate(watcher::Event::InitDone);

        // watch dropped and re-listed; edge2 went away in between
        translator.translate(watcher::Event::Init);
        let kept = translator.translate(watcher::Event::InitApply(node("edge1")));
        let done = translator.translate(watcher::Event::InitDone);

        assert_eq!(kinds(&kept), vec![named(EventKind::Modified, "edge1")]);
        assert_eq!(kinds(&done), vec![named(EventKind::Deleted, "edge2")]);
    }

    #[test]
    fn test_translated_object_converts_to_record() {
        let mut translator = EventTranslator::new();
        let dev = device("sensor-x", vec![], vec![twin("temp", "21", "22")]);
        let events = translator.translate(watcher::Event::Apply(dev));

        let (kind, object) = &events[0];
        let record = crate::events::DeviceRecord::try_from(object).expect("valid device");
        assert_eq!(*kind, EventKind::Added);
        assert_eq!(record.name, "sensor-x");
        assert_eq!(record.twins[0].reported.value, "21");
    }
}
