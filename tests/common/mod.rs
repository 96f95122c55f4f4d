//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use tokio::sync::mpsc;

use metadata_router::destination::{
    DestinationSpec, InvalidationEvent, MetadataCacheDestination, RouteDestination,
};
use metadata_router::metadata::{InMemoryMetadataCache, ManagedInstance};

pub const REPLICASET: &str = "default";

pub fn p(id: &str, port: u16) -> ManagedInstance {
    ManagedInstance::primary(id, "127.0.0.1", port)
}

pub fn s(id: &str, port: u16) -> ManagedInstance {
    ManagedInstance::secondary(id, "127.0.0.1", port)
}

/// Build and start a group against `cache`, with invalidations recorded on
/// the returned receiver.
pub fn start_group(
    cache: &Arc<InMemoryMetadataCache>,
    spec: DestinationSpec,
) -> (
    Arc<MetadataCacheDestination>,
    mpsc::UnboundedReceiver<InvalidationEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let group = MetadataCacheDestination::new(spec, cache.clone(), Arc::new(tx))
        .expect("valid destination spec");
    group.start().expect("group starts");
    (group, rx)
}

/// Everything signaled so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<InvalidationEvent>) -> Vec<InvalidationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Ids of the first choice of `n` successive selections.
pub fn first_choices(group: &MetadataCacheDestination, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| {
            group
                .destinations()
                .first()
                .map(|d| d.id.clone())
                .unwrap_or_default()
        })
        .collect()
}
