//! In-process metadata provider.
//!
//! Holds the last published view of each replicaset and fans out change
//! notifications to registered listeners. Used by the binary (fed from
//! topology files) and by tests.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::metadata::{
    ListenerId, LookupResult, ManagedInstance, MetadataCacheApi, ReplicasetStateListener,
};

type Listeners = Vec<(ListenerId, Arc<dyn ReplicasetStateListener>)>;

#[derive(Default)]
struct ReplicasetEntry {
    state: ArcSwap<LookupResult>,
    listeners: Mutex<Listeners>,
}

/// A thread-safe, in-memory implementation of [`MetadataCacheApi`].
#[derive(Default)]
pub struct InMemoryMetadataCache {
    replicasets: DashMap<String, Arc<ReplicasetEntry>>,
    next_listener_id: AtomicU64,
}

impl InMemoryMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, replicaset: &str) -> Arc<ReplicasetEntry> {
        self.replicasets
            .entry(replicaset.to_string())
            .or_default()
            .clone()
    }

    /// Publish a reachable view of the replicaset. Returns the new view id.
    pub fn publish(&self, replicaset: &str, instances: Vec<ManagedInstance>) -> u64 {
        self.publish_state(replicaset, instances, true)
    }

    /// Report that the metadata servers can no longer be reached.
    pub fn set_unreachable(&self, replicaset: &str) -> u64 {
        self.publish_state(replicaset, Vec::new(), false)
    }

    /// Store a new view and notify every listener of the replicaset.
    pub fn publish_state(
        &self,
        replicaset: &str,
        instances: Vec<ManagedInstance>,
        md_servers_reachable: bool,
    ) -> u64 {
        let entry = self.entry(replicaset);

        let previous = entry.state.rcu(|current| LookupResult {
            instances: instances.clone(),
            view_id: current.view_id + 1,
            md_servers_reachable,
        });
        let view_id = previous.view_id + 1;

        tracing::debug!(
            replicaset = %replicaset,
            view_id,
            instances = instances.len(),
            reachable = md_servers_reachable,
            "Publishing replicaset view"
        );

        // Snapshot the listener list so callbacks run without the lock held.
        let listeners: Vec<_> = entry
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            listener.notify(&instances, md_servers_reachable, view_id);
        }

        view_id
    }

    /// Number of listeners registered for a replicaset.
    pub fn listener_count(&self, replicaset: &str) -> usize {
        self.replicasets
            .get(replicaset)
            .map(|e| {
                e.listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len()
            })
            .unwrap_or(0)
    }
}

impl MetadataCacheApi for InMemoryMetadataCache {
    fn lookup_replicaset(&self, replicaset: &str) -> LookupResult {
        match self.replicasets.get(replicaset) {
            Some(entry) => LookupResult::clone(&entry.state.load()),
            None => LookupResult::unknown(),
        }
    }

    fn add_state_listener(
        &self,
        replicaset: &str,
        listener: Arc<dyn ReplicasetStateListener>,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.entry(replicaset)
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        tracing::debug!(replicaset = %replicaset, listener = id.0, "State listener added");
        id
    }

    fn remove_state_listener(&self, replicaset: &str, id: ListenerId) {
        if let Some(entry) = self.replicasets.get(replicaset) {
            entry
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(lid, _)| *lid != id);
            tracing::debug!(replicaset = %replicaset, listener = id.0, "State listener removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(usize, bool, u64)>>,
    }

    impl ReplicasetStateListener for Recorder {
        fn notify(&self, instances: &[ManagedInstance], reachable: bool, view_id: u64) {
            self.seen
                .lock()
                .unwrap()
                .push((instances.len(), reachable, view_id));
        }
    }

    #[test]
    fn test_publish_increments_view_and_notifies() {
        let cache = InMemoryMetadataCache::new();
        let recorder = Arc::new(Recorder::default());
        cache.add_state_listener("rs", recorder.clone());

        assert_eq!(cache.publish("rs", vec![ManagedInstance::primary("p1", "h", 1)]), 1);
        assert_eq!(cache.set_unreachable("rs"), 2);

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(1, true, 1), (0, false, 2)]);

        let lookup = cache.lookup_replicaset("rs");
        assert_eq!(lookup.view_id, 2);
        assert!(!lookup.md_servers_reachable);
    }

    #[test]
    fn test_unknown_replicaset_lookup() {
        let cache = InMemoryMetadataCache::new();
        let lookup = cache.lookup_replicaset("missing");
        assert_eq!(lookup.view_id, 0);
        assert!(lookup.instances.is_empty());
    }

    #[test]
    fn test_remove_listener() {
        let cache = InMemoryMetadataCache::new();
        let recorder = Arc::new(Recorder::default());
        let id = cache.add_state_listener("rs", recorder.clone());
        assert_eq!(cache.listener_count("rs"), 1);

        cache.remove_state_listener("rs", id);
        assert_eq!(cache.listener_count("rs"), 0);

        cache.publish("rs", Vec::new());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }
}
