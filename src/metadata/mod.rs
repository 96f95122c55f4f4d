//! Cluster metadata subsystem.
//!
//! # Data Flow
//! ```text
//! Metadata provider (external: polling, gossip, static file...)
//!     → publishes instance list + reachability for a replicaset
//!     → assigns a new view id
//!     → notify() on every registered ReplicasetStateListener
//!
//! Destination groups:
//!     subscribe → add_state_listener + lookup_replicaset (initial pull)
//!     teardown  → remove_state_listener
//! ```
//!
//! # Design Decisions
//! - Routing code depends on the `MetadataCacheApi` trait only; the provider
//!   is injected, never reached through a global
//! - Listeners are called outside of any provider lock
//! - Delivery order is not guaranteed; listeners dedupe on view id

pub mod instance;
pub mod memory;
pub mod pump;

use std::sync::Arc;

pub use instance::{LookupResult, ManagedInstance, ServerMode, TcpAddress};
pub use memory::InMemoryMetadataCache;
pub use pump::TopologyUpdate;

/// Handle returned by [`MetadataCacheApi::add_state_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receives topology change notifications for one replicaset.
pub trait ReplicasetStateListener: Send + Sync {
    /// Called by the provider whenever the instance list or the provider
    /// reachability changes. Must not block.
    fn notify(&self, instances: &[ManagedInstance], md_servers_reachable: bool, view_id: u64);
}

/// Contract of the cluster metadata provider.
pub trait MetadataCacheApi: Send + Sync {
    /// Current view of the replicaset.
    fn lookup_replicaset(&self, replicaset: &str) -> LookupResult;

    /// Register a listener for changes of `replicaset`.
    fn add_state_listener(
        &self,
        replicaset: &str,
        listener: Arc<dyn ReplicasetStateListener>,
    ) -> ListenerId;

    /// Unregister a listener. Unknown ids are ignored.
    fn remove_state_listener(&self, replicaset: &str, id: ListenerId);
}
