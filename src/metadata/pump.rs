//! Message-passing boundary between topology sources and the provider.
//!
//! Sources (file watchers, tests) push immutable [`TopologyUpdate`] messages
//! into a channel; a single consumer task applies them to the in-memory
//! provider in arrival order.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::metadata::{InMemoryMetadataCache, ManagedInstance};

/// A complete replacement view for one replicaset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyUpdate {
    pub replicaset: String,
    pub instances: Vec<ManagedInstance>,
    pub md_servers_reachable: bool,
}

/// Applies queued topology updates to a metadata cache.
pub struct TopologyPump {
    cache: Arc<InMemoryMetadataCache>,
    updates: mpsc::UnboundedReceiver<TopologyUpdate>,
}

impl TopologyPump {
    /// Create a pump and the sender that feeds it.
    pub fn new(
        cache: Arc<InMemoryMetadataCache>,
    ) -> (Self, mpsc::UnboundedSender<TopologyUpdate>) {
        let (tx, updates) = mpsc::unbounded_channel();
        (Self { cache, updates }, tx)
    }

    /// Consume updates until every sender is gone or shutdown is signaled.
    /// Returns the number of updates applied.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> usize {
        let mut applied = 0;
        loop {
            tokio::select! {
                update = self.updates.recv() => {
                    let Some(update) = update else {
                        tracing::debug!("Topology channel closed, pump exiting");
                        break;
                    };
                    let view_id = self.cache.publish_state(
                        &update.replicaset,
                        update.instances,
                        update.md_servers_reachable,
                    );
                    applied += 1;
                    tracing::info!(
                        replicaset = %update.replicaset,
                        view_id,
                        "Topology update applied"
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("Topology pump received shutdown signal, exiting loop");
                    break;
                }
            }
        }
        applied
    }
}
