//! Topology file watcher.

use std::path::{Path, PathBuf};
use std::time::Duration;
use notify::{Watcher, RecursiveMode, Event, RecommendedWatcher, Config};
use tokio::sync::mpsc;

use crate::config::loader::load_topology;
use crate::metadata::TopologyUpdate;

/// Watches a topology file and forwards every valid revision as a
/// [`TopologyUpdate`].
pub struct TopologyWatcher {
    path: PathBuf,
    replicaset: String,
    update_tx: mpsc::UnboundedSender<TopologyUpdate>,
}

impl TopologyWatcher {
    pub fn new(
        path: &Path,
        replicaset: impl Into<String>,
        update_tx: mpsc::UnboundedSender<TopologyUpdate>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            replicaset: replicaset.into(),
            update_tx,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let replicaset = self.replicaset.clone();

        let mut watcher = RecommendedWatcher::new(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Topology file change detected, reloading...");
                        match load_topology(&path) {
                            Ok(topology) => {
                                let _ = tx.send(topology.into_update(&replicaset));
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload topology: {}. Keeping current view.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        }, Config::default().with_poll_interval(Duration::from_secs(2)))?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(
            path = ?self.path,
            replicaset = %self.replicaset,
            "Topology watcher started"
        );
        Ok(watcher)
    }
}
