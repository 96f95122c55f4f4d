//! Startup orchestration.
//!
//! # Responsibilities
//! - Create one in-memory metadata provider per metadata cache section
//! - Seed each provider from its topology file or inline instances
//! - Build and start one destination group per route

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{load_topology, ConfigError, RouterConfig, TopologyFile};
use crate::destination::{ConnectionInvalidator, MetadataCacheDestination, RouteDestination};
use crate::metadata::{InMemoryMetadataCache, MetadataCacheApi};
use crate::routing::RoutingError;

/// Fatal error while bringing the router up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("route '{route}': {source}")]
    Route {
        route: String,
        #[source]
        source: RoutingError,
    },
}

/// Running set of metadata caches and destination groups.
pub struct RouterRuntime {
    caches: BTreeMap<String, Arc<InMemoryMetadataCache>>,
    groups: Vec<Arc<MetadataCacheDestination>>,
}

impl RouterRuntime {
    /// Seed the caches and start every route.
    pub fn start(
        config: &RouterConfig,
        invalidator: Arc<dyn ConnectionInvalidator>,
    ) -> Result<Self, StartupError> {
        let mut caches = BTreeMap::new();
        for section in &config.metadata_caches {
            let topology = match &section.topology_file {
                Some(path) => load_topology(path)?,
                None => TopologyFile {
                    metadata_reachable: section.metadata_reachable,
                    instances: section.instances.clone(),
                },
            };
            let update = topology.into_update(&section.replicaset);

            let cache = Arc::new(InMemoryMetadataCache::new());
            let view_id = cache.publish_state(
                &update.replicaset,
                update.instances,
                update.md_servers_reachable,
            );
            tracing::info!(
                metadata_cache = %section.name,
                replicaset = %section.replicaset,
                view_id,
                "Metadata cache seeded"
            );
            caches.insert(section.name.clone(), cache);
        }

        let mut groups = Vec::with_capacity(config.routes.len());
        for route in &config.routes {
            let route_error = |source| StartupError::Route {
                route: route.name.clone(),
                source,
            };

            let spec = route.to_spec().map_err(route_error)?;
            let cache_api: Arc<dyn MetadataCacheApi> = caches
                .get(&spec.cache_name)
                .cloned()
                .ok_or_else(|| {
                    route_error(RoutingError::UnknownMetadataCache(spec.cache_name.clone()))
                })?;

            let group = MetadataCacheDestination::new(spec, cache_api, invalidator.clone())
                .map_err(route_error)?;
            group.start().map_err(route_error)?;
            groups.push(group);
        }

        tracing::info!(
            metadata_caches = caches.len(),
            routes = groups.len(),
            "Router started"
        );

        Ok(Self { caches, groups })
    }

    pub fn cache(&self, name: &str) -> Option<&Arc<InMemoryMetadataCache>> {
        self.caches.get(name)
    }

    pub fn route(&self, name: &str) -> Option<&Arc<MetadataCacheDestination>> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub fn routes(&self) -> &[Arc<MetadataCacheDestination>] {
        &self.groups
    }

    /// Unsubscribe every group.
    pub fn stop(&self) {
        for group in &self.groups {
            group.stop();
        }
        tracing::info!("Router stopped");
    }
}
