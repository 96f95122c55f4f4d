//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::destination::DestinationSpec;
use crate::metadata::{ManagedInstance, ServerMode, TcpAddress, TopologyUpdate};
use crate::routing::RoutingError;

/// Root configuration of the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Metadata cache sections, one per managed cluster.
    pub metadata_caches: Vec<MetadataCacheConfig>,

    /// Routes, each building one destination group.
    pub routes: Vec<RouteConfig>,
}

impl RouterConfig {
    pub fn metadata_cache(&self, name: &str) -> Option<&MetadataCacheConfig> {
        self.metadata_caches.iter().find(|c| c.name == name)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A metadata cache section.
///
/// The router ships an in-process provider fed from a topology file or an
/// inline instance list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataCacheConfig {
    /// Section key referenced by routes.
    pub name: String,

    /// Replicaset the instances belong to.
    #[serde(default = "default_replicaset")]
    pub replicaset: String,

    /// TOML file with the instance list, watched for changes.
    #[serde(default)]
    pub topology_file: Option<PathBuf>,

    /// Inline instances, used when no topology file is given.
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,

    /// Whether the metadata servers are reported reachable.
    #[serde(default = "default_true")]
    pub metadata_reachable: bool,
}

/// One cluster member.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstanceConfig {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub mode: ServerMode,
}

impl From<&InstanceConfig> for ManagedInstance {
    fn from(config: &InstanceConfig) -> Self {
        ManagedInstance::new(
            config.id.clone(),
            TcpAddress::new(config.host.clone(), config.port),
            config.mode,
        )
    }
}

/// Contents of a topology file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TopologyFile {
    #[serde(default = "default_true")]
    pub metadata_reachable: bool,

    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

impl TopologyFile {
    /// Turn the file contents into an update for `replicaset`.
    pub fn into_update(self, replicaset: &str) -> TopologyUpdate {
        TopologyUpdate {
            replicaset: replicaset.to_string(),
            instances: self.instances.iter().map(ManagedInstance::from).collect(),
            md_servers_reachable: self.metadata_reachable,
        }
    }
}

/// Route configuration, one destination group each.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Metadata cache section to read topology from.
    pub metadata_cache: String,

    /// Replicaset to route to.
    #[serde(default = "default_replicaset")]
    pub replicaset: String,

    /// first-available, next-available, round-robin,
    /// round-robin-with-fallback. Derived from the role when absent.
    #[serde(default)]
    pub routing_strategy: Option<String>,

    /// read-write or read-only.
    #[serde(default)]
    pub access_mode: Option<String>,

    /// role, allow_primary_reads, disconnect_on_promoted_to_primary,
    /// disconnect_on_metadata_unavailable.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl RouteConfig {
    /// Parse the route's tokens into a destination spec.
    pub fn to_spec(&self) -> Result<DestinationSpec, RoutingError> {
        let mut spec = DestinationSpec::new(&self.name, &self.metadata_cache, &self.replicaset);
        if let Some(strategy) = &self.routing_strategy {
            spec = spec.with_strategy(strategy.parse()?);
        }
        if let Some(mode) = &self.access_mode {
            spec = spec.with_access_mode(mode.parse()?);
        }
        spec.options = self.options.clone();
        Ok(spec)
    }
}

fn default_replicaset() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}
