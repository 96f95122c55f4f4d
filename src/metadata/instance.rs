//! Topology snapshot types.
//!
//! A snapshot is the instance list reported by the metadata provider for one
//! replicaset, tagged with the view id it was produced under.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a cluster member currently plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerMode {
    /// Primary, accepts writes.
    ReadWrite,
    /// Secondary replica.
    ReadOnly,
}

impl ServerMode {
    pub fn is_primary(self) -> bool {
        self == ServerMode::ReadWrite
    }
}

/// Host and port of a cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TcpAddress {
    pub host: String,
    pub port: u16,
}

impl TcpAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for TcpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A single member of a replicaset as seen by the metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedInstance {
    /// Stable cluster-assigned identifier (server uuid).
    pub id: String,
    pub address: TcpAddress,
    pub mode: ServerMode,
}

impl ManagedInstance {
    pub fn new(id: impl Into<String>, address: TcpAddress, mode: ServerMode) -> Self {
        Self {
            id: id.into(),
            address,
            mode,
        }
    }

    pub fn primary(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::new(id, TcpAddress::new(host, port), ServerMode::ReadWrite)
    }

    pub fn secondary(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::new(id, TcpAddress::new(host, port), ServerMode::ReadOnly)
    }
}

/// Answer to a pull-based lookup of a replicaset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub instances: Vec<ManagedInstance>,
    pub view_id: u64,
    pub md_servers_reachable: bool,
}

impl LookupResult {
    /// Result for a replicaset the provider knows nothing about yet.
    pub fn unknown() -> Self {
        Self {
            instances: Vec::new(),
            view_id: 0,
            md_servers_reachable: false,
        }
    }
}

impl Default for LookupResult {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Returns the first instance id that occurs more than once, if any.
pub fn find_duplicate_id(instances: &[ManagedInstance]) -> Option<&str> {
    let mut seen = std::collections::HashSet::with_capacity(instances.len());
    instances
        .iter()
        .find(|i| !seen.insert(i.id.as_str()))
        .map(|i| i.id.as_str())
}
