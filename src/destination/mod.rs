//! Destination selection subsystem.
//!
//! # Data Flow
//! ```text
//! Metadata provider notify()
//!     → metadata_cache.rs (view id check, snapshot swap, invalidation)
//!     → registry.rs (snapshot + eligible nodes + cursor, one lock)
//!
//! Client connection
//!     → RouteDestination::destinations()
//!     → balance.rs (order eligible nodes, move cursor)
//!     → Destinations (ordered candidates, fallback flag, view id)
//!     → dispatcher tries candidates; on failure refresh_destinations()
//! ```
//!
//! # Design Decisions
//! - Selection never blocks on I/O; the critical section is a scan of a
//!   small node list
//! - An empty result means "no destination", never an error
//! - Invalidation signals are raised after the lock is released

pub mod balance;
pub mod invalidation;
pub mod metadata_cache;
pub mod registry;

use serde::Serialize;

use crate::metadata::{ManagedInstance, TcpAddress};
use crate::routing::RoutingError;

pub use invalidation::{ConnectionInvalidator, InvalidationEvent, InvalidationReason};
pub use metadata_cache::{DestinationSpec, MetadataCacheDestination};
pub use registry::DestinationRegistry;

/// A node a connection may be routed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AvailableDestination {
    pub address: TcpAddress,
    pub id: String,
}

impl AvailableDestination {
    pub fn new(address: TcpAddress, id: impl Into<String>) -> Self {
        Self {
            address,
            id: id.into(),
        }
    }
}

impl From<&ManagedInstance> for AvailableDestination {
    fn from(instance: &ManagedInstance) -> Self {
        Self::new(instance.address.clone(), instance.id.clone())
    }
}

/// Ordered candidates for one connection attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Destinations {
    destinations: Vec<AvailableDestination>,
    primary_fallback: bool,
    view_id: u64,
}

impl Destinations {
    pub fn new(
        destinations: Vec<AvailableDestination>,
        primary_fallback: bool,
        view_id: u64,
    ) -> Self {
        Self {
            destinations,
            primary_fallback,
            view_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn first(&self) -> Option<&AvailableDestination> {
        self.destinations.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AvailableDestination> {
        self.destinations.iter()
    }

    /// True when primaries were substituted for missing secondaries.
    pub fn primary_fallback(&self) -> bool {
        self.primary_fallback
    }

    /// View id of the snapshot this list was computed from.
    pub fn view_id(&self) -> u64 {
        self.view_id
    }

    pub fn ids(&self) -> Vec<&str> {
        self.destinations.iter().map(|d| d.id.as_str()).collect()
    }
}

impl IntoIterator for Destinations {
    type Item = AvailableDestination;
    type IntoIter = std::vec::IntoIter<AvailableDestination>;

    fn into_iter(self) -> Self::IntoIter {
        self.destinations.into_iter()
    }
}

impl<'a> IntoIterator for &'a Destinations {
    type Item = &'a AvailableDestination;
    type IntoIter = std::slice::Iter<'a, AvailableDestination>;

    fn into_iter(self) -> Self::IntoIter {
        self.destinations.iter()
    }
}

/// Contract every kind of route destination offers to the connection
/// dispatcher.
pub trait RouteDestination: Send + Sync {
    /// Add a static destination. Dynamic destination kinds ignore it.
    fn add(&self, address: TcpAddress);

    /// Whether the destination has structurally nothing to route to.
    fn empty(&self) -> bool;

    /// Lifecycle hook, called once before traffic is accepted.
    fn start(&self) -> Result<(), RoutingError>;

    /// Addresses currently allowed, for introspection.
    fn get_destinations(&self) -> Vec<TcpAddress>;

    /// Candidates for a new connection, in the order to try them.
    fn destinations(&self) -> Destinations;

    /// Recompute after a failed attempt. `None` means nothing changed since
    /// `previous` was computed.
    fn refresh_destinations(&self, previous: &Destinations) -> Option<Destinations>;
}
