//! Metadata-cache destination selection for a database router.
//!
//! For every client connection, pick the cluster node(s) to route to from a
//! continuously changing view of the cluster topology.

pub mod config;
pub mod destination;
pub mod lifecycle;
pub mod metadata;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use destination::{Destinations, MetadataCacheDestination, RouteDestination};
pub use lifecycle::{RouterRuntime, Shutdown};
pub use metadata::{InMemoryMetadataCache, MetadataCacheApi};
