//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! router.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, routing tokens parsed)
//!     → RouterConfig (validated, immutable)
//!
//! topology.toml (per metadata cache)
//!     → loader.rs (load_topology)
//!     → watcher.rs on change
//!     → TopologyUpdate over mpsc
//!     → metadata::pump (publishes into the in-memory provider)
//! ```
//!
//! # Design Decisions
//! - Route config is immutable once loaded; topology is the only live input
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_topology, parse_config, ConfigError};
pub use schema::{
    InstanceConfig, MetadataCacheConfig, ObservabilityConfig, RouteConfig, RouterConfig,
    TopologyFile,
};
pub use validation::ValidationError;
