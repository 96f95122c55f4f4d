//! Routing policy subsystem.
//!
//! # Data Flow
//! ```text
//! route config (strategy token, access mode token, option map)
//!     → strategy.rs (parse tokens)
//!     → options.rs (validate option map)
//!     → policy.rs (resolve role + effective strategy)
//!     → GroupPolicy (immutable, owned by the destination group)
//! ```
//!
//! # Design Decisions
//! - All misconfiguration is caught here, before a group exists
//! - The decision table is pure and independent of networking
//! - Tokens are case-insensitive

pub mod error;
pub mod options;
pub mod policy;
pub mod strategy;

pub use error::RoutingError;
pub use options::RouteOptions;
pub use policy::GroupPolicy;
pub use strategy::{AccessMode, RoutingStrategy, ServerRole};
