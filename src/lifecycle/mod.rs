//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Seed metadata caches → Build groups → Subscribe
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop topology pumps → Unsubscribe groups → Exit
//!
//! Signals (signals.rs):
//!     SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: caches are seeded before any group subscribes, so
//!   the initial lookup already sees the configured topology
//! - Fail fast: any misconfigured route aborts startup

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{RouterRuntime, StartupError};
