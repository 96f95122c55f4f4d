//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Destination groups produce:
//!     → tracing events (subscription, applied/stale notifications,
//!       invalidations, provider reachability)
//!     → metrics.rs (selection, notification and invalidation counters)
//!
//! Consumers:
//!     → logging.rs (fmt subscriber, stdout)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, group name on every event
//! - Metrics go through the `metrics` facade; without an installed
//!   recorder every call is a no-op

pub mod logging;
pub mod metrics;
