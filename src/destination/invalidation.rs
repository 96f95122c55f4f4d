//! Outbound "invalidate connections" signal.
//!
//! Raised by a destination group when connections bound to a node must be
//! torn down. Tearing them down is the job of the connection manager that
//! consumes the signal.

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

use crate::destination::AvailableDestination;

/// Why connections to a node should be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// A secondary became primary and the group only serves secondaries.
    PromotedToPrimary,
    /// The node left the set the group may route to.
    Removed,
    /// The metadata servers became unreachable.
    MetadataUnavailable,
}

impl InvalidationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            InvalidationReason::PromotedToPrimary => "promoted_to_primary",
            InvalidationReason::Removed => "removed",
            InvalidationReason::MetadataUnavailable => "metadata_unavailable",
        }
    }
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Invalidate connections of `group` currently bound to `destination`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationEvent {
    pub group: String,
    pub destination: AvailableDestination,
    pub reason: InvalidationReason,
}

/// Consumer of invalidation signals. Must not block.
pub trait ConnectionInvalidator: Send + Sync {
    fn invalidate(&self, event: InvalidationEvent);
}

impl ConnectionInvalidator for mpsc::UnboundedSender<InvalidationEvent> {
    fn invalidate(&self, event: InvalidationEvent) {
        if let Err(e) = self.send(event) {
            tracing::debug!(
                group = %e.0.group,
                destination = %e.0.destination.address,
                "Invalidation dropped, no receiver"
            );
        }
    }
}

/// Invalidator that drops every signal, for groups without a connection
/// manager attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreInvalidations;

impl ConnectionInvalidator for IgnoreInvalidations {
    fn invalidate(&self, event: InvalidationEvent) {
        tracing::trace!(group = %event.group, reason = %event.reason, "Invalidation ignored");
    }
}
