//! Shared destination registry.
//!
//! Owns the only mutable routing state of a destination group and the lock
//! that guards it. Everything that must be observed together (snapshot,
//! eligible nodes, rotation cursor) lives in one [`RegistryState`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::destination::AvailableDestination;
use crate::metadata::ManagedInstance;

/// State guarded by the registry lock.
#[derive(Debug)]
pub struct RegistryState {
    /// Instances of the last applied snapshot.
    pub snapshot: Vec<ManagedInstance>,
    /// View id the snapshot was produced under.
    pub snapshot_view_id: u64,
    /// Highest view id accepted so far, snapshot applied or not.
    pub last_view_id: Option<u64>,
    /// Reachability of the metadata servers as last reported. `None` until
    /// the first accepted notification sets the baseline.
    pub metadata_reachable: Option<bool>,
    /// Nodes eligible for new connections.
    pub eligible: Vec<AvailableDestination>,
    /// Whether `eligible` holds primaries substituted for secondaries.
    pub primary_fallback: bool,
    /// Rotation cursor, always interpreted modulo `eligible.len()`.
    pub start_pos: usize,
}

impl RegistryState {
    /// Replace the eligible set, keeping the cursor within bounds.
    pub fn replace_eligible(
        &mut self,
        eligible: Vec<AvailableDestination>,
        primary_fallback: bool,
    ) {
        if !eligible.is_empty() {
            self.start_pos %= eligible.len();
        }
        self.eligible = eligible;
        self.primary_fallback = primary_fallback;
    }

    /// Whether a notification with `view_id` is older than or equal to one
    /// already accepted.
    pub fn is_stale(&self, view_id: u64) -> bool {
        self.last_view_id.is_some_and(|last| view_id <= last)
    }
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            snapshot: Vec::new(),
            snapshot_view_id: 0,
            last_view_id: None,
            metadata_reachable: None,
            eligible: Vec::new(),
            primary_fallback: false,
            start_pos: 0,
        }
    }
}

/// Mutex-protected routing state shared by selection and notification.
#[derive(Debug, Default)]
pub struct DestinationRegistry {
    state: Mutex<RegistryState>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the critical section.
    ///
    /// Critical sections never leave the state half-updated, so a poisoned
    /// lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TcpAddress;

    fn nodes(n: usize) -> Vec<AvailableDestination> {
        (0..n)
            .map(|i| {
                AvailableDestination::new(TcpAddress::new("h", 3306 + i as u16), format!("n{}", i))
            })
            .collect()
    }

    #[test]
    fn test_replace_eligible_wraps_cursor() {
        let registry = DestinationRegistry::new();
        let mut state = registry.lock();
        state.replace_eligible(nodes(5), false);
        state.start_pos = 4;

        state.replace_eligible(nodes(2), false);
        assert_eq!(state.start_pos, 0);

        state.start_pos = 1;
        state.replace_eligible(Vec::new(), false);
        assert_eq!(state.start_pos, 1);
    }

    #[test]
    fn test_is_stale() {
        let mut state = RegistryState::default();
        assert!(!state.is_stale(0));
        state.last_view_id = Some(5);
        assert!(state.is_stale(5));
        assert!(state.is_stale(3));
        assert!(!state.is_stale(6));
    }
}
