//! Role × access-mode × strategy decision table.
//!
//! # Eligibility
//! ```text
//! role                  | primary node            | secondary node
//! ----------------------+-------------------------+---------------
//! PRIMARY               | yes                     | no
//! SECONDARY             | existing connections    | yes
//!                       | only, unless            |
//!                       | disconnect_on_promoted  |
//! PRIMARY_AND_SECONDARY | yes                     | yes
//! ```
//!
//! Primary fallback applies to new connections only, for SECONDARY routing
//! with round-robin-with-fallback, when no secondary is eligible.

use crate::metadata::ServerMode;
use crate::routing::{AccessMode, RouteOptions, RoutingError, RoutingStrategy, ServerRole};

/// Immutable routing policy of one destination group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPolicy {
    pub server_role: ServerRole,
    pub routing_strategy: RoutingStrategy,
    pub access_mode: AccessMode,
    pub disconnect_on_promoted_to_primary: bool,
    pub disconnect_on_metadata_unavailable: bool,
}

impl GroupPolicy {
    /// Resolve the effective policy from configured values.
    pub fn resolve(
        strategy: RoutingStrategy,
        access_mode: AccessMode,
        options: &RouteOptions,
    ) -> Result<Self, RoutingError> {
        let server_role = match (options.role, access_mode) {
            (Some(role), _) => role,
            (None, AccessMode::ReadWrite) => ServerRole::Primary,
            (None, AccessMode::ReadOnly) => ServerRole::Secondary,
            (None, AccessMode::Undefined) => return Err(RoutingError::MissingRole),
        };

        if access_mode == AccessMode::ReadWrite && server_role == ServerRole::Secondary {
            return Err(RoutingError::ModeConflict {
                mode: access_mode.to_string(),
                role: server_role.to_string(),
            });
        }

        if options.allow_primary_reads && server_role != ServerRole::Secondary {
            return Err(RoutingError::SecondaryOnly("allow_primary_reads"));
        }

        let routing_strategy = match strategy {
            RoutingStrategy::Undefined => match server_role {
                ServerRole::Primary => RoutingStrategy::FirstAvailable,
                ServerRole::Secondary if options.allow_primary_reads => {
                    RoutingStrategy::RoundRobinWithFallback
                }
                _ => RoutingStrategy::RoundRobin,
            },
            RoutingStrategy::RoundRobin if options.allow_primary_reads => {
                RoutingStrategy::RoundRobinWithFallback
            }
            RoutingStrategy::FirstAvailable | RoutingStrategy::NextAvailable
                if options.allow_primary_reads =>
            {
                return Err(RoutingError::StrategyConflict {
                    option: "allow_primary_reads",
                    strategy: strategy.to_string(),
                });
            }
            RoutingStrategy::RoundRobinWithFallback if server_role != ServerRole::Secondary => {
                return Err(RoutingError::SecondaryOnly(
                    "Strategy 'round-robin-with-fallback'",
                ));
            }
            other => other,
        };

        Ok(Self {
            server_role,
            routing_strategy,
            access_mode,
            disconnect_on_promoted_to_primary: options.disconnect_on_promoted_to_primary,
            disconnect_on_metadata_unavailable: options.disconnect_on_metadata_unavailable,
        })
    }

    /// Whether a node in `mode` may carry connections of this group.
    ///
    /// `for_new_connections == false` answers the question for connections
    /// that are already established.
    pub fn admits(&self, mode: ServerMode, for_new_connections: bool) -> bool {
        match (self.server_role, mode) {
            (ServerRole::PrimaryAndSecondary, _) => true,
            (ServerRole::Primary, ServerMode::ReadWrite) => true,
            (ServerRole::Primary, ServerMode::ReadOnly) => false,
            (ServerRole::Secondary, ServerMode::ReadOnly) => true,
            (ServerRole::Secondary, ServerMode::ReadWrite) => {
                !for_new_connections && !self.disconnect_on_promoted_to_primary
            }
        }
    }

    /// Whether an empty secondary set is replaced by the primaries.
    pub fn falls_back_to_primaries(&self) -> bool {
        self.server_role == ServerRole::Secondary
            && self.routing_strategy == RoutingStrategy::RoundRobinWithFallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(role: Option<ServerRole>) -> RouteOptions {
        RouteOptions {
            role,
            ..RouteOptions::default()
        }
    }

    #[test]
    fn test_role_from_access_mode() {
        let p =
            GroupPolicy::resolve(RoutingStrategy::Undefined, AccessMode::ReadWrite, &options(None))
                .unwrap();
        assert_eq!(p.server_role, ServerRole::Primary);
        assert_eq!(p.routing_strategy, RoutingStrategy::FirstAvailable);

        let p =
            GroupPolicy::resolve(RoutingStrategy::Undefined, AccessMode::ReadOnly, &options(None))
                .unwrap();
        assert_eq!(p.server_role, ServerRole::Secondary);
        assert_eq!(p.routing_strategy, RoutingStrategy::RoundRobin);

        assert_eq!(
            GroupPolicy::resolve(
                RoutingStrategy::RoundRobin,
                AccessMode::Undefined,
                &options(None)
            ),
            Err(RoutingError::MissingRole)
        );
    }

    #[test]
    fn test_allow_primary_reads_enables_fallback() {
        let opts = RouteOptions {
            role: Some(ServerRole::Secondary),
            allow_primary_reads: true,
            ..RouteOptions::default()
        };
        let p =
            GroupPolicy::resolve(RoutingStrategy::RoundRobin, AccessMode::ReadOnly, &opts).unwrap();
        assert_eq!(p.routing_strategy, RoutingStrategy::RoundRobinWithFallback);
        assert!(p.falls_back_to_primaries());

        let opts = RouteOptions {
            role: Some(ServerRole::Primary),
            allow_primary_reads: true,
            ..RouteOptions::default()
        };
        assert_eq!(
            GroupPolicy::resolve(RoutingStrategy::RoundRobin, AccessMode::Undefined, &opts),
            Err(RoutingError::SecondaryOnly("allow_primary_reads"))
        );
    }

    #[test]
    fn test_fallback_strategy_requires_secondary() {
        let err = GroupPolicy::resolve(
            RoutingStrategy::RoundRobinWithFallback,
            AccessMode::Undefined,
            &options(Some(ServerRole::PrimaryAndSecondary)),
        );
        assert!(matches!(err, Err(RoutingError::SecondaryOnly(_))));
    }

    #[test]
    fn test_read_write_secondary_conflict() {
        let err = GroupPolicy::resolve(
            RoutingStrategy::RoundRobin,
            AccessMode::ReadWrite,
            &options(Some(ServerRole::Secondary)),
        );
        assert!(matches!(err, Err(RoutingError::ModeConflict { .. })));
    }

    #[test]
    fn test_admits_table() {
        let mut p = GroupPolicy::resolve(
            RoutingStrategy::RoundRobin,
            AccessMode::ReadOnly,
            &options(Some(ServerRole::Secondary)),
        )
        .unwrap();

        assert!(p.admits(ServerMode::ReadOnly, true));
        assert!(!p.admits(ServerMode::ReadWrite, true));
        // established connections may stay on a promoted node
        assert!(p.admits(ServerMode::ReadWrite, false));

        p.disconnect_on_promoted_to_primary = true;
        assert!(!p.admits(ServerMode::ReadWrite, false));

        p.server_role = ServerRole::Primary;
        assert!(p.admits(ServerMode::ReadWrite, true));
        assert!(!p.admits(ServerMode::ReadOnly, false));

        p.server_role = ServerRole::PrimaryAndSecondary;
        assert!(p.admits(ServerMode::ReadOnly, true));
        assert!(p.admits(ServerMode::ReadWrite, true));
    }
}
