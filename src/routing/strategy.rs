//! Routing strategy, access mode and server role tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::routing::RoutingError;

/// How destinations are ordered for each new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    /// Not configured; resolved from the server role.
    #[default]
    Undefined,
    /// Always snapshot order.
    FirstAvailable,
    /// Snapshot order from the cursor, which only moves on reported failures.
    NextAvailable,
    /// Rotate the first choice on every connection.
    RoundRobin,
    /// Round-robin over secondaries, primaries when no secondary exists.
    RoundRobinWithFallback,
}

impl RoutingStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingStrategy::Undefined => "undefined",
            RoutingStrategy::FirstAvailable => "first-available",
            RoutingStrategy::NextAvailable => "next-available",
            RoutingStrategy::RoundRobin => "round-robin",
            RoutingStrategy::RoundRobinWithFallback => "round-robin-with-fallback",
        }
    }

    /// Whether every selection moves the rotation cursor.
    pub fn rotates(self) -> bool {
        matches!(
            self,
            RoutingStrategy::RoundRobin | RoutingStrategy::RoundRobinWithFallback
        )
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingStrategy {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-available" => Ok(RoutingStrategy::FirstAvailable),
            "next-available" => Ok(RoutingStrategy::NextAvailable),
            "round-robin" => Ok(RoutingStrategy::RoundRobin),
            "round-robin-with-fallback" => Ok(RoutingStrategy::RoundRobinWithFallback),
            _ => Err(RoutingError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Client intent declared by the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    #[default]
    Undefined,
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::Undefined => "undefined",
            AccessMode::ReadWrite => "read-write",
            AccessMode::ReadOnly => "read-only",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read-write" => Ok(AccessMode::ReadWrite),
            "read-only" => Ok(AccessMode::ReadOnly),
            _ => Err(RoutingError::UnknownAccessMode(s.to_string())),
        }
    }
}

/// Which role class a destination group routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerRole {
    Primary,
    Secondary,
    PrimaryAndSecondary,
}

impl ServerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerRole::Primary => "PRIMARY",
            ServerRole::Secondary => "SECONDARY",
            ServerRole::PrimaryAndSecondary => "PRIMARY_AND_SECONDARY",
        }
    }
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerRole {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(ServerRole::Primary),
            "secondary" => Ok(ServerRole::Secondary),
            "primary_and_secondary" => Ok(ServerRole::PrimaryAndSecondary),
            _ => Err(RoutingError::InvalidRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_tokens() {
        assert_eq!(
            "round-robin-with-fallback".parse::<RoutingStrategy>().unwrap(),
            RoutingStrategy::RoundRobinWithFallback
        );
        assert_eq!(
            "First-Available".parse::<RoutingStrategy>().unwrap(),
            RoutingStrategy::FirstAvailable
        );
        assert_eq!(
            "random".parse::<RoutingStrategy>(),
            Err(RoutingError::UnknownStrategy("random".into()))
        );
    }

    #[test]
    fn test_only_round_robin_rotates() {
        assert!(RoutingStrategy::RoundRobin.rotates());
        assert!(RoutingStrategy::RoundRobinWithFallback.rotates());
        assert!(!RoutingStrategy::NextAvailable.rotates());
        assert!(!RoutingStrategy::FirstAvailable.rotates());
        assert!(!RoutingStrategy::Undefined.rotates());
    }

    #[test]
    fn test_role_is_case_insensitive() {
        assert_eq!("secondary".parse::<ServerRole>().unwrap(), ServerRole::Secondary);
        assert_eq!(
            "Primary_And_Secondary".parse::<ServerRole>().unwrap(),
            ServerRole::PrimaryAndSecondary
        );
        assert!("replica".parse::<ServerRole>().is_err());
    }

    #[test]
    fn test_access_mode_tokens() {
        assert_eq!("read-only".parse::<AccessMode>().unwrap(), AccessMode::ReadOnly);
        assert!("rw".parse::<AccessMode>().is_err());
    }
}
