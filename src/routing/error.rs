//! Routing configuration errors.

use thiserror::Error;

/// Misconfiguration detected while building a destination group.
///
/// Every variant is fatal for the group: it must not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Routing strategy token not recognized.
    #[error("Invalid routing strategy '{0}', expected one of: first-available, next-available, round-robin, round-robin-with-fallback")]
    UnknownStrategy(String),

    /// Access mode token not recognized.
    #[error("Invalid access mode '{0}', expected one of: read-write, read-only")]
    UnknownAccessMode(String),

    /// Query option not understood by metadata-cache routing.
    #[error("Unsupported 'metadata-cache' parameter in URI: '{0}'")]
    UnsupportedOption(String),

    /// Role value not recognized.
    #[error("The role in '?role={0}' does not contain one of the valid role names: PRIMARY, SECONDARY, PRIMARY_AND_SECONDARY")]
    InvalidRole(String),

    /// Neither a role option nor an access mode was given.
    #[error("Missing 'role' in route options and no access mode to derive it from")]
    MissingRole,

    /// Boolean option with a value other than yes/no.
    #[error("Invalid value for option '{option}': '{value}'. Allowed are 'yes' and 'no'")]
    InvalidBoolean { option: String, value: String },

    /// Option or strategy only meaningful for SECONDARY routing.
    #[error("{0} is supported only for SECONDARY routing")]
    SecondaryOnly(&'static str),

    /// Option cannot be combined with the configured strategy.
    #[error("Option '{option}' cannot be used with strategy '{strategy}'")]
    StrategyConflict {
        option: &'static str,
        strategy: String,
    },

    /// Access mode contradicts the configured role.
    #[error("Access mode '{mode}' conflicts with role {role}")]
    ModeConflict { mode: String, role: String },

    /// Route references a metadata cache that does not exist.
    #[error("Unknown metadata cache '{0}'")]
    UnknownMetadataCache(String),

    /// The group was torn down and cannot subscribe again.
    #[error("Destination group '{0}' was stopped and cannot be restarted")]
    Stopped(String),
}
