//! Free-form route options.
//!
//! Options arrive as a string map (the query part of a metadata-cache
//! destination) and are validated here before any group is built.

use std::collections::BTreeMap;

use crate::routing::{RoutingError, ServerRole};

pub const ROLE: &str = "role";
pub const ALLOW_PRIMARY_READS: &str = "allow_primary_reads";
pub const DISCONNECT_ON_PROMOTED_TO_PRIMARY: &str = "disconnect_on_promoted_to_primary";
pub const DISCONNECT_ON_METADATA_UNAVAILABLE: &str = "disconnect_on_metadata_unavailable";

/// Parsed and validated route options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    pub role: Option<ServerRole>,
    pub allow_primary_reads: bool,
    pub disconnect_on_promoted_to_primary: bool,
    pub disconnect_on_metadata_unavailable: bool,
}

impl RouteOptions {
    /// Parse an option map. Unknown keys are rejected.
    pub fn from_query(query: &BTreeMap<String, String>) -> Result<Self, RoutingError> {
        let mut options = RouteOptions::default();

        for (key, value) in query {
            let key = key.to_ascii_lowercase();
            match key.as_str() {
                ROLE => options.role = Some(value.parse()?),
                ALLOW_PRIMARY_READS => {
                    options.allow_primary_reads = parse_yes_no(ALLOW_PRIMARY_READS, value)?
                }
                DISCONNECT_ON_PROMOTED_TO_PRIMARY => {
                    options.disconnect_on_promoted_to_primary =
                        parse_yes_no(DISCONNECT_ON_PROMOTED_TO_PRIMARY, value)?
                }
                DISCONNECT_ON_METADATA_UNAVAILABLE => {
                    options.disconnect_on_metadata_unavailable =
                        parse_yes_no(DISCONNECT_ON_METADATA_UNAVAILABLE, value)?
                }
                _ => return Err(RoutingError::UnsupportedOption(key)),
            }
        }

        Ok(options)
    }
}

fn parse_yes_no(option: &str, value: &str) -> Result<bool, RoutingError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(RoutingError::InvalidBoolean {
            option: option.to_string(),
            value: value.to_string(),
        }),
    }
}
