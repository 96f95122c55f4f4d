//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing caches and
//!   the replicaset those caches serve)
//! - Parse routing tokens and options up front
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{InstanceConfig, RouterConfig};
use crate::routing::RoutingError;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    #[error("duplicate route '{0}'")]
    DuplicateRoute(String),

    #[error("duplicate metadata cache '{0}'")]
    DuplicateCache(String),

    #[error("route '{route}' references unknown metadata cache '{cache}'")]
    UnknownCache { route: String, cache: String },

    #[error("route '{route}': metadata cache '{cache}' does not serve replicaset '{replicaset}'")]
    UnknownReplicaset {
        route: String,
        cache: String,
        replicaset: String,
    },

    #[error("route '{route}': {source}")]
    InvalidRoute {
        route: String,
        #[source]
        source: RoutingError,
    },

    #[error("metadata cache '{cache}' lists instance '{id}' more than once")]
    DuplicateInstance { cache: String, id: String },

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut caches = HashSet::new();
    for cache in &config.metadata_caches {
        if cache.name.is_empty() {
            errors.push(ValidationError::EmptyName("metadata cache"));
        } else if !caches.insert(cache.name.as_str()) {
            errors.push(ValidationError::DuplicateCache(cache.name.clone()));
        }
        if let Some(id) = duplicate_instance(&cache.instances) {
            errors.push(ValidationError::DuplicateInstance {
                cache: cache.name.clone(),
                id: id.to_string(),
            });
        }
    }

    let mut routes = HashSet::new();
    for route in &config.routes {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyName("route"));
        } else if !routes.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        match config.metadata_cache(&route.metadata_cache) {
            None => errors.push(ValidationError::UnknownCache {
                route: route.name.clone(),
                cache: route.metadata_cache.clone(),
            }),
            Some(cache) if cache.replicaset != route.replicaset => {
                errors.push(ValidationError::UnknownReplicaset {
                    route: route.name.clone(),
                    cache: cache.name.clone(),
                    replicaset: route.replicaset.clone(),
                })
            }
            Some(_) => {}
        }

        if let Err(source) = route.to_spec().and_then(|spec| spec.policy()) {
            errors.push(ValidationError::InvalidRoute {
                route: route.name.clone(),
                source,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// First instance id listed more than once.
pub fn duplicate_instance(instances: &[InstanceConfig]) -> Option<&str> {
    let mut seen = HashSet::new();
    instances
        .iter()
        .find(|i| !seen.insert(i.id.as_str()))
        .map(|i| i.id.as_str())
}
