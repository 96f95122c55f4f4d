//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::{RouterConfig, TopologyFile};
use crate::config::validation::{duplicate_instance, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
///
/// Relative topology file paths are resolved against the directory of the
/// configuration file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let mut config = parse_config(&read(path)?)?;

    if let Some(base) = path.parent() {
        for cache in &mut config.metadata_caches {
            if let Some(file) = cache.topology_file.as_mut() {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
        }
    }

    Ok(config)
}

/// Load a topology file.
pub fn load_topology(path: &Path) -> Result<TopologyFile, ConfigError> {
    let topology: TopologyFile = toml::from_str(&read(path)?)?;

    if let Some(id) = duplicate_instance(&topology.instances) {
        return Err(ConfigError::Validation(vec![ValidationError::DuplicateInstance {
            cache: path.display().to_string(),
            id: id.to_string(),
        }]));
    }

    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ServerMode;

    const CONFIG: &str = r#"
        [observability]
        log_level = "debug"

        [[metadata_caches]]
        name = "ham"
        topology_file = "topology.toml"

        [[routes]]
        name = "ro"
        metadata_cache = "ham"
        routing_strategy = "round-robin"
        access_mode = "read-only"

        [routes.options]
        role = "SECONDARY"
        disconnect_on_promoted_to_primary = "yes"
    "#;

    #[test]
    fn test_parse_config() {
        let config = parse_config(CONFIG).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.metadata_caches[0].replicaset, "default");
        assert_eq!(config.routes[0].options.len(), 2);
    }

    #[test]
    fn test_parse_rejects_bad_strategy() {
        let content = CONFIG.replace("\"round-robin\"", "\"random\"");
        let err = parse_config(&content).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("random"));
    }

    #[test]
    fn test_load_resolves_topology_relative_to_config() {
        let dir = std::env::temp_dir()
            .join(format!("metadata-router-loader-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("router.toml");
        fs::write(&config_path, CONFIG).unwrap();
        fs::write(
            dir.join("topology.toml"),
            r#"
            [[instances]]
            id = "p1"
            host = "db1"
            port = 3306
            mode = "read-write"
            "#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        let topology_path = config.metadata_caches[0].topology_file.clone().unwrap();
        assert_eq!(topology_path, dir.join("topology.toml"));

        let topology = load_topology(&topology_path).unwrap();
        assert!(topology.metadata_reachable);
        assert_eq!(topology.instances[0].mode, ServerMode::ReadWrite);

        fs::remove_dir_all(&dir).unwrap_or_default();
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/router.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
