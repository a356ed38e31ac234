//! Configuration file handling for `<config dir>/couchmap/config.ini`.
//!
//! Missing files and missing keys fall back to defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::{Ini, Properties};
use thiserror::Error;

use super::{ConfigError, EngineConfig, ServiceConfig};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Values parsed but do not form a usable engine configuration
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigError),

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// Everything the config file can set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub engine: EngineConfig,
    pub service: ServiceConfig,
}

impl ConfigFile {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, to_config_string(self))
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }
}

/// Default config file location.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("couchmap")
        .join("config.ini")
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("engine")) {
        if let Some(v) = parse_number(section, "engine", "coarse_threshold")? {
            config.engine.coarse_threshold = v;
        }
        if let Some(v) = parse_number(section, "engine", "coarse_granularity")? {
            config.engine.coarse_granularity = v;
        }
        if let Some(v) = parse_number(section, "engine", "max_zoom")? {
            config.engine.max_zoom = v;
        }
    }

    if let Some(section) = ini.section(Some("service")) {
        if let Some(v) = non_empty(section, "base_url") {
            if !v.starts_with("http://") && !v.starts_with("https://") {
                return Err(ConfigFileError::InvalidValue {
                    section: "service".to_string(),
                    key: "base_url".to_string(),
                    value: v.to_string(),
                    reason: "must start with http:// or https://".to_string(),
                });
            }
            config.service.base_url = v.to_string();
        }
        if let Some(v) = non_empty(section, "nodes_spatial") {
            config.service.nodes_spatial = v.to_string();
        }
        if let Some(v) = non_empty(section, "nodes_coarse") {
            config.service.nodes_coarse = v.to_string();
        }
        if let Some(v) = parse_number(section, "service", "timeout_secs")? {
            config.service.timeout_secs = v;
        }
    }

    config.engine.validate()?;
    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = non_empty(section, key) else {
        return Ok(None);
    };
    v.parse()
        .map(Some)
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: v.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
}

fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"# CouchMap configuration

[engine]
# Probe counts at or above this are drawn as per-tile aggregates.
# 0 aggregates every viewport.
coarse_threshold = {}
# Zoom levels added to the map zoom to pick the aggregation grid.
coarse_granularity = {}
# Upper bound for the aggregation grid zoom.
max_zoom = {}

[service]
base_url = {}
nodes_spatial = {}
nodes_coarse = {}
timeout_secs = {}
"#,
        config.engine.coarse_threshold,
        config.engine.coarse_granularity,
        config.engine.max_zoom,
        config.service.base_url,
        config.service.nodes_spatial,
        config.service.nodes_coarse,
        config.service.timeout_secs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp_dir.path().join("missing.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.engine.coarse_threshold = 500;
        config.engine.max_zoom = 18;
        config.service.base_url = "https://db.example/osm".to_string();
        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(
            &config_path,
            r#"
[engine]
coarse_granularity = 1
"#,
        )
        .unwrap();

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config.engine.coarse_granularity, 1);
        assert_eq!(config.engine.coarse_threshold, 0);
        assert_eq!(config.service, ServiceConfig::default());
    }

    #[test]
    fn test_invalid_number() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(
            &config_path,
            r#"
[engine]
coarse_threshold = lots
"#,
        )
        .unwrap();

        let err = ConfigFile::load_from(&config_path).unwrap_err();
        assert!(err.to_string().contains("coarse_threshold"));
    }

    #[test]
    fn test_out_of_range_zoom_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(
            &config_path,
            r#"
[engine]
max_zoom = 30
"#,
        )
        .unwrap();

        let err = ConfigFile::load_from(&config_path).unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Invalid(ConfigError::MaxZoomTooLarge(30))
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(
            &config_path,
            r#"
[service]
base_url = localhost:5984/nodes
"#,
        )
        .unwrap();

        let err = ConfigFile::load_from(&config_path).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_config_file_path_ends_with_app_dir() {
        let path = config_file_path();
        assert!(path.ends_with("couchmap/config.ini"));
    }
}
