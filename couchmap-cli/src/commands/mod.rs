//! Subcommand implementations.

pub mod init;
pub mod tiles;
pub mod view;

use std::path::{Path, PathBuf};

use couchmap::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config file to use: the `--config` argument or the default location.
pub fn resolve_config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(config_file_path)
}

pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(&resolve_config_path(path))?)
}
