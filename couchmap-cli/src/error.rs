//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use couchmap::config::{ConfigError, ConfigFileError};
use couchmap::service::ServiceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to read or write the config file
    ConfigFile(ConfigFileError),
    /// Failed to create the data service
    ServiceCreation(ServiceError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// The data service did not answer in time
    Timeout { seconds: u64 },
    /// A tile listing would be too long to print
    TooManyTiles { count: u64, limit: u64 },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::ConfigFile(_) => {
                eprintln!();
                eprintln!("Write a fresh default file with: couchmap init-config --force");
            }
            CliError::Timeout { .. } => {
                eprintln!();
                eprintln!("Check that CouchDB is running and base_url in the config is correct.");
            }
            CliError::TooManyTiles { .. } => {
                eprintln!();
                eprintln!("Use a lower --zoom or a smaller --bbox.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::ServiceCreation(e) => write!(f, "Failed to create data service: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Timeout { seconds } => {
                write!(f, "No answer from the data service within {}s", seconds)
            }
            CliError::TooManyTiles { count, limit } => {
                write!(f, "{} tiles requested, at most {} can be listed", count, limit)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::ServiceCreation(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::ServiceCreation(e)
    }
}
