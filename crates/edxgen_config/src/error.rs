//! Error types for the settings store.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for settings operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or resolving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Undefined setting: {0}")]
    UndefinedSetting(String),

    #[error("Circular reference while resolving {key}: {}", chain.join(" -> "))]
    CircularReference { key: String, chain: Vec<String> },

    #[error("Invalid override '{0}', expected KEY=VALUE")]
    InvalidOverride(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid settings file {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
