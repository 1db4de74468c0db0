//! Error types for document loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for document loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading a scenario document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Parsed, but not shaped like a scenario document
    #[error("invalid scenario document {path}: {source}")]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid include path '{path}': {reason}")]
    InvalidIncludePath { path: String, reason: String },

    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("circular include detected: {path}")]
    CircularInclude { path: PathBuf },

    #[error("invalid initial value for '{target}': {value}")]
    InvalidInitialValue { target: String, value: f64 },
}
