//! Error types for configuration, manifest, and input loading.

use std::path::PathBuf;

use phylofeat_parser::ParseError;
use thiserror::Error;

/// Errors that can occur while loading aggregation inputs.
#[derive(Debug, Error)]
pub enum InputError {
    /// File I/O failure without a specific input file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// An input file cannot be read.
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON input file is malformed.
    #[error("invalid JSON in {}: {source}", path.display())]
    JsonError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Manifest validation failure (e.g., duplicate dataset names).
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Configuration validation failure.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A significance-test report cannot be parsed.
    #[error("{}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Convenience alias for results with [`InputError`].
pub type Result<T> = std::result::Result<T, InputError>;
