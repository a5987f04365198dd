//! Parameter error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading configuration or interpreting parameter values.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("configuration root must be a JSON object")]
    NotAnObject,

    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),
}
