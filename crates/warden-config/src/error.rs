use std::path::PathBuf;

use thiserror::Error;

/// A configuration file that could not be used, or values that cannot run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid warden TOML: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Loaded values that no component can be built from.
    #[error("invalid warden configuration: {0}")]
    ValidationError(String),
}
