//! Runner errors.

use am43_control::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration or serving requests.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid YAML for the expected schema.
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The configuration parsed but failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A simulator profile names a device that is not configured.
    #[error("simulator profile '{0}' does not match any configured device")]
    UnknownSimulatedDevice(String),

    /// No radio backend is available for the requested mode.
    #[error("no radio backend available; run with --simulate")]
    NoBackend,

    /// The HTTP listener failed.
    #[error("server error: {0}")]
    Server(#[source] io::Error),
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
