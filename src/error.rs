//! Error types for berth.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for berth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    MissingFile(#[from] MissingFileError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for the expected schema.
    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        /// Path that failed.
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No accessory with this name is configured.
    #[error("No accessory named '{name}' in configuration")]
    UnknownAccessory {
        /// Requested accessory name.
        name: String,
    },

    /// A required field is absent.
    #[error("Missing required config field: {key}")]
    MissingField {
        /// Dotted key path.
        key: String,
    },

    /// A field is present but unusable.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Dotted key path or env var name.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// An accessory was declared with an empty host list.
    #[error("Accessory '{accessory}' has no hosts")]
    NoHosts {
        /// Accessory name.
        accessory: String,
    },
}

/// A local file referenced by an accessory does not exist.
#[derive(Debug, Error)]
#[error("Missing file: {}", path.display())]
pub struct MissingFileError {
    /// The path that was checked.
    pub path: PathBuf,
}

/// Errors surfaced while dispatching a built command.
///
/// Non-zero exit statuses are not errors here; they come back inside
/// [`ExecOutput`](crate::runner::ExecOutput) for the caller to judge.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The process (local shell or ssh client) could not be spawned or awaited.
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A host-bound operation was requested for an accessory without hosts.
    #[error("Accessory '{accessory}' has no hosts to run on")]
    NoHosts {
        /// Accessory name.
        accessory: String,
    },
}
