//! Error types for the load generator.
//!
//! Two very different failure classes live here. Startup failures
//! (`Config`, `Connection`, `Io`, `Toml`) abort the process before any
//! worker runs. `Execution` failures are absorbed by the worker loop and
//! only ever show up in the error counter and the log.

use thiserror::Error;

/// The main error type for load generator operations.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to establish a database connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single query failed against an otherwise healthy connection.
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed config file.
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LoadError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for load generator operations.
pub type LoadResult<T> = Result<T, LoadError>;
