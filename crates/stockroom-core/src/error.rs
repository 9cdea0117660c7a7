//! Core error types for the Stockroom pipeline.

use thiserror::Error;

/// Errors from the shared domain types.
#[derive(Error, Debug)]
pub enum StockroomError {
    /// Validation errors (invalid identifiers, constraints)
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Explicitly requested config file does not exist
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required credential is not set in the environment
    #[error("missing credential: set {variable} in the environment or a .env file")]
    MissingCredential {
        /// Environment variable that should hold the credential
        variable: String,
    },

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `StockroomError`.
pub type Result<T> = std::result::Result<T, StockroomError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
