//! Error types for guard-rs

use thiserror::Error;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Guard error types
#[derive(Error, Debug)]
pub enum GuardError {
    /// Xray configuration file does not exist
    #[error("Xray config not found at {0}")]
    NotFound(String),

    /// Xray configuration could not be parsed
    #[error("Malformed Xray config: {0}")]
    MalformedInput(String),

    /// Database read failed
    #[error("Database error: {0}")]
    DataAccess(#[from] sqlx::Error),

    /// Process configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(String),
}

impl From<::config::ConfigError> for GuardError {
    fn from(e: ::config::ConfigError) -> Self {
        GuardError::Config(e.to_string())
    }
}
