//! Core error types

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating the startup configuration.
///
/// These are fatal at startup only; nothing in the running protocol
/// produces them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML for the expected schema
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration is well-formed but semantically inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
