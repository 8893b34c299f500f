//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size must be between 1 and 16, got {0}")]
    InvalidPoolSize(u32),

    #[error("Invalid event id list: {0}")]
    InvalidEventList(String),

    #[error("Invalid cohort suffix: {0}")]
    InvalidCohortSuffix(String),

    #[error("User {0} is both excluded and retained")]
    ConflictingExclusion(String),

    #[error("Output prefix must not be empty or contain path separators")]
    InvalidOutputPrefix,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
