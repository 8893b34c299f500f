//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CRYWOLF` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use crywolf_analytics::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Writing results to {}", config.output.dir.display());
//! ```

mod analysis;
mod database;
mod error;
mod logging;
mod output;
mod source;

pub use analysis::AnalysisConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use output::OutputConfig;
pub use source::{SourceConfig, SourceKind};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// Every section has defaults except the database URL, which is required
/// only when reading from PostgreSQL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Input source (postgres or snapshot)
    #[serde(default)]
    pub source: SourceConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Check events, cohorts and exclusions
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Result file location
    #[serde(default)]
    pub output: OutputConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CRYWOLF` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CRYWOLF__SOURCE__KIND=snapshot` -> `source.kind = snapshot`
    /// - `CRYWOLF__DATABASE__URL=...` -> `database.url = ...`
    /// - `CRYWOLF__ANALYSIS__CHECK_EVENTS=74,75` -> `analysis.check_events = "74,75"`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CRYWOLF")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// The database section is only checked when it will be used.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        if self.source.uses_database() {
            self.database.validate()?;
        }
        self.analysis.validate()?;
        self.output.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
