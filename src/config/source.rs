//! Input source configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where study data is read from
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Live study database
    #[default]
    Postgres,
    /// JSON export of the study tables
    Snapshot,
}

/// Input source configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Reader to use
    #[serde(default)]
    pub kind: SourceKind,

    /// Snapshot file, required when `kind = snapshot`
    pub snapshot_path: Option<PathBuf>,
}

impl SourceConfig {
    /// Check if the live database is the source
    pub fn uses_database(&self) -> bool {
        self.kind == SourceKind::Postgres
    }

    /// Validate source configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.kind == SourceKind::Snapshot && self.snapshot_path.is_none() {
            return Err(ValidationError::MissingRequired(
                "CRYWOLF__SOURCE__SNAPSHOT_PATH",
            ));
        }
        Ok(())
    }
}
