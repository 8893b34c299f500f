//! Output configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where the results workbook is written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for result files
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// File name prefix, followed by the generation time
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl OutputConfig {
    /// Validate output configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prefix.trim().is_empty() || self.prefix.contains(|c: char| c == '/' || c == '\\') {
            return Err(ValidationError::InvalidOutputPrefix);
        }
        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            prefix: default_prefix(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_prefix() -> String {
    "cry-wolf".to_string()
}
