//! File-based ReportWriter Adapter
//!
//! Writes a workbook as one pretty-printed JSON document per run.
//! File names carry the generation time so earlier runs are never overwritten.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::study::Workbook;
use crate::ports::{ReportWriter, WrittenReport};

/// Writes workbooks as `{prefix}_{YYYYMMDD_HH-MM-SS}.json`.
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    output_dir: PathBuf,
    prefix: String,
}

impl JsonReportWriter {
    /// Create a writer targeting `output_dir`.
    ///
    /// # Example
    /// ```ignore
    /// let writer = JsonReportWriter::new("./results", "cry-wolf");
    /// ```
    pub fn new<P: AsRef<Path>>(output_dir: P, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            prefix: prefix.into(),
        }
    }

    /// File path for a report generated at `at`.
    pub fn file_path(&self, at: Timestamp) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.json", self.prefix, at.file_stamp()))
    }

    async fn ensure_dir(&self) -> Result<(), DomainError> {
        fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            output_error(format!(
                "Failed to create {}: {}",
                self.output_dir.display(),
                e
            ))
        })
    }
}

fn output_error(message: String) -> DomainError {
    DomainError::new(ErrorCode::OutputError, message)
}

#[async_trait]
impl ReportWriter for JsonReportWriter {
    async fn write(&self, workbook: &Workbook) -> Result<WrittenReport, DomainError> {
        self.ensure_dir().await?;

        let file_path = self.file_path(Timestamp::now());

        let json = serde_json::to_string_pretty(workbook)
            .map_err(|e| output_error(format!("Failed to serialize workbook: {}", e)))?;

        fs::write(&file_path, json).await.map_err(|e| {
            output_error(format!("Failed to write {}: {}", file_path.display(), e))
        })?;

        Ok(WrittenReport {
            location: file_path,
            tables: workbook.tables.len(),
            rows: workbook.tables.iter().map(|t| t.len()).sum(),
        })
    }
}
