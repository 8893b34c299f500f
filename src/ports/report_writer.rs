//! ReportWriter port - sink for the computed output tables.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::foundation::DomainError;
use crate::domain::study::Workbook;

/// Where a written report ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub location: PathBuf,
    pub tables: usize,
    pub rows: usize,
}

/// Persists a workbook. Column order and null cells must be preserved.
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write(&self, workbook: &Workbook) -> Result<WrittenReport, DomainError>;
}
