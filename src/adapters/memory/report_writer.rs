//! In-Memory ReportWriter Adapter
//!
//! Captures written workbooks. Useful for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::domain::study::Workbook;
use crate::ports::{ReportWriter, WrittenReport};

/// Keeps every written workbook in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReportWriter {
    written: Arc<RwLock<Vec<Workbook>>>,
}

impl InMemoryReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently written workbook.
    pub async fn last(&self) -> Option<Workbook> {
        self.written.read().await.last().cloned()
    }

    pub async fn write_count(&self) -> usize {
        self.written.read().await.len()
    }
}

#[async_trait]
impl ReportWriter for InMemoryReportWriter {
    async fn write(&self, workbook: &Workbook) -> Result<WrittenReport, DomainError> {
        let mut written = self.written.write().await;
        written.push(workbook.clone());
        Ok(WrittenReport {
            location: PathBuf::from(format!("memory://{}", written.len())),
            tables: workbook.tables.len(),
            rows: workbook.tables.iter().map(|t| t.len()).sum(),
        })
    }
}
