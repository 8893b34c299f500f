//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `StudyReader` - Read access to events, decisions and participant data
//! - `ReportWriter` - Sink for the computed workbook

mod report_writer;
mod study_reader;

pub use report_writer::{ReportWriter, WrittenReport};
pub use study_reader::StudyReader;
