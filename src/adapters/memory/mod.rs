//! In-memory adapters for tests and preloaded snapshots.

mod report_writer;
mod study_reader;

pub use report_writer::InMemoryReportWriter;
pub use study_reader::InMemoryStudyReader;
