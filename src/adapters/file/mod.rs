//! File adapters - JSON snapshots in, JSON workbooks out.

mod json_report_writer;
mod snapshot_reader;

pub use json_report_writer::JsonReportWriter;
pub use snapshot_reader::{load_snapshot, StudySnapshot};
