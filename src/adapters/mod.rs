//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Study database reader (sqlx)
//! - `file` - JSON snapshot loader and JSON workbook writer
//! - `memory` - In-memory reader and writer for tests and loaded snapshots

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::{load_snapshot, JsonReportWriter, StudySnapshot};
pub use memory::{InMemoryReportWriter, InMemoryStudyReader};
pub use postgres::PostgresStudyReader;
