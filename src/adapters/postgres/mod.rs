//! PostgreSQL adapters - Database implementations for reader ports.
//!
//! - `PostgresStudyReader` - Reads the study app's event, decision, user and
//!   answer tables

mod study_reader;

pub use study_reader::PostgresStudyReader;
