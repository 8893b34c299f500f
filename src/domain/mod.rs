//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `study` - Deduplication, classification, aggregation and report tables
//!   for the Cry Wolf decision study

pub mod foundation;
pub mod study;
