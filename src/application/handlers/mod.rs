//! Application handlers.
//!
//! Batch handlers that orchestrate domain operations over the ports.

mod compute_results;

pub use compute_results::{ComputeResultsHandler, ComputeResultsResult};
