//! Application layer - Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! The domain stays synchronous; all I/O happens here through async ports.

pub mod handlers;

pub use handlers::{ComputeResultsHandler, ComputeResultsResult};
