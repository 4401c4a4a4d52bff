//! Shared utilities
//!
//! Error types and tracing setup used across the crate.

pub mod error;
pub mod logging;

pub use error::{PipelineError, PipelineResult};
