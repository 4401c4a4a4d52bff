//! Error types and handling
//!
//! Crate-wide error taxonomy. Module-specific errors (notably
//! `recorder::RecordingError`) convert into `PipelineError` at the
//! controller boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline-wide error type
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Recording error: {0}")]
    Recording(#[from] crate::recorder::RecordingError),

    #[error("Capture session error: {0}")]
    Session(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),
}

/// Error response for the host layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<PipelineError> for ErrorResponse {
    fn from(error: PipelineError) -> Self {
        let code = match &error {
            PipelineError::Io(_) => "IO_ERROR",
            PipelineError::Serialization(_) => "SERIALIZATION_ERROR",
            PipelineError::Setup(_) => "SETUP_ERROR",
            PipelineError::Recording(_) => "RECORDING_ERROR",
            PipelineError::Session(_) => "SESSION_ERROR",
            PipelineError::NotAuthorized(_) => "NOT_AUTHORIZED",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;
