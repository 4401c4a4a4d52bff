//! Recording subsystem
//!
//! This module implements the recording half of the pipeline:
//! - ContainerWriter trait over the underlying muxer
//! - MovieRecorder driving one video + one audio track
//! - TimelineAdjuster for pause/resume-aware timestamps
//! - ffmpeg-backed production writer

pub mod ffmpeg;
pub mod movie;
pub mod settings;
pub mod state;
pub mod timeline;
pub mod writer;

use thiserror::Error;

pub use ffmpeg::FfmpegWriterFactory;
pub use movie::MovieRecorder;
pub use state::{RecordingSession, RecordingState};
pub use timeline::TimelineAdjuster;
pub use writer::{ContainerWriter, TrackKind, VideoTransform, WriterFactory};

/// Errors from the recording subsystem
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Incompatible track settings: {0}")]
    IncompatibleSettings(String),

    #[error("Container writer error: {0}")]
    Writer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;
