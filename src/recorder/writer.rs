//! Container writer abstraction
//!
//! The recorder owns exactly one container writer per recording
//! session. The trait mirrors what a real-time muxer offers: a session
//! that opens at a time origin, per-track readiness, append, and a
//! blocking finalize that yields the finished file. Production code
//! uses the ffmpeg-backed implementation; tests substitute an
//! in-memory writer.

use crate::capture::frame::{MediaFrame, MediaTime};
use crate::capture::topology::{AudioTrackConfig, VideoTrackConfig};
use crate::recorder::RecordingResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Track identity inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Geometric transform baked into the video track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoTransform {
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl VideoTransform {
    /// Rotation in degrees, when any.
    pub fn rotation_degrees(self) -> Option<u32> {
        match self {
            VideoTransform::Identity => None,
            VideoTransform::Rotate90 => Some(90),
            VideoTransform::Rotate180 => Some(180),
            VideoTransform::Rotate270 => Some(270),
        }
    }
}

/// A writer serializing one video and one audio track into a playable
/// container file.
///
/// All methods are synchronous and must not block beyond local I/O;
/// `finalize` is the exception and runs off the capture path.
pub trait ContainerWriter: Send {
    /// Open the container session with its time origin.
    fn begin_session(&mut self, origin: MediaTime) -> RecordingResult<()>;

    /// Whether the track can accept another frame right now.
    ///
    /// A false answer means the caller drops the frame; frames are
    /// never queued across congestion.
    fn is_ready_for(&self, track: TrackKind) -> bool;

    /// Append a frame to a track. Ownership of the frame transfers to
    /// the writer.
    fn append(&mut self, track: TrackKind, frame: MediaFrame) -> RecordingResult<()>;

    /// Finish the container and return the finished file's location.
    ///
    /// Blocking; the recorder calls this on a background thread.
    fn finalize(self: Box<Self>) -> RecordingResult<PathBuf>;

    /// Where the finished container will land.
    fn output_path(&self) -> &Path;
}

/// Creates a container writer at a fresh output location from the
/// negotiated track settings.
pub trait WriterFactory: Send + Sync {
    fn create(
        &self,
        audio: &AudioTrackConfig,
        video: &VideoTrackConfig,
        transform: VideoTransform,
    ) -> RecordingResult<Box<dyn ContainerWriter>>;
}
