//! Recording state tracking

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current state of the recording subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Currently recording
    Recording,
    /// Recording is paused
    Paused,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Bookkeeping for one active recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Unix timestamp when the recording started
    pub unix_start_ms: u64,

    /// Number of pause/resume cycles so far
    pub pause_count: u32,
}

impl RecordingSession {
    /// Create a session starting now
    pub fn new() -> Self {
        Self {
            unix_start_ms: Utc::now().timestamp_millis() as u64,
            pause_count: 0,
        }
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}
