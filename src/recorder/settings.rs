//! Track settings negotiation
//!
//! The two cameras and the two microphone ports each recommend track
//! settings for the writer. Recording starts only when the two
//! recommendations of a kind agree exactly; mismatches fail the start
//! request instead of guessing, because the active source can flip
//! mid-recording when the role toggles.

use crate::capture::topology::{AudioTrackConfig, VideoTrackConfig};
use crate::recorder::writer::VideoTransform;
use crate::recorder::{RecordingError, RecordingResult};
use serde::{Deserialize, Serialize};

/// Physical orientation of the device at recording start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

/// Return the shared audio settings of the two microphone ports.
pub fn negotiate_audio_settings(
    back: &AudioTrackConfig,
    front: &AudioTrackConfig,
) -> RecordingResult<AudioTrackConfig> {
    if back == front {
        Ok(*back)
    } else {
        Err(RecordingError::IncompatibleSettings(format!(
            "back ({back:?}) and front ({front:?}) microphone settings differ"
        )))
    }
}

/// Return the shared video settings of the two cameras.
pub fn negotiate_video_settings(
    primary: &VideoTrackConfig,
    secondary: &VideoTrackConfig,
) -> RecordingResult<VideoTrackConfig> {
    if primary == secondary {
        Ok(*primary)
    } else {
        Err(RecordingError::IncompatibleSettings(format!(
            "primary ({primary:?}) and secondary ({secondary:?}) camera settings differ"
        )))
    }
}

/// Transform from the primary camera's capture orientation (portrait)
/// to the device orientation at recording start.
pub fn create_video_transform(orientation: DeviceOrientation) -> VideoTransform {
    match orientation {
        DeviceOrientation::Portrait => VideoTransform::Identity,
        DeviceOrientation::PortraitUpsideDown => VideoTransform::Rotate180,
        DeviceOrientation::LandscapeLeft => VideoTransform::Rotate90,
        DeviceOrientation::LandscapeRight => VideoTransform::Rotate270,
    }
}
