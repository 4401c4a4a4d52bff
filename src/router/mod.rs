//! Frame routing
//!
//! Classifies incoming frames by source position and the current PiP
//! role. Routing is a pure function of `(role, source)` - frame
//! content never participates - so the mapping can be read straight
//! off the tables below.

use crate::capture::device::CameraPosition;
use serde::{Deserialize, Serialize};

/// Which physical camera currently fills the screen.
///
/// The other camera is the inset. Mutated only by an explicit toggle;
/// read on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipRole {
    PrimaryIsBack,
    PrimaryIsFront,
}

impl Default for PipRole {
    fn default() -> Self {
        // The back camera starts full screen, front camera inset.
        PipRole::PrimaryIsBack
    }
}

impl PipRole {
    pub fn toggled(self) -> PipRole {
        match self {
            PipRole::PrimaryIsBack => PipRole::PrimaryIsFront,
            PipRole::PrimaryIsFront => PipRole::PrimaryIsBack,
        }
    }

    /// The camera position filling the screen under this role.
    pub fn primary_position(self) -> CameraPosition {
        match self {
            PipRole::PrimaryIsBack => CameraPosition::Back,
            PipRole::PrimaryIsFront => CameraPosition::Front,
        }
    }

    /// The camera position rendered as the inset under this role.
    pub fn inset_position(self) -> CameraPosition {
        match self {
            PipRole::PrimaryIsBack => CameraPosition::Front,
            PipRole::PrimaryIsFront => CameraPosition::Back,
        }
    }
}

/// Where a video frame goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoRoute {
    CompositeAsPrimary,
    CompositeAsInset,
}

/// Route a video frame by its source camera and the current role.
pub fn route_video(role: PipRole, source: CameraPosition) -> VideoRoute {
    if source == role.primary_position() {
        VideoRoute::CompositeAsPrimary
    } else {
        VideoRoute::CompositeAsInset
    }
}

/// Whether an audio frame from the given microphone port is forwarded.
///
/// Exactly one audio track may be written, so only the microphone
/// matching the current inset camera passes; the other is discarded.
pub fn routes_audio(role: PipRole, source: CameraPosition) -> bool {
    source == role.inset_position()
}
