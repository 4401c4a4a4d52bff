//! Device capability types
//!
//! Value types describing what the external capture layer reports
//! about its cameras, plus the narrow `CaptureSession` surface the
//! core consumes: run control and the two normalized cost metrics.

use crate::capture::frame::PixelEncoding;
use serde::{Deserialize, Serialize};

/// Physical placement of a camera or microphone port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    /// Rear-facing; feeds the primary stream by default.
    Back,
    /// User-facing; feeds the secondary stream by default.
    Front,
}

/// One capture format a camera can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFormat {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Highest frame rate the format supports
    pub max_frame_rate: u32,

    /// Whether the format may be active while another camera streams
    pub supports_multicam: bool,
}

/// Lens topology behind a camera's input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensKind {
    /// Two physical lenses feeding one logical input.
    Dual,
    /// A single wide lens.
    Single,
}

/// Capability description of one camera, as enumerated by the capture
/// layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDescriptor {
    /// Unique device ID
    pub id: String,

    /// Physical placement
    pub position: CameraPosition,

    /// Formats in descending capability order
    pub formats: Vec<VideoFormat>,

    /// Delivery encodings the device advertises
    pub available_encodings: Vec<PixelEncoding>,

    /// Lens topology of the input port
    pub lens: LensKind,

    /// Whether the camera has a controllable torch
    pub has_torch: bool,
}

/// System pressure level reported for a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Nominal,
    Fair,
    Serious,
    Critical,
    Shutdown,
}

impl PressureLevel {
    /// Whether the level calls for frame-rate throttling.
    pub fn is_elevated(self) -> bool {
        matches!(self, PressureLevel::Serious | PressureLevel::Critical)
    }
}

/// The capture session surface the core consumes.
///
/// Run control plus the two normalized capacity metrics; everything
/// else about the session lives in the external capture layer.
pub trait CaptureSession: Send + Sync {
    /// Start the session running; returns whether it is now running.
    fn start_running(&self) -> bool;

    /// Stop the session.
    fn stop_running(&self);

    /// Normalized system-pressure cost; > 1.0 exceeds the budget.
    fn system_pressure_cost(&self) -> f64;

    /// Normalized hardware cost; > 1.0 exceeds the budget.
    fn hardware_cost(&self) -> f64;
}
