//! Capture session topology
//!
//! `CaptureTopology` is the mutable configuration value object for the
//! multi-stream session: which formats are active on the primary and
//! secondary cameras, their frame-rate overrides, lens multiplicity
//! and torch state, and the recommended track settings of the two
//! microphone ports. It is mutated only by the initial configuration
//! step and by the cost governor, both on the serialized configuration
//! context; the frame path never reads it.

use crate::capture::device::{CameraDescriptor, CameraPosition, LensKind, VideoFormat};
use crate::capture::frame::{PixelEncoding, PixelFormat, SampleFormat};
use serde::{Deserialize, Serialize};

/// Width/height below which resolution reduction refuses to go.
const MIN_REDUCED_WIDTH: u32 = 640;
const MIN_REDUCED_HEIGHT: u32 = 480;

/// Frame-rate reduction step and floor, in fps.
const FRAME_RATE_STEP: u32 = 10;
const MIN_FRAME_RATE: u32 = 15;

/// Which logical stream a camera feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSlot {
    Primary,
    Secondary,
}

/// Video track settings recommended by a camera's active configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTrackConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub pixel_format: PixelFormat,
}

/// Audio track settings recommended by a microphone port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrackConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

/// Per-camera state inside the topology.
#[derive(Debug, Clone)]
struct CameraState {
    descriptor: CameraDescriptor,
    active_format: usize,
    /// Governor override of the active format's max frame rate.
    frame_rate_override: Option<u32>,
    /// Pressure-throttle clamp, (min_fps, max_fps).
    frame_rate_clamp: Option<(u32, u32)>,
    lens: LensKind,
    torch_on: bool,
    encoding: PixelEncoding,
}

impl CameraState {
    fn new(descriptor: CameraDescriptor) -> Option<Self> {
        // Highest-capability format that tolerates multi-stream use;
        // formats are listed in descending capability order.
        let active_format = descriptor.formats.iter().position(|f| f.supports_multicam)?;
        let encoding = PixelEncoding::preferred(&descriptor.available_encodings);
        let lens = descriptor.lens;
        Some(Self {
            descriptor,
            active_format,
            frame_rate_override: None,
            frame_rate_clamp: None,
            lens,
            torch_on: false,
            encoding,
        })
    }

    fn active(&self) -> &VideoFormat {
        &self.descriptor.formats[self.active_format]
    }

    fn active_frame_rate(&self) -> u32 {
        let rate = self
            .frame_rate_override
            .unwrap_or_else(|| self.active().max_frame_rate);
        match self.frame_rate_clamp {
            Some((_, max)) => rate.min(max),
            None => rate,
        }
    }
}

/// The active input set and negotiated formats of the capture session.
#[derive(Debug, Clone)]
pub struct CaptureTopology {
    primary: CameraState,
    secondary: CameraState,
    back_mic: AudioTrackConfig,
    front_mic: AudioTrackConfig,
}

impl CaptureTopology {
    /// Build the topology from the enumerated devices.
    ///
    /// Returns `None` when a camera has no multicam-capable format at
    /// all, which the caller surfaces as a configuration failure.
    pub fn new(
        primary: CameraDescriptor,
        secondary: CameraDescriptor,
        back_mic: AudioTrackConfig,
        front_mic: AudioTrackConfig,
    ) -> Option<Self> {
        Some(Self {
            primary: CameraState::new(primary)?,
            secondary: CameraState::new(secondary)?,
            back_mic,
            front_mic,
        })
    }

    fn slot(&self, slot: CameraSlot) -> &CameraState {
        match slot {
            CameraSlot::Primary => &self.primary,
            CameraSlot::Secondary => &self.secondary,
        }
    }

    fn slot_mut(&mut self, slot: CameraSlot) -> &mut CameraState {
        match slot {
            CameraSlot::Primary => &mut self.primary,
            CameraSlot::Secondary => &mut self.secondary,
        }
    }

    /// The active capture format of a camera.
    pub fn active_format(&self, slot: CameraSlot) -> VideoFormat {
        *self.slot(slot).active()
    }

    /// Effective max frame rate of a camera, overrides and clamps
    /// applied.
    pub fn active_frame_rate(&self, slot: CameraSlot) -> u32 {
        self.slot(slot).active_frame_rate()
    }

    pub fn lens(&self, slot: CameraSlot) -> LensKind {
        self.slot(slot).lens
    }

    pub fn pixel_encoding(&self, slot: CameraSlot) -> PixelEncoding {
        self.slot(slot).encoding
    }

    pub fn torch_on(&self) -> bool {
        self.primary.torch_on
    }

    /// Step a camera down to the next smaller multicam-capable format.
    ///
    /// Walks the descending-capability format list past the active
    /// entry, skipping formats that do not strictly reduce width or
    /// height. Refuses once the active format is at or below 640x480.
    pub fn reduce_resolution(&mut self, slot: CameraSlot) -> bool {
        let state = self.slot_mut(slot);
        let active = *state.active();
        if active.width <= MIN_REDUCED_WIDTH && active.height <= MIN_REDUCED_HEIGHT {
            return false;
        }

        for index in (state.active_format + 1)..state.descriptor.formats.len() {
            let format = state.descriptor.formats[index];
            if !format.supports_multicam {
                continue;
            }
            if format.width < active.width || format.height < active.height {
                state.active_format = index;
                tracing::debug!(
                    "reduced {:?} resolution to {}x{}",
                    slot,
                    format.width,
                    format.height
                );
                return true;
            }
        }
        false
    }

    /// Lower a camera's max frame rate by one step, honoring the
    /// 15 fps floor.
    pub fn reduce_frame_rate(&mut self, slot: CameraSlot) -> bool {
        let state = self.slot_mut(slot);
        let current = state.active_frame_rate();
        let reduced = current.saturating_sub(FRAME_RATE_STEP);
        if reduced < MIN_FRAME_RATE {
            return false;
        }
        state.frame_rate_override = Some(reduced);
        tracing::debug!("reduced {:?} frame rate to {} fps", slot, reduced);
        true
    }

    /// Rewire a dual-lens input to its single-lens equivalent.
    pub fn reduce_input_ports(&mut self) -> bool {
        for slot in [CameraSlot::Primary, CameraSlot::Secondary] {
            let state = self.slot_mut(slot);
            if state.lens == LensKind::Dual {
                state.lens = LensKind::Single;
                tracing::debug!("changed {:?} input from dual to single lens", slot);
                return true;
            }
        }
        false
    }

    /// Pin a camera's frame-rate bounds, used by the pressure
    /// throttle.
    pub fn clamp_frame_rate(&mut self, slot: CameraSlot, min_fps: u32, max_fps: u32) {
        self.slot_mut(slot).frame_rate_clamp = Some((min_fps, max_fps));
    }

    pub fn frame_rate_clamp(&self, slot: CameraSlot) -> Option<(u32, u32)> {
        self.slot(slot).frame_rate_clamp
    }

    /// Flip the primary camera's torch; false when there is none.
    pub fn toggle_torch(&mut self) -> bool {
        if !self.primary.descriptor.has_torch {
            return false;
        }
        self.primary.torch_on = !self.primary.torch_on;
        true
    }

    /// Track settings a camera's active configuration recommends to
    /// the recorder.
    pub fn recommended_video_settings(&self, slot: CameraSlot) -> VideoTrackConfig {
        let state = self.slot(slot);
        let format = state.active();
        VideoTrackConfig {
            width: format.width,
            height: format.height,
            frame_rate: state.active_frame_rate(),
            pixel_format: PixelFormat::Bgra8,
        }
    }

    /// Track settings a microphone port recommends to the recorder.
    pub fn recommended_audio_settings(
        &self,
        position: CameraPosition,
    ) -> AudioTrackConfig {
        match position {
            CameraPosition::Back => self.back_mic,
            CameraPosition::Front => self.front_mic,
        }
    }
}
