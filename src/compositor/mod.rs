//! Picture-in-picture video compositor
//!
//! Fuses the full-screen frame with the most recent inset frame into a
//! single output buffer. Resources (output descriptor, buffer pool)
//! are prepared lazily from the first primary frame; the retained
//! inset frame lives in a single-slot mailbox and is overwritten, not
//! queued. A compositor that is not prepared, or that is handed
//! incompatible formats, skips the frame silently.

pub mod pool;

use crate::capture::frame::{FormatDescriptor, MediaFrame, PixelFormat};
use crate::capture::mailbox::FrameMailbox;
use pool::BufferPool;
use serde::{Deserialize, Serialize};

/// In-flight output buffers tolerated before the pool allocates,
/// mirroring the writer-side backpressure the capture thread must
/// absorb without stalling.
pub const RETAINED_BUFFER_HINT: usize = 3;

/// Overlay placement, normalized to the full-screen frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayRect {
    /// Default inset placement: lower-left quadrant, matching the
    /// initial on-screen layout before the host reports geometry.
    pub const DEFAULT: OverlayRect = OverlayRect {
        x: 0.05,
        y: 0.5,
        width: 0.3,
        height: 0.25,
    };

    /// Clamp the rectangle to the unit square.
    pub fn clamped(self) -> OverlayRect {
        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        OverlayRect {
            x,
            y,
            width: self.width.clamp(0.0, 1.0 - x),
            height: self.height.clamp(0.0, 1.0 - y),
        }
    }
}

impl Default for OverlayRect {
    fn default() -> Self {
        OverlayRect::DEFAULT
    }
}

#[derive(Debug)]
struct PreparedState {
    descriptor: FormatDescriptor,
    pool: BufferPool,
}

/// The PiP video mixer.
#[derive(Debug)]
pub struct PipCompositor {
    prepared: Option<PreparedState>,
    overlay: OverlayRect,
    inset: FrameMailbox,
}

impl Default for PipCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipCompositor {
    pub fn new() -> Self {
        Self {
            prepared: None,
            overlay: OverlayRect::DEFAULT,
            inset: FrameMailbox::new(),
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    /// Update the overlay rectangle; effective for the next mix.
    pub fn set_overlay(&mut self, rect: OverlayRect) {
        self.overlay = rect;
    }

    /// Retain a new inset frame, overwriting the previous one.
    pub fn set_inset_frame(&mut self, frame: MediaFrame) {
        self.inset.put(frame);
    }

    /// Allocate output resources for the given video format.
    pub fn prepare(&mut self, descriptor: FormatDescriptor, retained_buffer_hint: usize) {
        if let FormatDescriptor::Video {
            width,
            height,
            pixel_format,
        } = descriptor
        {
            let buffer_size = pixel_format.bytes_per_frame(width, height);
            tracing::debug!(
                "compositor prepared for {}x{} ({} retained buffers)",
                width,
                height,
                retained_buffer_hint
            );
            self.prepared = Some(PreparedState {
                descriptor,
                pool: BufferPool::new(buffer_size, retained_buffer_hint),
            });
        }
    }

    /// Release prepared resources and the retained inset frame.
    ///
    /// Called when rendering is disabled so no stale or large buffers
    /// outlive the foreground session.
    pub fn reset(&mut self) {
        self.prepared = None;
        self.inset.clear();
    }

    /// Return a skipped output frame's storage to the pool.
    pub fn recycle_output(&mut self, frame: MediaFrame) {
        if let Some(prepared) = self.prepared.as_mut() {
            prepared.pool.release(frame.data);
        }
    }

    /// Composite a primary frame with the retained inset frame.
    ///
    /// Prepares lazily from the primary frame's format. Returns `None`
    /// - a silent skip - when no inset frame has arrived yet or the
    /// formats cannot be fused.
    pub fn composite(&mut self, primary: &MediaFrame, inset_is_front: bool) -> Option<MediaFrame> {
        if self.inset.is_empty() {
            return None;
        }

        let needs_prepare = match &self.prepared {
            Some(state) => state.descriptor != primary.descriptor,
            None => true,
        };
        if needs_prepare {
            self.prepare(primary.descriptor, RETAINED_BUFFER_HINT);
        }

        let data = self.mix_into_pool(primary, inset_is_front)?;
        Some(MediaFrame {
            pts: primary.pts,
            dts: primary.dts,
            duration: primary.duration,
            descriptor: primary.descriptor,
            data,
        })
    }

    /// Fuse `primary` and `inset` into one buffer.
    ///
    /// `None` until `prepare` has run, and for format mismatches.
    /// The inset is scaled into the overlay rectangle; a front-camera
    /// inset is mirrored horizontally so it records the way it is
    /// natural to view.
    pub fn mix(
        &mut self,
        primary: &MediaFrame,
        inset: &MediaFrame,
        inset_is_front: bool,
    ) -> Option<Vec<u8>> {
        let prepared = self.prepared.as_mut()?;
        if primary.descriptor != prepared.descriptor {
            return None;
        }

        let FormatDescriptor::Video {
            width,
            height,
            pixel_format,
        } = primary.descriptor
        else {
            return None;
        };
        let FormatDescriptor::Video {
            width: inset_width,
            height: inset_height,
            pixel_format: inset_pixel_format,
        } = inset.descriptor
        else {
            return None;
        };

        // Only packed BGRA buffers can be fused on this path.
        if pixel_format != PixelFormat::Bgra8 || inset_pixel_format != pixel_format {
            return None;
        }
        if primary.data.len() < pixel_format.bytes_per_frame(width, height)
            || inset.data.len() < pixel_format.bytes_per_frame(inset_width, inset_height)
            || inset_width == 0
            || inset_height == 0
        {
            return None;
        }

        let mut out = prepared.pool.acquire();
        out.extend_from_slice(&primary.data);

        let rect = self.overlay.clamped();
        let dst_x = (rect.x * width as f64).round() as u32;
        let dst_y = (rect.y * height as f64).round() as u32;
        let dst_w = ((rect.width * width as f64).round() as u32).min(width - dst_x.min(width));
        let dst_h = ((rect.height * height as f64).round() as u32).min(height - dst_y.min(height));
        if dst_w == 0 || dst_h == 0 {
            return Some(out);
        }

        let Ok(out_pixels) = bytemuck::try_cast_slice_mut::<u8, u32>(&mut out[..]) else {
            return None;
        };
        let Ok(inset_pixels) = bytemuck::try_cast_slice::<u8, u32>(&inset.data[..]) else {
            return None;
        };

        for row in 0..dst_h {
            let src_y = (row as u64 * inset_height as u64 / dst_h as u64) as u32;
            let dst_base = ((dst_y + row) * width + dst_x) as usize;
            let src_base = (src_y * inset_width) as usize;
            for col in 0..dst_w {
                let mut src_x = (col as u64 * inset_width as u64 / dst_w as u64) as u32;
                if inset_is_front {
                    src_x = inset_width - 1 - src_x;
                }
                out_pixels[dst_base + col as usize] = inset_pixels[src_base + src_x as usize];
            }
        }

        Some(out)
    }

    fn mix_into_pool(&mut self, primary: &MediaFrame, inset_is_front: bool) -> Option<Vec<u8>> {
        let inset = self.inset.take()?;
        let out = self.mix(primary, &inset, inset_is_front);
        // The inset frame stays retained for faster primary cadences.
        self.inset.put(inset);
        out
    }
}
