//! Timestamped media frames
//!
//! `MediaFrame` is the unit of data flowing through the pipeline: one
//! video frame or one run of audio samples, with presentation/decode
//! timestamps and an owning buffer. Ownership transfers down the
//! pipeline; no stage keeps a frame after forwarding it (the
//! compositor's single retained inset frame is the one exception).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A signed media timestamp with nanosecond resolution.
///
/// Zero doubles as "not yet established" in the places that mirror an
/// uninitialized offset; genuinely absent times are `Option<MediaTime>`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct MediaTime {
    nanos: i64,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime { nanos: 0 };

    pub fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            nanos: millis * 1_000_000,
        }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            nanos: (secs * 1e9).round() as i64,
        }
    }

    pub fn as_nanos(self) -> i64 {
        self.nanos
    }

    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }

    pub fn is_zero(self) -> bool {
        self.nanos == 0
    }

    pub fn is_positive(self) -> bool {
        self.nanos > 0
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: MediaTime) -> MediaTime {
        MediaTime {
            nanos: self.nanos + rhs.nanos,
        }
    }
}

impl AddAssign for MediaTime {
    fn add_assign(&mut self, rhs: MediaTime) {
        self.nanos += rhs.nanos;
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: MediaTime) -> MediaTime {
        MediaTime {
            nanos: self.nanos - rhs.nanos,
        }
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

/// Kind of data a frame carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Video,
    Audio,
}

/// Pixel layout of a raw video buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Packed BGRA, 4 bytes per pixel. The negotiated delivery format.
    Bgra8,
    /// YUV 4:2:0 semi-planar.
    Nv12,
}

impl PixelFormat {
    /// Byte size of one frame at the given dimensions.
    pub fn bytes_per_frame(self, width: u32, height: u32) -> usize {
        match self {
            PixelFormat::Bgra8 => (width as usize) * (height as usize) * 4,
            PixelFormat::Nv12 => (width as usize) * (height as usize) * 3 / 2,
        }
    }
}

/// Delivery-path compression applied to the negotiated pixel format.
///
/// Selection order at configure time is lossy, then lossless, then
/// uncompressed, matching what capture hardware advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelEncoding {
    CompressedLossy,
    CompressedLossless,
    Packed,
}

impl PixelEncoding {
    /// Pick the preferred encoding out of what a device advertises.
    pub fn preferred(available: &[PixelEncoding]) -> PixelEncoding {
        for candidate in [
            PixelEncoding::CompressedLossy,
            PixelEncoding::CompressedLossless,
            PixelEncoding::Packed,
        ] {
            if available.contains(&candidate) {
                return candidate;
            }
        }
        PixelEncoding::Packed
    }
}

/// Sample layout of a raw audio buffer (interleaved)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    S16,
    F32,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S16 => 2,
            SampleFormat::F32 => 4,
        }
    }
}

/// Format descriptor attached to every frame.
///
/// The frame path reads only this cached descriptor, never live
/// topology state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatDescriptor {
    Video {
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
    },
    Audio {
        sample_rate: u32,
        channels: u16,
        sample_format: SampleFormat,
    },
}

impl FormatDescriptor {
    pub fn kind(&self) -> FrameKind {
        match self {
            FormatDescriptor::Video { .. } => FrameKind::Video,
            FormatDescriptor::Audio { .. } => FrameKind::Audio,
        }
    }
}

/// One timestamped unit of video or audio data.
#[derive(Debug, Clone)]
pub struct MediaFrame {
    /// Presentation timestamp.
    pub pts: MediaTime,
    /// Decode timestamp, when the source provides one.
    pub dts: Option<MediaTime>,
    /// Duration of the frame; `MediaTime::ZERO` when unknown.
    pub duration: MediaTime,
    /// Format of the owned buffer.
    pub descriptor: FormatDescriptor,
    /// The owned data buffer.
    pub data: Vec<u8>,
}

impl MediaFrame {
    pub fn kind(&self) -> FrameKind {
        self.descriptor.kind()
    }

    /// Presentation end time: pts plus duration when the duration is
    /// known, bare pts otherwise.
    pub fn end_time(&self) -> MediaTime {
        if self.duration.is_positive() {
            self.pts + self.duration
        } else {
            self.pts
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_time_arithmetic() {
        let a = MediaTime::from_secs_f64(1.5);
        let b = MediaTime::from_millis(500);
        assert_eq!((a - b).as_secs_f64(), 1.0);
        assert_eq!((a + b).as_nanos(), 2_000_000_000);
        assert!(MediaTime::ZERO.is_zero());
        assert!(!b.is_zero());
    }

    #[test]
    fn pixel_format_frame_sizes() {
        assert_eq!(PixelFormat::Bgra8.bytes_per_frame(4, 2), 32);
        assert_eq!(PixelFormat::Nv12.bytes_per_frame(4, 2), 12);
    }

    #[test]
    fn pixel_encoding_preference_order() {
        assert_eq!(
            PixelEncoding::preferred(&[PixelEncoding::Packed, PixelEncoding::CompressedLossy]),
            PixelEncoding::CompressedLossy
        );
        assert_eq!(
            PixelEncoding::preferred(&[PixelEncoding::Packed, PixelEncoding::CompressedLossless]),
            PixelEncoding::CompressedLossless
        );
        assert_eq!(PixelEncoding::preferred(&[]), PixelEncoding::Packed);
    }

    #[test]
    fn end_time_falls_back_to_pts_without_duration() {
        let frame = MediaFrame {
            pts: MediaTime::from_millis(40),
            dts: None,
            duration: MediaTime::ZERO,
            descriptor: FormatDescriptor::Audio {
                sample_rate: 44_100,
                channels: 1,
                sample_format: SampleFormat::S16,
            },
            data: Vec::new(),
        };
        assert_eq!(frame.end_time(), MediaTime::from_millis(40));
    }
}
