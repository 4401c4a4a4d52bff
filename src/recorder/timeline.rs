//! Recording timeline adjustment
//!
//! Keeps the recorded timeline continuous across pause/resume by
//! accumulating an offset equal to the time spent paused and
//! subtracting it from every forwarded timestamp. Audio anchors the
//! offset after a resume: audio timestamps are finer-grained and
//! arrive on their own callback path, so video frames are skipped
//! until the first post-resume audio frame re-establishes the offset.

use crate::capture::frame::{FrameKind, MediaFrame, MediaTime};

fn kind_index(kind: FrameKind) -> usize {
    match kind {
        FrameKind::Video => 0,
        FrameKind::Audio => 1,
    }
}

/// Per-recording timestamp rewriter.
#[derive(Debug, Default)]
pub struct TimelineAdjuster {
    /// Accumulated paused time; zero until the first resume anchors it.
    offset: MediaTime,
    /// Offset-adjusted end time of the last forwarded frame, per kind.
    last_time: [Option<MediaTime>; 2],
    paused: bool,
    needs_offset_capture: bool,
}

impl TimelineAdjuster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the timeline paused; the next resume re-anchors the offset.
    pub fn pause(&mut self) {
        self.paused = true;
        self.needs_offset_capture = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Accumulated offset so far.
    pub fn offset(&self) -> MediaTime {
        self.offset
    }

    /// Rewrite a frame's timestamps onto the recorded timeline.
    ///
    /// Returns `None` for frames that must not reach the recorder:
    /// anything while paused, video frames awaiting the post-resume
    /// audio anchor, and the anchor frame itself (it is consumed by
    /// the offset computation).
    pub fn adjust(&mut self, mut frame: MediaFrame) -> Option<MediaFrame> {
        if self.paused {
            return None;
        }

        if self.needs_offset_capture {
            if frame.kind() == FrameKind::Video {
                return None;
            }
            self.needs_offset_capture = false;

            let index = kind_index(frame.kind());
            if let Some(last) = self.last_time[index] {
                let mut timestamp = frame.pts;
                if self.offset.is_positive() {
                    timestamp = timestamp - self.offset;
                }
                let delta = timestamp - last;
                self.offset = if self.offset.is_zero() {
                    delta
                } else {
                    self.offset + delta
                };
                tracing::debug!("timeline offset now {}", self.offset);
                self.last_time = [None, None];
                return None;
            }
            // No previous reference: the very first frame after start
            // defines a zero offset and passes through.
        }

        if self.offset.is_positive() {
            frame.pts = frame.pts - self.offset;
            if let Some(dts) = frame.dts {
                frame.dts = Some(dts - self.offset);
            }
        }

        self.last_time[kind_index(frame.kind())] = Some(frame.end_time());
        Some(frame)
    }
}
