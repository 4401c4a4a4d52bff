//! Single-slot frame mailbox
//!
//! Holds at most the single most recent frame: writing overwrites any
//! previous occupant, silently dropping it. Freshness over
//! completeness - a stale inset frame is worse than a skipped one.

use crate::capture::frame::MediaFrame;

/// Latest-frame cell with overwrite-on-write semantics.
#[derive(Debug, Default)]
pub struct FrameMailbox {
    slot: Option<MediaFrame>,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self { slot: None }
    }

    /// Store a frame, dropping whatever was there before.
    pub fn put(&mut self, frame: MediaFrame) {
        self.slot = Some(frame);
    }

    /// Borrow the retained frame without consuming it.
    pub fn latest(&self) -> Option<&MediaFrame> {
        self.slot.as_ref()
    }

    /// Read and clear.
    pub fn take(&mut self) -> Option<MediaFrame> {
        self.slot.take()
    }

    /// Drop the retained frame, if any.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
