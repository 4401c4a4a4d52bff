//! Capture-side types
//!
//! Frame and timestamp value types shared by the whole pipeline, the
//! single-slot frame mailbox, device capability descriptors, and the
//! mutable capture-session topology the governor works on. Device I/O
//! itself lives outside the crate; frames arrive through
//! `CaptureController` with their format descriptors attached.

pub mod device;
pub mod frame;
pub mod mailbox;
pub mod topology;

pub use device::{CameraDescriptor, CameraPosition, CaptureSession, PressureLevel, VideoFormat};
pub use frame::{FormatDescriptor, FrameKind, MediaFrame, MediaTime, PixelFormat, SampleFormat};
pub use mailbox::FrameMailbox;
pub use topology::{CameraSlot, CaptureTopology};
