//! pipcam - dual-camera picture-in-picture capture and recording.
//!
//! This crate implements the live media pipeline behind a two-camera
//! recording app: frames from a primary and a secondary camera are
//! routed by role, composited into a single picture-in-picture stream,
//! and optionally written together with one microphone path into a
//! timestamped MP4 whose timeline is pause/resume aware. A session
//! cost governor watches the capture session's capacity metrics and
//! steps capture quality down before the device falls over.
//!
//! Preview rendering, permission prompts and persistence of finished
//! recordings are host concerns; the host drives the pipeline through
//! [`controller::CaptureController`] and observes outcomes on its
//! event stream.

pub mod capture;
pub mod compositor;
pub mod controller;
pub mod governor;
pub mod recorder;
pub mod router;
pub mod utils;

pub use capture::frame::{FormatDescriptor, FrameKind, MediaFrame, MediaTime};
pub use controller::{CaptureController, PipelineEvent, SetupResult};
pub use router::PipRole;
