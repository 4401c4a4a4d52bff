//! Session cost governor
//!
//! Watches the capture session's two normalized capacity metrics and
//! steps the topology down - secondary resolution first, frame rates
//! last - until both metrics fit the budget or nothing is left to
//! reduce. Runs on the configuration context, never on the frame path.

use crate::capture::device::{CaptureSession, PressureLevel};
use crate::capture::topology::{CameraSlot, CaptureTopology};

/// Pressure-throttle frame-rate bounds, in fps.
const THROTTLED_MIN_FPS: u32 = 15;
const THROTTLED_MAX_FPS: u32 = 20;

/// Which cost budgets the session currently exceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExceededCosts {
    pub system_pressure: bool,
    pub hardware: bool,
}

impl ExceededCosts {
    /// Read both metrics off the session; > 1.0 exceeds the budget.
    pub fn read(session: &dyn CaptureSession) -> Self {
        Self {
            system_pressure: session.system_pressure_cost() > 1.0,
            hardware: session.hardware_cost() > 1.0,
        }
    }

    pub fn any(self) -> bool {
        self.system_pressure || self.hardware
    }
}

/// One quality reduction the governor may try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionStep {
    SecondaryResolution,
    InputPorts,
    PrimaryResolution,
    SecondaryFrameRate,
    PrimaryFrameRate,
}

/// Ladder for system-pressure overruns: the dual-to-single lens rewire
/// is worth trying before touching the primary stream.
const PRESSURE_ONLY_LADDER: &[ReductionStep] = &[
    ReductionStep::SecondaryResolution,
    ReductionStep::InputPorts,
    ReductionStep::PrimaryResolution,
    ReductionStep::SecondaryFrameRate,
    ReductionStep::PrimaryFrameRate,
];

/// Ladder for hardware overruns (alone or combined with pressure):
/// port reduction does not lower hardware cost, so it is omitted.
const HARDWARE_LADDER: &[ReductionStep] = &[
    ReductionStep::SecondaryResolution,
    ReductionStep::PrimaryResolution,
    ReductionStep::SecondaryFrameRate,
    ReductionStep::PrimaryFrameRate,
];

/// Iteratively reduces capture quality while the session is over
/// budget.
#[derive(Debug, Default)]
pub struct SessionCostGovernor;

impl SessionCostGovernor {
    pub fn new() -> Self {
        Self
    }

    fn apply(&self, step: ReductionStep, topology: &mut CaptureTopology) -> bool {
        match step {
            ReductionStep::SecondaryResolution => {
                topology.reduce_resolution(CameraSlot::Secondary)
            }
            ReductionStep::InputPorts => topology.reduce_input_ports(),
            ReductionStep::PrimaryResolution => topology.reduce_resolution(CameraSlot::Primary),
            ReductionStep::SecondaryFrameRate => {
                topology.reduce_frame_rate(CameraSlot::Secondary)
            }
            ReductionStep::PrimaryFrameRate => topology.reduce_frame_rate(CameraSlot::Primary),
        }
    }

    /// Reduce until the metrics fit or no step succeeds.
    ///
    /// Re-reads the costs after every successful step. Returns the
    /// number of reductions applied; a session still over budget after
    /// exhausting its ladder keeps running as-is.
    pub fn check_and_reduce(
        &self,
        topology: &mut CaptureTopology,
        session: &dyn CaptureSession,
    ) -> usize {
        let mut applied = 0;
        loop {
            let costs = ExceededCosts::read(session);
            if !costs.any() {
                break;
            }

            let ladder = if costs.hardware {
                HARDWARE_LADDER
            } else {
                PRESSURE_ONLY_LADDER
            };

            let stepped = ladder.iter().any(|step| self.apply(*step, topology));
            if !stepped {
                tracing::warn!("unable to further reduce session cost");
                break;
            }
            applied += 1;
        }
        if applied > 0 {
            tracing::info!("session cost reduced in {} steps", applied);
        }
        applied
    }

    /// React to a device pressure-level change.
    ///
    /// Serious/critical pressure pins the primary camera to a fixed
    /// low frame-rate range - but never while a recording is running,
    /// so an active recording's frame rate stays visibly steady.
    pub fn throttle_for_pressure(
        &self,
        topology: &mut CaptureTopology,
        level: PressureLevel,
        recording: bool,
    ) {
        if level.is_elevated() {
            if recording {
                return;
            }
            tracing::warn!(
                "elevated system pressure level {:?}, throttling frame rate",
                level
            );
            topology.clamp_frame_rate(CameraSlot::Primary, THROTTLED_MIN_FPS, THROTTLED_MAX_FPS);
        } else if level == PressureLevel::Shutdown {
            tracing::error!("session stopped running due to system pressure level");
        }
    }
}
