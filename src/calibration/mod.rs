// Calibration module - potentiometer-versus-encoder calibration workflow
//
// This module provides the pieces of one calibration run:
// 1. RangeCalibrator: captures the joint's two physical extremes
// 2. SweepSampler: steps the joint across the range and samples both sensors
// 3. CalibrationProcedure: the phase-checked workflow tying them together
//
// The calibration workflow:
// 1. Home the arm and select the joint under test
// 2. Capture the first and second extremes on operator signal
// 3. Home again, sweep 101 steps and hand the series to the regression engine

pub mod operator;
pub mod phase;
pub mod procedure;
pub mod range;
pub mod sweep;

pub use operator::{AutoOperator, Extreme, OperatorSignal, SimulatedOperator, StdinOperator};
pub use phase::{CalibrationPhase, SweepProgress};
pub use procedure::{CalibrationProcedure, CalibrationRun};
pub use range::{range_of_motion, RangeCalibrator, RangeExtremes};
pub use sweep::{step_position, CalibrationSeries, SampleBurst, SweepSampler};

use crate::error::CalibrationError;
use crate::motion::MotionCallError;

/// Map a worker failure onto the calibration error space
///
/// Timeouts carry the step (if inside the sweep) and whatever points were
/// collected before the arm stopped answering.
pub(crate) fn motion_failure(
    err: MotionCallError,
    step: Option<i32>,
    partial: &CalibrationSeries,
) -> CalibrationError {
    match err {
        MotionCallError::TimedOut { timeout } => CalibrationError::MotionTimeout {
            step,
            timeout_ms: timeout.as_millis() as u64,
            partial: partial.clone(),
        },
        MotionCallError::Failed(source) => CalibrationError::Motion { source },
    }
}
