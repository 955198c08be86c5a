// Phase and progress tracking for the calibration workflow
//
// The procedure is an explicit state machine. Each phase is left only by an
// operator signal or by the completion of the work it represents.

use serde::{Deserialize, Serialize};

/// Calibration phase, in workflow order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationPhase {
    /// Waiting for the operator to pick the joint under test
    AwaitJointSelection,
    /// Waiting for the joint to be held at its first physical extreme
    AwaitFirstExtreme,
    /// Waiting for the joint to be held at its second physical extreme
    AwaitSecondExtreme,
    /// Stepping the joint across the measured range
    Sweeping,
    /// Computing and emitting the statistics
    Reporting,
    /// Procedure finished
    Complete,
}

impl CalibrationPhase {
    /// Get the next phase in the workflow
    ///
    /// # Returns
    /// * `Some(CalibrationPhase)` - Next phase
    /// * `None` - Workflow complete
    pub fn next(&self) -> Option<CalibrationPhase> {
        match self {
            CalibrationPhase::AwaitJointSelection => Some(CalibrationPhase::AwaitFirstExtreme),
            CalibrationPhase::AwaitFirstExtreme => Some(CalibrationPhase::AwaitSecondExtreme),
            CalibrationPhase::AwaitSecondExtreme => Some(CalibrationPhase::Sweeping),
            CalibrationPhase::Sweeping => Some(CalibrationPhase::Reporting),
            CalibrationPhase::Reporting => Some(CalibrationPhase::Complete),
            CalibrationPhase::Complete => None,
        }
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            CalibrationPhase::AwaitJointSelection => "JOINT SELECTION",
            CalibrationPhase::AwaitFirstExtreme => "FIRST EXTREME",
            CalibrationPhase::AwaitSecondExtreme => "SECOND EXTREME",
            CalibrationPhase::Sweeping => "SWEEPING",
            CalibrationPhase::Reporting => "REPORTING",
            CalibrationPhase::Complete => "COMPLETE",
        }
    }

    /// Whether this phase waits on the operator
    pub fn awaits_operator(&self) -> bool {
        matches!(
            self,
            CalibrationPhase::AwaitJointSelection
                | CalibrationPhase::AwaitFirstExtreme
                | CalibrationPhase::AwaitSecondExtreme
        )
    }
}

/// Progress information for one completed sweep step
///
/// Published on the procedure's progress broadcast channel after each
/// burst is reduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepProgress {
    /// Normalized step index (e.g. -50..=50)
    pub step: i32,
    /// Steps completed so far, including this one
    pub completed: usize,
    /// Total steps in the sweep
    pub total_steps: usize,
    /// Commanded joint position (radians)
    pub commanded: f64,
    /// Burst-averaged potentiometer reading
    pub pot_mean: f64,
    /// Burst-averaged encoder reading
    pub enc_mean: f64,
}

impl SweepProgress {
    pub fn is_last(&self) -> bool {
        self.completed >= self.total_steps
    }

    /// Completion as a fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.total_steps == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total_steps as f64
    }
}
