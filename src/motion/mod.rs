//! Motion-control abstractions consumed by the calibration core.
//!
//! The arm itself is an external collaborator. The calibration code only
//! needs to command absolute joint positions and read the current joint
//! vector back, so that is all [`MotionInterface`] exposes. Calls go through a
//! [`MotionWorker`] that bounds each request with a timeout.

pub mod simulated;
pub mod worker;

use crate::error::MotionError;

pub use simulated::{PotentiometerModel, SimulatedArm};
pub use worker::{MotionCallError, MotionWorker};

/// Trait implemented by arm backends.
///
/// `move_to` returns once the command is issued, not once motion completes;
/// callers compensate with a settle delay.
pub trait MotionInterface: Send + Sync {
    /// Command `joints[k]` to absolute position `positions[k]`; other joints
    /// keep their current targets.
    fn move_to(&self, positions: &[f64], joints: &[usize]) -> Result<(), MotionError>;

    /// Full current joint-position vector, indexed by joint.
    fn current_positions(&self) -> Result<Vec<f64>, MotionError>;

    /// Number of joints on the arm.
    fn joint_count(&self) -> usize;
}

/// Check a `move_to` request against an arm's joint count
pub fn validate_move(
    positions: &[f64],
    joints: &[usize],
    joint_count: usize,
) -> Result<(), MotionError> {
    if positions.len() != joints.len() {
        return Err(MotionError::LengthMismatch {
            positions: positions.len(),
            joints: joints.len(),
        });
    }
    if let Some(&joint) = joints.iter().find(|&&joint| joint >= joint_count) {
        return Err(MotionError::JointOutOfRange { joint, joint_count });
    }
    if let Some(position) = positions.iter().find(|p| !p.is_finite()) {
        return Err(MotionError::CommandRejected {
            reason: format!("non-finite target position {}", position),
        });
    }
    Ok(())
}
