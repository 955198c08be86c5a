// Motion interface error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Motion error code constants
///
/// Error code range: 1001-1006
pub struct MotionErrorCodes {}

impl MotionErrorCodes {
    /// Joint index not present on the arm
    pub const JOINT_OUT_OF_RANGE: i32 = 1001;

    /// Positions and joint indices differ in length
    pub const LENGTH_MISMATCH: i32 = 1002;

    /// Arm refused the command
    pub const COMMAND_REJECTED: i32 = 1003;

    /// Arm connection lost mid-request
    pub const DISCONNECTED: i32 = 1004;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1005;

    /// Motion worker thread has exited
    pub const WORKER_UNAVAILABLE: i32 = 1006;
}

/// Log a motion error with structured context
///
/// This function logs motion errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_motion_error(err: &MotionError, context: &str) {
    error!(
        "Motion error in {}: code={}, component=MotionInterface, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Motion-related errors
///
/// These errors cover commands sent to the arm and joint position readback.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Joint index is not valid for this arm
    JointOutOfRange { joint: usize, joint_count: usize },

    /// `move_to` received mismatched position and joint slices
    LengthMismatch { positions: usize, joints: usize },

    /// The arm rejected a command
    CommandRejected { reason: String },

    /// The arm is no longer reachable
    Disconnected { details: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// The motion worker thread is gone
    WorkerUnavailable,
}

impl ErrorCode for MotionError {
    fn code(&self) -> i32 {
        match self {
            MotionError::JointOutOfRange { .. } => MotionErrorCodes::JOINT_OUT_OF_RANGE,
            MotionError::LengthMismatch { .. } => MotionErrorCodes::LENGTH_MISMATCH,
            MotionError::CommandRejected { .. } => MotionErrorCodes::COMMAND_REJECTED,
            MotionError::Disconnected { .. } => MotionErrorCodes::DISCONNECTED,
            MotionError::LockPoisoned { .. } => MotionErrorCodes::LOCK_POISONED,
            MotionError::WorkerUnavailable => MotionErrorCodes::WORKER_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            MotionError::JointOutOfRange { joint, joint_count } => {
                format!(
                    "Joint {} out of range (arm has {} joints)",
                    joint, joint_count
                )
            }
            MotionError::LengthMismatch { positions, joints } => {
                format!(
                    "Got {} positions for {} joint indices",
                    positions, joints
                )
            }
            MotionError::CommandRejected { reason } => {
                format!("Motion command rejected: {}", reason)
            }
            MotionError::Disconnected { details } => format!("Arm disconnected: {}", details),
            MotionError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            MotionError::WorkerUnavailable => "Motion worker is no longer running".to_string(),
        }
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MotionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for MotionError {}
