// Error types for the potentiometer/encoder calibration crate
//
// This module defines custom error types for motion and calibration operations,
// providing structured error handling with stable numeric codes so the CLI can
// map each failure to a distinct exit status.

mod calibration;
mod motion;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use motion::{log_motion_error, MotionError, MotionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and the CLI.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
