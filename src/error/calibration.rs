// Calibration error types and constants

use crate::calibration::{CalibrationPhase, CalibrationSeries};
use crate::error::{ErrorCode, MotionError};
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// These constants provide a single source of truth for error codes
/// shared between the library and the CLI exit-status mapping.
///
/// Error code range: 2001-2010
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Joint index outside the arm's joint count
    pub const INVALID_JOINT: i32 = 2001;

    /// Zero range of motion or a zero-variance series
    pub const DEGENERATE_RANGE: i32 = 2002;

    /// No potentiometer data available for sampling
    pub const SENSOR_UNAVAILABLE: i32 = 2003;

    /// Motion interface did not answer within the step timeout
    pub const MOTION_TIMEOUT: i32 = 2004;

    /// Motion interface reported an error
    pub const MOTION: i32 = 2005;

    /// Not enough points to compute statistics
    pub const INSUFFICIENT_SAMPLES: i32 = 2006;

    /// Potentiometer and encoder series differ in length
    pub const SERIES_LENGTH_MISMATCH: i32 = 2007;

    /// Operator input ended before the procedure finished
    pub const OPERATOR_ABORTED: i32 = 2008;

    /// Procedure step requested out of order
    pub const INVALID_TRANSITION: i32 = 2009;

    /// Sweep parameters outside their supported range
    pub const INVALID_CONFIG: i32 = 2010;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationProcedure, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover joint selection, range capture, the sweep and the
/// regression analysis.
///
/// Error code ranges: 2001-2010
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Joint index is not on the arm (negative operator input included)
    InvalidJoint { joint: i64, joint_count: usize },

    /// Range of motion is zero or a centered series has no variance
    DegenerateRange { reason: String },

    /// No usable potentiometer reading
    SensorUnavailable { reason: String },

    /// A motion request did not complete in time; sweep aborted
    MotionTimeout {
        step: Option<i32>,
        timeout_ms: u64,
        partial: CalibrationSeries,
    },

    /// Motion interface failure
    Motion { source: MotionError },

    /// Not enough points to compute statistics
    InsufficientSamples { required: usize, collected: usize },

    /// Series lengths differ
    SeriesLengthMismatch { x_len: usize, y_len: usize },

    /// Operator input closed or was unusable
    OperatorAborted { reason: String },

    /// Step requested out of order
    InvalidTransition {
        current: CalibrationPhase,
        attempted: CalibrationPhase,
    },

    /// Sweep configuration rejected before any motion
    InvalidConfig { reason: String },
}

impl CalibrationError {
    /// `InvalidJoint` for an unsigned joint index
    pub fn invalid_joint(joint: usize, joint_count: usize) -> Self {
        CalibrationError::InvalidJoint {
            joint: i64::try_from(joint).unwrap_or(i64::MAX),
            joint_count,
        }
    }
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InvalidJoint { .. } => CalibrationErrorCodes::INVALID_JOINT,
            CalibrationError::DegenerateRange { .. } => CalibrationErrorCodes::DEGENERATE_RANGE,
            CalibrationError::SensorUnavailable { .. } => {
                CalibrationErrorCodes::SENSOR_UNAVAILABLE
            }
            CalibrationError::MotionTimeout { .. } => CalibrationErrorCodes::MOTION_TIMEOUT,
            CalibrationError::Motion { .. } => CalibrationErrorCodes::MOTION,
            CalibrationError::InsufficientSamples { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_SAMPLES
            }
            CalibrationError::SeriesLengthMismatch { .. } => {
                CalibrationErrorCodes::SERIES_LENGTH_MISMATCH
            }
            CalibrationError::OperatorAborted { .. } => CalibrationErrorCodes::OPERATOR_ABORTED,
            CalibrationError::InvalidTransition { .. } => {
                CalibrationErrorCodes::INVALID_TRANSITION
            }
            CalibrationError::InvalidConfig { .. } => CalibrationErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InvalidJoint { joint, joint_count } => {
                format!(
                    "Invalid joint {}: must be in range [0, {})",
                    joint, joint_count
                )
            }
            CalibrationError::DegenerateRange { reason } => {
                format!("Degenerate range: {}", reason)
            }
            CalibrationError::SensorUnavailable { reason } => {
                format!("Potentiometer data unavailable: {}", reason)
            }
            CalibrationError::MotionTimeout {
                step,
                timeout_ms,
                partial,
            } => match step {
                Some(step) => format!(
                    "Motion timed out after {} ms at step {} ({} points collected)",
                    timeout_ms,
                    step,
                    partial.len()
                ),
                None => format!("Motion timed out after {} ms", timeout_ms),
            },
            CalibrationError::Motion { source } => source.message(),
            CalibrationError::InsufficientSamples {
                required,
                collected,
            } => {
                format!("Insufficient samples: need {}, got {}", required, collected)
            }
            CalibrationError::SeriesLengthMismatch { x_len, y_len } => {
                format!(
                    "Series length mismatch: potentiometer={}, encoder={}",
                    x_len, y_len
                )
            }
            CalibrationError::OperatorAborted { reason } => {
                format!("Operator aborted: {}", reason)
            }
            CalibrationError::InvalidTransition { current, attempted } => {
                format!(
                    "Cannot enter {} while in {}",
                    attempted.display_name(),
                    current.display_name()
                )
            }
            CalibrationError::InvalidConfig { reason } => {
                format!("Invalid configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalibrationError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalibrationError::Motion { source } => Some(source),
            _ => None,
        }
    }
}

impl From<MotionError> for CalibrationError {
    fn from(source: MotionError) -> Self {
        CalibrationError::Motion { source }
    }
}
