// RangeCalibrator - operator-driven capture of the joint's travel limits
//
// The operator holds the joint at each physical extreme in turn. When they
// signal, the joint position is read back from the motion interface. The
// range of motion is the sum of the absolute extremes, which assumes the
// extremes straddle zero.

use serde::{Deserialize, Serialize};

use crate::calibration::{motion_failure, CalibrationSeries, Extreme, OperatorSignal};
use crate::error::CalibrationError;
use crate::motion::MotionWorker;

/// Total travel implied by two extremes: `|first| + |second|`
pub fn range_of_motion(first: f64, second: f64) -> f64 {
    first.abs() + second.abs()
}

/// The two captured joint extremes (radians), in capture order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeExtremes {
    pub first: f64,
    pub second: f64,
}

impl RangeExtremes {
    pub fn new(first: f64, second: f64) -> Self {
        Self { first, second }
    }

    pub fn range_of_motion(&self) -> f64 {
        range_of_motion(self.first, self.second)
    }

    /// Range of motion, rejecting extremes that cannot drive a sweep
    ///
    /// # Errors
    /// `DegenerateRange` if either extreme is not finite, both extremes are
    /// equal, or the range is zero.
    pub fn validated_range(&self) -> Result<f64, CalibrationError> {
        if !self.first.is_finite() || !self.second.is_finite() {
            return Err(CalibrationError::DegenerateRange {
                reason: format!(
                    "extremes must be finite (got {} and {})",
                    self.first, self.second
                ),
            });
        }
        if self.first == self.second {
            return Err(CalibrationError::DegenerateRange {
                reason: format!("both extremes read {}", self.first),
            });
        }
        let range = self.range_of_motion();
        if range <= 0.0 {
            return Err(CalibrationError::DegenerateRange {
                reason: "range of motion is zero".to_string(),
            });
        }
        Ok(range)
    }
}

/// Captures extremes for one joint
pub struct RangeCalibrator<'a> {
    motion: &'a MotionWorker,
    joint: usize,
}

impl<'a> RangeCalibrator<'a> {
    pub fn new(motion: &'a MotionWorker, joint: usize) -> Self {
        Self { motion, joint }
    }

    /// Wait for the operator, then read the joint position
    ///
    /// # Arguments
    /// * `operator` - Source of the "joint is in place" signal
    /// * `extreme` - Which extreme is being captured
    pub fn capture_extreme(
        &self,
        operator: &mut dyn OperatorSignal,
        extreme: Extreme,
    ) -> Result<f64, CalibrationError> {
        operator.await_extreme(self.joint, extreme)?;
        let position = self
            .motion
            .current_position(self.joint)
            .map_err(|err| motion_failure(err, None, &CalibrationSeries::default()))?;
        log::info!(
            "[RangeCalibrator] Joint {} {} extreme at {:.6} rad",
            self.joint,
            extreme.display_name(),
            position
        );
        Ok(position)
    }

    /// Capture both extremes in order
    pub fn capture(
        &self,
        operator: &mut dyn OperatorSignal,
    ) -> Result<RangeExtremes, CalibrationError> {
        let first = self.capture_extreme(operator, Extreme::First)?;
        let second = self.capture_extreme(operator, Extreme::Second)?;
        Ok(RangeExtremes::new(first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::AutoOperator;
    use crate::calibration::SimulatedOperator;
    use crate::motion::{PotentiometerModel, SimulatedArm};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_range_of_motion_sums_magnitudes() {
        assert_eq!(range_of_motion(3.0, -2.0), 5.0);
        assert_eq!(range_of_motion(-1.2, 1.3), 2.5);
        assert_eq!(range_of_motion(0.0, 0.0), 0.0);
        assert_eq!(RangeExtremes::new(-2.0, 3.0).range_of_motion(), 5.0);
    }

    #[test]
    fn test_validated_range_rejects_degenerate_extremes() {
        for extremes in [
            RangeExtremes::new(0.0, 0.0),
            RangeExtremes::new(0.7, 0.7),
            RangeExtremes::new(f64::NAN, 1.0),
        ] {
            assert!(matches!(
                extremes.validated_range(),
                Err(CalibrationError::DegenerateRange { .. })
            ));
        }
        assert_eq!(RangeExtremes::new(3.0, -2.0).validated_range(), Ok(5.0));
    }

    #[test]
    fn test_capture_reads_positions_at_operator_signal() {
        let arm = Arc::new(SimulatedArm::new(7, PotentiometerModel::default()));
        let worker = MotionWorker::spawn(arm.clone(), Duration::from_secs(1));
        let mut operator = SimulatedOperator::new(
            AutoOperator::new(Some(2)),
            Arc::clone(&arm),
            RangeExtremes::new(-1.2, 1.3),
        );

        let calibrator = RangeCalibrator::new(&worker, 2);
        let extremes = calibrator.capture(&mut operator).unwrap();
        assert_eq!(extremes, RangeExtremes::new(-1.2, 1.3));
        assert!((extremes.range_of_motion() - 2.5).abs() < 1e-12);
    }
}
