// CalibrationProcedure - phase-checked potentiometer calibration workflow
//
// This module drives one calibration run as a state machine:
// 1. Wait for the operator to pick a joint, then home the arm
// 2. Capture the first and second extremes on operator signal
// 3. Home again, wait for potentiometer data and sweep the joint, reading a
//    fresh potentiometer vector after every move
// 4. Regress encoder on potentiometer and report
//
// Each step checks the current phase and fails with InvalidTransition when
// called out of order. A failed step leaves the phase unchanged and the arm
// at its last commanded position. Configuration errors (joint index, sweep
// geometry) are raised before the first motion command.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::analysis::{RegressionEngine, RegressionResult};
use crate::calibration::{
    motion_failure, CalibrationPhase, CalibrationSeries, Extreme, OperatorSignal,
    RangeCalibrator, RangeExtremes, SweepProgress, SweepSampler,
};
use crate::config::AppConfig;
use crate::error::{log_calibration_error, CalibrationError};
use crate::motion::{MotionInterface, MotionWorker};
use crate::sensor::SensorBuffer;

/// Everything produced by a completed calibration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRun {
    pub joint: usize,
    pub extremes: RangeExtremes,
    pub range_of_motion: f64,
    pub series: CalibrationSeries,
    pub result: RegressionResult,
}

/// CalibrationProcedure owns the motion worker and walks the phases
pub struct CalibrationProcedure {
    config: AppConfig,
    motion: MotionWorker,
    sensors: Arc<SensorBuffer>,
    phase: CalibrationPhase,
    joint: Option<usize>,
    first_extreme: Option<f64>,
    extremes: Option<RangeExtremes>,
    series: Option<CalibrationSeries>,
    progress_tx: Option<broadcast::Sender<SweepProgress>>,
}

impl CalibrationProcedure {
    /// Create a procedure for `arm`
    ///
    /// # Arguments
    /// * `config` - Arm, sweep and analysis settings
    /// * `arm` - Motion backend; wrapped in a worker bounded by
    ///   `config.sweep.motion_timeout_ms`
    /// * `sensors` - Latest-value potentiometer buffer fed by the subscription
    pub fn new(
        config: AppConfig,
        arm: Arc<dyn MotionInterface>,
        sensors: Arc<SensorBuffer>,
    ) -> Self {
        let motion = MotionWorker::spawn(arm, config.sweep.motion_timeout());
        Self {
            config,
            motion,
            sensors,
            phase: CalibrationPhase::AwaitJointSelection,
            joint: None,
            first_extreme: None,
            extremes: None,
            series: None,
            progress_tx: None,
        }
    }

    /// Publish sweep progress on `tx`
    pub fn with_progress(mut self, tx: broadcast::Sender<SweepProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn joint(&self) -> Option<usize> {
        self.joint
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Command every joint to the configured home pose
    pub fn home(&self) -> Result<(), CalibrationError> {
        let home = &self.config.arm.home_position;
        let joints: Vec<usize> = (0..home.len()).collect();
        log::info!("[CalibrationProcedure] Homing arm to {:?}", home);
        self.motion
            .move_to(home, &joints)
            .map_err(|err| motion_failure(err, None, &CalibrationSeries::default()))
    }

    /// Ask the operator for the joint under test
    ///
    /// # Errors
    /// `InvalidJoint` if the index is not on the arm; nothing has moved.
    pub fn select_joint(
        &mut self,
        operator: &mut dyn OperatorSignal,
    ) -> Result<usize, CalibrationError> {
        self.require(CalibrationPhase::AwaitJointSelection)?;
        let joint_count = self.motion.joint_count();
        let joint = operator.select_joint(joint_count)?;
        if joint >= joint_count {
            return Err(CalibrationError::invalid_joint(joint, joint_count));
        }
        log::info!("[CalibrationProcedure] Testing joint {}", joint);
        self.joint = Some(joint);
        self.advance();
        Ok(joint)
    }

    pub fn capture_first_extreme(
        &mut self,
        operator: &mut dyn OperatorSignal,
    ) -> Result<f64, CalibrationError> {
        self.require(CalibrationPhase::AwaitFirstExtreme)?;
        let position = self.calibrator()?.capture_extreme(operator, Extreme::First)?;
        self.first_extreme = Some(position);
        self.advance();
        Ok(position)
    }

    pub fn capture_second_extreme(
        &mut self,
        operator: &mut dyn OperatorSignal,
    ) -> Result<RangeExtremes, CalibrationError> {
        self.require(CalibrationPhase::AwaitSecondExtreme)?;
        let first = self.first_extreme.ok_or(CalibrationError::InvalidTransition {
            current: self.phase,
            attempted: CalibrationPhase::AwaitSecondExtreme,
        })?;
        let second = self.calibrator()?.capture_extreme(operator, Extreme::Second)?;
        let extremes = RangeExtremes::new(first, second);
        log::info!(
            "[CalibrationProcedure] Range of motion {:.6} rad",
            extremes.range_of_motion()
        );
        self.extremes = Some(extremes);
        self.advance();
        Ok(extremes)
    }

    /// Home, then sweep the joint across the captured range
    ///
    /// # Errors
    /// - `DegenerateRange` before any motion if the extremes are unusable
    /// - `InvalidConfig` before any motion if the sweep geometry is rejected
    /// - `SensorUnavailable` if no potentiometer vector arrives in time
    /// - `MotionTimeout` with the partial series if the arm stops answering
    pub fn sweep(&mut self) -> Result<&CalibrationSeries, CalibrationError> {
        self.require(CalibrationPhase::Sweeping)?;
        let (joint, extremes) = match (self.joint, self.extremes) {
            (Some(joint), Some(extremes)) => (joint, extremes),
            _ => {
                return Err(CalibrationError::InvalidTransition {
                    current: self.phase,
                    attempted: CalibrationPhase::Sweeping,
                })
            }
        };
        let range = extremes.validated_range()?;
        self.config.sweep.validate()?;

        self.home()?;
        self.sensors.wait_for_first(self.config.arm.sensor_wait())?;

        let mut sampler = SweepSampler::new(&self.motion, &self.sensors, self.config.sweep.clone())
            .with_sensor_wait(self.config.arm.sensor_wait());
        if let Some(tx) = &self.progress_tx {
            sampler = sampler.with_progress(tx.clone());
        }
        let series = sampler.run(joint, range)?;

        self.advance();
        Ok(self.series.insert(series))
    }

    /// Run the regression on the collected series
    pub fn analyze(&mut self) -> Result<CalibrationRun, CalibrationError> {
        self.require(CalibrationPhase::Reporting)?;
        let (joint, extremes, series) = match (self.joint, self.extremes, &self.series) {
            (Some(joint), Some(extremes), Some(series)) => (joint, extremes, series),
            _ => {
                return Err(CalibrationError::InvalidTransition {
                    current: self.phase,
                    attempted: CalibrationPhase::Reporting,
                })
            }
        };

        let engine = RegressionEngine::new(self.config.analysis.deviation_formula);
        let result = engine.analyze(series)?;
        let run = CalibrationRun {
            joint,
            extremes,
            range_of_motion: extremes.range_of_motion(),
            series: series.clone(),
            result,
        };
        self.advance();
        Ok(run)
    }

    /// Walk every phase with `operator`
    pub fn run(
        &mut self,
        operator: &mut dyn OperatorSignal,
    ) -> Result<CalibrationRun, CalibrationError> {
        let outcome = self.run_phases(operator);
        if let Err(err) = &outcome {
            log_calibration_error(err, self.phase.display_name());
        }
        outcome
    }

    fn run_phases(
        &mut self,
        operator: &mut dyn OperatorSignal,
    ) -> Result<CalibrationRun, CalibrationError> {
        self.require(CalibrationPhase::AwaitJointSelection)?;
        self.config.sweep.validate()?;
        self.select_joint(operator)?;
        self.home()?;
        self.capture_first_extreme(operator)?;
        self.capture_second_extreme(operator)?;
        self.sweep()?;
        self.analyze()
    }

    /// Discard all captured state and return to joint selection
    pub fn reset(&mut self) {
        self.phase = CalibrationPhase::AwaitJointSelection;
        self.joint = None;
        self.first_extreme = None;
        self.extremes = None;
        self.series = None;
    }

    fn calibrator(&self) -> Result<RangeCalibrator<'_>, CalibrationError> {
        let joint = self.joint.ok_or(CalibrationError::InvalidTransition {
            current: self.phase,
            attempted: CalibrationPhase::AwaitFirstExtreme,
        })?;
        Ok(RangeCalibrator::new(&self.motion, joint))
    }

    fn require(&self, phase: CalibrationPhase) -> Result<(), CalibrationError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(CalibrationError::InvalidTransition {
                current: self.phase,
                attempted: phase,
            })
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.phase.next() {
            log::debug!(
                "[CalibrationProcedure] {} -> {}",
                self.phase.display_name(),
                next.display_name()
            );
            self.phase = next;
            if next.awaits_operator() {
                log::info!("[CalibrationProcedure] Waiting for operator: {}", next.display_name());
            }
        }
    }
}
