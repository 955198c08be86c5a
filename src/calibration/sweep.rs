// SweepSampler - stepped traversal with burst sampling
//
// The joint is commanded through `2 * half_steps + 1` evenly spaced positions
// across the measured range. After each move the sampler sleeps a fixed
// settle delay, waits until the sensor buffer holds the newest published
// potentiometer vector, then takes a burst of paired (potentiometer, encoder)
// readings and reduces it to one averaged pair.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::calibration::{motion_failure, SweepProgress};
use crate::config::{SweepConfig, DEFAULT_SENSOR_WAIT_MS};
use crate::error::CalibrationError;
use crate::motion::MotionWorker;
use crate::sensor::SensorBuffer;

/// Index-aligned potentiometer and encoder averages, one pair per sweep step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSeries {
    potentiometer: Vec<f64>,
    encoder: Vec<f64>,
}

impl CalibrationSeries {
    /// Build a series from two parallel sequences
    ///
    /// # Errors
    /// `SeriesLengthMismatch` if the sequences differ in length.
    pub fn new(potentiometer: Vec<f64>, encoder: Vec<f64>) -> Result<Self, CalibrationError> {
        if potentiometer.len() != encoder.len() {
            return Err(CalibrationError::SeriesLengthMismatch {
                x_len: potentiometer.len(),
                y_len: encoder.len(),
            });
        }
        Ok(Self {
            potentiometer,
            encoder,
        })
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            potentiometer: Vec::with_capacity(capacity),
            encoder: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, pot: f64, enc: f64) {
        self.potentiometer.push(pot);
        self.encoder.push(enc);
    }

    pub fn potentiometer(&self) -> &[f64] {
        &self.potentiometer
    }

    pub fn encoder(&self) -> &[f64] {
        &self.encoder
    }

    pub fn len(&self) -> usize {
        self.potentiometer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.potentiometer.is_empty()
    }

    /// Same points with the two axes exchanged
    pub fn swapped(&self) -> Self {
        Self {
            potentiometer: self.encoder.clone(),
            encoder: self.potentiometer.clone(),
        }
    }
}

/// Fixed-size run of paired readings taken at one sweep step
#[derive(Debug, Clone, Default)]
pub struct SampleBurst {
    pot: Vec<f64>,
    enc: Vec<f64>,
}

impl SampleBurst {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pot: Vec::with_capacity(capacity),
            enc: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, pot: f64, enc: f64) {
        self.pot.push(pot);
        self.enc.push(enc);
    }

    pub fn len(&self) -> usize {
        self.pot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pot.is_empty()
    }

    /// Arithmetic means of the potentiometer and encoder readings
    ///
    /// # Returns
    /// `None` for an empty burst.
    pub fn mean(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;
        Some((
            self.pot.iter().sum::<f64>() / n,
            self.enc.iter().sum::<f64>() / n,
        ))
    }
}

/// Commanded position for normalized step `step`
///
/// Evaluated as `(range / (2 * half_steps)) * step`, so with the default 50
/// half steps this is `range / 100 * step` and step 0 is exactly 0.0.
pub fn step_position(range_of_motion: f64, half_steps: u32, step: i32) -> f64 {
    (range_of_motion / (2.0 * f64::from(half_steps))) * f64::from(step)
}

/// Drives the joint through the sweep and collects the series
pub struct SweepSampler<'a> {
    motion: &'a MotionWorker,
    sensors: &'a SensorBuffer,
    config: SweepConfig,
    sensor_wait: Duration,
    progress_tx: Option<broadcast::Sender<SweepProgress>>,
}

impl<'a> SweepSampler<'a> {
    pub fn new(motion: &'a MotionWorker, sensors: &'a SensorBuffer, config: SweepConfig) -> Self {
        Self {
            motion,
            sensors,
            config,
            sensor_wait: Duration::from_millis(DEFAULT_SENSOR_WAIT_MS),
            progress_tx: None,
        }
    }

    /// Bound on the wait for a fresh potentiometer vector after each move
    pub fn with_sensor_wait(mut self, wait: Duration) -> Self {
        self.sensor_wait = wait;
        self
    }

    /// Publish a [`SweepProgress`] after every step
    pub fn with_progress(mut self, tx: broadcast::Sender<SweepProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Run the full sweep
    ///
    /// # Arguments
    /// * `joint` - Joint under test
    /// * `range_of_motion` - Total span to traverse (radians)
    ///
    /// # Returns
    /// * `Ok(CalibrationSeries)` - One averaged pair per step
    /// * `Err(CalibrationError)` - The sweep was aborted; the joint stays at
    ///   its last commanded position
    ///
    /// # Errors
    /// - `InvalidJoint` before any motion if `joint` is not on the arm
    /// - `InvalidConfig` before any motion if the sweep geometry is rejected
    /// - `MotionTimeout` (with the partial series) if a request times out
    /// - `SensorUnavailable` if a potentiometer reading is missing or the
    ///   vector published by a move does not arrive in time
    pub fn run(
        &self,
        joint: usize,
        range_of_motion: f64,
    ) -> Result<CalibrationSeries, CalibrationError> {
        let joint_count = self.motion.joint_count();
        if joint >= joint_count {
            return Err(CalibrationError::invalid_joint(joint, joint_count));
        }
        self.config.validate()?;

        let half = i32::try_from(self.config.half_steps).map_err(|_| {
            CalibrationError::InvalidConfig {
                reason: format!("half_steps {} does not fit a step index", self.config.half_steps),
            }
        })?;
        let total_steps = self.config.total_steps();
        let mut series = CalibrationSeries::with_capacity(total_steps);

        tracing::info!(
            joint,
            range_of_motion,
            total_steps,
            "[SweepSampler] Starting sweep"
        );

        for step in -half..=half {
            let commanded = step_position(range_of_motion, self.config.half_steps, step);

            self.motion
                .move_to(&[commanded], &[joint])
                .map_err(|err| motion_failure(err, Some(step), &series))?;

            thread::sleep(self.config.settle_delay());
            self.sensors.wait_until_current(self.sensor_wait)?;

            let burst = self.collect_burst(joint, step, &series)?;
            let (pot_mean, enc_mean) =
                burst
                    .mean()
                    .ok_or(CalibrationError::InsufficientSamples {
                        required: 1,
                        collected: 0,
                    })?;
            series.push(pot_mean, enc_mean);

            tracing::debug!(
                step,
                commanded,
                pot_mean,
                enc_mean,
                "[SweepSampler] Step complete"
            );

            if let Some(tx) = &self.progress_tx {
                let _ = tx.send(SweepProgress {
                    step,
                    completed: series.len(),
                    total_steps,
                    commanded,
                    pot_mean,
                    enc_mean,
                });
            }
        }

        tracing::info!(points = series.len(), "[SweepSampler] Sweep complete");
        Ok(series)
    }

    fn collect_burst(
        &self,
        joint: usize,
        step: i32,
        series: &CalibrationSeries,
    ) -> Result<SampleBurst, CalibrationError> {
        let mut burst = SampleBurst::with_capacity(self.config.burst_len);
        for _ in 0..self.config.burst_len {
            let pot = self.sensors.reading(joint)?;
            let enc = self
                .motion
                .current_position(joint)
                .map_err(|err| motion_failure(err, Some(step), series))?;
            burst.push(pot, enc);
            thread::sleep(self.config.burst_interval());
        }
        Ok(burst)
    }
}
