//! Configuration management for the calibration procedure
//!
//! This module provides runtime configuration loading from JSON files so the
//! sweep timing, arm layout and analysis options can be adjusted without
//! recompilation. Every field defaults to the behavior of the manual
//! bench procedure (101 steps, 10-sample bursts, 200 ms / 10 ms delays).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::analysis::DeviationFormula;
use crate::error::CalibrationError;

/// Number of joints on the arm under test
pub const DEFAULT_JOINT_COUNT: usize = 7;
/// Steps on each side of zero; the sweep visits `2 * half_steps + 1` positions
pub const DEFAULT_HALF_STEPS: u32 = 50;
/// Largest accepted `half_steps` (20001 sweep positions)
pub const MAX_HALF_STEPS: u32 = 10_000;
/// Paired readings per burst
pub const DEFAULT_BURST_LEN: usize = 10;
/// Largest accepted `burst_len`
pub const MAX_BURST_LEN: usize = 1_000;
/// Blocking delay after each motion command
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 200;
/// Spacing between readings inside a burst
pub const DEFAULT_BURST_INTERVAL_MS: u64 = 10;
/// Upper bound on any single motion request
pub const DEFAULT_MOTION_TIMEOUT_MS: u64 = 5_000;
/// How long to wait for the first potentiometer publish
pub const DEFAULT_SENSOR_WAIT_MS: u64 = 1_000;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub arm: ArmConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Arm layout and startup behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// Number of joints reported by the motion interface
    pub joint_count: usize,
    /// Pose commanded before joint selection and before the sweep
    pub home_position: Vec<f64>,
    /// Wait for the first potentiometer vector (milliseconds)
    pub sensor_wait_ms: u64,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            joint_count: DEFAULT_JOINT_COUNT,
            home_position: vec![0.0, 0.0, 0.1, 0.0, 0.0, 0.0, 0.0],
            sensor_wait_ms: DEFAULT_SENSOR_WAIT_MS,
        }
    }
}

impl ArmConfig {
    pub fn sensor_wait(&self) -> Duration {
        Duration::from_millis(self.sensor_wait_ms)
    }
}

/// Sweep sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Steps on each side of zero
    pub half_steps: u32,
    /// Readings per burst
    pub burst_len: usize,
    /// Settle delay after each move (milliseconds)
    pub settle_delay_ms: u64,
    /// Delay between burst readings (milliseconds)
    pub burst_interval_ms: u64,
    /// Timeout applied to every motion request (milliseconds)
    pub motion_timeout_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            half_steps: DEFAULT_HALF_STEPS,
            burst_len: DEFAULT_BURST_LEN,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            burst_interval_ms: DEFAULT_BURST_INTERVAL_MS,
            motion_timeout_ms: DEFAULT_MOTION_TIMEOUT_MS,
        }
    }
}

impl SweepConfig {
    /// Sweep configuration with no delays, for simulations and tests
    pub fn immediate() -> Self {
        Self {
            settle_delay_ms: 0,
            burst_interval_ms: 0,
            ..Self::default()
        }
    }

    /// Check the sweep geometry before anything moves
    ///
    /// # Errors
    /// `InvalidConfig` if `half_steps` is outside `1..=MAX_HALF_STEPS` or
    /// `burst_len` is outside `1..=MAX_BURST_LEN`.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !(1..=MAX_HALF_STEPS).contains(&self.half_steps) {
            return Err(CalibrationError::InvalidConfig {
                reason: format!(
                    "half_steps must be in 1..={}, got {}",
                    MAX_HALF_STEPS, self.half_steps
                ),
            });
        }
        if !(1..=MAX_BURST_LEN).contains(&self.burst_len) {
            return Err(CalibrationError::InvalidConfig {
                reason: format!(
                    "burst_len must be in 1..={}, got {}",
                    MAX_BURST_LEN, self.burst_len
                ),
            });
        }
        Ok(())
    }

    /// Total number of sweep positions
    pub fn total_steps(&self) -> usize {
        2 * self.half_steps as usize + 1
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn burst_interval(&self) -> Duration {
        Duration::from_millis(self.burst_interval_ms)
    }

    pub fn motion_timeout(&self) -> Duration {
        Duration::from_millis(self.motion_timeout_ms)
    }
}

/// Regression analysis options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Standard deviation definition used for the slope
    #[serde(default)]
    pub deviation_formula: DeviationFormula,
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/pot_enc_config.json")
    }
}
