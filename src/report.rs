//! Calibration report rendering
//!
//! Text output prints one `label: value` line per statistic with 16 decimal
//! places. JSON output carries the same values plus the run metadata.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::analysis::DeviationFormula;
use crate::calibration::{CalibrationRun, CalibrationSeries, RangeExtremes};

/// Labels for the text report, in print order
pub const RANGE_OF_MOTION_LABEL: &str = "range of motion";
pub const CORRELATION_LABEL: &str = "correlation";
pub const X_STD_LABEL: &str = "x standard deviation";
pub const Y_STD_LABEL: &str = "y standard deviation";
pub const SLOPE_LABEL: &str = "regression slope";

/// Final statistics of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub joint: usize,
    pub extremes: RangeExtremes,
    pub range_of_motion: f64,
    pub points: usize,
    pub deviation_formula: DeviationFormula,
    pub correlation: f64,
    pub x_std: f64,
    pub y_std: f64,
    pub slope: f64,
}

impl CalibrationReport {
    pub fn from_run(run: &CalibrationRun) -> Self {
        Self {
            joint: run.joint,
            extremes: run.extremes,
            range_of_motion: run.range_of_motion,
            points: run.result.points,
            deviation_formula: run.result.formula,
            correlation: run.result.correlation,
            x_std: run.result.x_std,
            y_std: run.result.y_std,
            slope: run.result.slope,
        }
    }

    /// `(label, value)` pairs in print order
    pub fn lines(&self) -> [(&'static str, f64); 5] {
        [
            (RANGE_OF_MOTION_LABEL, self.range_of_motion),
            (CORRELATION_LABEL, self.correlation),
            (X_STD_LABEL, self.x_std),
            (Y_STD_LABEL, self.y_std),
            (SLOPE_LABEL, self.slope),
        ]
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (label, value) in self.lines() {
            let _ = writeln!(out, "{}: {:.16}", label, value);
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Points collected before a sweep was aborted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSweepReport {
    pub joint: Option<usize>,
    /// Step being executed when the sweep stopped
    pub aborted_at_step: Option<i32>,
    pub points: usize,
    pub potentiometer: Vec<f64>,
    pub encoder: Vec<f64>,
}

impl PartialSweepReport {
    pub fn new(joint: Option<usize>, step: Option<i32>, partial: &CalibrationSeries) -> Self {
        Self {
            joint,
            aborted_at_step: step,
            points: partial.len(),
            potentiometer: partial.potentiometer().to_vec(),
            encoder: partial.encoder().to_vec(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = match self.aborted_at_step {
            Some(step) => writeln!(
                out,
                "sweep aborted at step {}: {} points collected",
                step, self.points
            ),
            None => writeln!(out, "sweep aborted: {} points collected", self.points),
        };
        for (pot, enc) in self.potentiometer.iter().zip(&self.encoder) {
            let _ = writeln!(out, "{:.16} {:.16}", pot, enc);
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
