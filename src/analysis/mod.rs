// Analysis module - linear regression of encoder on potentiometer readings
//
// The sweep produces one averaged (potentiometer, encoder) pair per step.
// RegressionEngine centres both series and derives the Pearson correlation,
// the two standard deviations and the regression slope. Raw, centred and
// squared values are kept as separate immutable series.
//
// Two standard deviation formulas are supported:
// - Literal: sqrt((Σa)² / (L-1)), the square of the *sum* of deviations.
//   Mathematically ~0 for any centred series; kept as the default for parity
//   with existing calibration records.
// - Sample: sqrt(Σa² / (L-1)), the conventional sample deviation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationSeries;
use crate::error::CalibrationError;

/// Minimum number of points for a deviation with `L - 1` in the denominator
pub const MIN_POINTS: usize = 2;

/// Standard deviation formula applied to the centred series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationFormula {
    /// `sqrt((Σa)² / (L-1))`
    #[default]
    Literal,
    /// `sqrt(Σa² / (L-1))`
    Sample,
}

impl DeviationFormula {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviationFormula::Literal => "literal",
            DeviationFormula::Sample => "sample",
        }
    }

    /// Apply the formula to a series of deviations from the mean
    pub fn deviation(&self, deviations: &[f64]) -> f64 {
        let denominator = (deviations.len() as f64) - 1.0;
        match self {
            DeviationFormula::Literal => {
                let sum: f64 = deviations.iter().sum();
                (sum * sum / denominator).sqrt()
            }
            DeviationFormula::Sample => {
                let sum_sq: f64 = deviations.iter().map(|d| d * d).sum();
                (sum_sq / denominator).sqrt()
            }
        }
    }
}

impl fmt::Display for DeviationFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviationFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "literal" => Ok(DeviationFormula::Literal),
            "sample" => Ok(DeviationFormula::Sample),
            other => Err(format!(
                "unknown deviation formula '{}' (expected 'literal' or 'sample')",
                other
            )),
        }
    }
}

/// Arithmetic mean, summed in index order
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Deviations of a raw series from its mean
#[derive(Debug, Clone)]
struct CenteredSeries {
    deviations: Vec<f64>,
}

impl CenteredSeries {
    fn new(raw: &[f64]) -> Self {
        let mean = mean(raw);
        Self {
            deviations: raw.iter().map(|value| value - mean).collect(),
        }
    }

    fn squared(&self) -> Vec<f64> {
        self.deviations.iter().map(|d| d * d).collect()
    }

    fn cross(&self, other: &CenteredSeries) -> Vec<f64> {
        self.deviations
            .iter()
            .zip(&other.deviations)
            .map(|(a, b)| a * b)
            .collect()
    }
}

/// Statistics for one calibration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Pearson correlation in `[-1, 1]`
    pub correlation: f64,
    /// Potentiometer standard deviation
    pub x_std: f64,
    /// Encoder standard deviation
    pub y_std: f64,
    /// `correlation * y_std / x_std`
    pub slope: f64,
    /// Number of points analysed
    pub points: usize,
    /// Formula used for `x_std`/`y_std`
    pub formula: DeviationFormula,
}

/// Computes [`RegressionResult`]s from calibration series
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionEngine {
    formula: DeviationFormula,
}

impl RegressionEngine {
    pub fn new(formula: DeviationFormula) -> Self {
        Self { formula }
    }

    pub fn formula(&self) -> DeviationFormula {
        self.formula
    }

    /// Regress encoder (y) on potentiometer (x)
    ///
    /// # Returns
    /// * `Ok(RegressionResult)` - All four statistics are finite
    /// * `Err(InsufficientSamples)` - Fewer than two points
    /// * `Err(DegenerateRange)` - Non-finite input, a zero-variance series, a
    ///   zero potentiometer deviation, or a non-finite slope
    pub fn analyze(&self, series: &CalibrationSeries) -> Result<RegressionResult, CalibrationError> {
        let x = series.potentiometer();
        let y = series.encoder();
        let points = series.len();

        if points < MIN_POINTS {
            return Err(CalibrationError::InsufficientSamples {
                required: MIN_POINTS,
                collected: points,
            });
        }
        if x.iter().chain(y).any(|value| !value.is_finite()) {
            return Err(degenerate("series contains non-finite readings"));
        }

        self.regress(&CenteredSeries::new(x), &CenteredSeries::new(y))
    }

    /// Statistics from already-centred potentiometer (`a`) and encoder (`b`)
    /// deviations
    fn regress(
        &self,
        a: &CenteredSeries,
        b: &CenteredSeries,
    ) -> Result<RegressionResult, CalibrationError> {
        let points = a.deviations.len();
        let sum_ab: f64 = a.cross(b).iter().sum();
        let sum_a_sq: f64 = a.squared().iter().sum();
        let sum_b_sq: f64 = b.squared().iter().sum();

        if sum_a_sq == 0.0 {
            return Err(degenerate("potentiometer series has zero variance"));
        }
        if sum_b_sq == 0.0 {
            return Err(degenerate("encoder series has zero variance"));
        }

        let correlation = sum_ab / (sum_a_sq * sum_b_sq).sqrt();
        let x_std = self.formula.deviation(&a.deviations);
        let y_std = self.formula.deviation(&b.deviations);

        if x_std == 0.0 || !x_std.is_finite() {
            return Err(degenerate(&format!(
                "potentiometer standard deviation is {} under the {} formula",
                x_std, self.formula
            )));
        }

        let slope = correlation * (y_std / x_std);
        if !slope.is_finite() {
            return Err(degenerate("regression slope is not finite"));
        }

        log::debug!(
            "[RegressionEngine] points={} correlation={:.6} slope={:.6} formula={}",
            points,
            correlation,
            slope,
            self.formula
        );

        Ok(RegressionResult {
            correlation,
            x_std,
            y_std,
            slope,
            points,
            formula: self.formula,
        })
    }
}

fn degenerate(reason: &str) -> CalibrationError {
    CalibrationError::DegenerateRange {
        reason: reason.to_string(),
    }
}
