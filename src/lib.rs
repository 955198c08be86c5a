// Potentiometer calibration - joint potentiometer versus encoder regression
// Sweeps one arm joint across its range and regresses encoder on potentiometer

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod error;
pub mod motion;
pub mod report;
pub mod sensor;

// Re-exports for convenience
pub use analysis::{DeviationFormula, RegressionEngine, RegressionResult};
pub use calibration::{CalibrationPhase, CalibrationProcedure, CalibrationRun, CalibrationSeries};
pub use config::AppConfig;
pub use error::{CalibrationError, ErrorCode, MotionError};
