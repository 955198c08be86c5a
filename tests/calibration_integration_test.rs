//! Integration tests for the calibration workflow
//!
//! These tests drive the public API the way the CLI does:
//! - Potentiometer feed subscription into the sensor buffer
//! - Simulated arm behind the motion worker
//! - Phase-by-phase procedure with a scripted operator
//! - Regression and report rendering
//!
//! Sweeps run without settle delays: the sampler waits for the vector each
//! move publishes before it reads a burst.

use std::sync::Arc;

use pot_enc_calibration::analysis::DeviationFormula;
use pot_enc_calibration::calibration::{
    AutoOperator, CalibrationPhase, CalibrationProcedure, RangeExtremes, SimulatedOperator,
    StdinOperator,
};
use pot_enc_calibration::config::{AppConfig, SweepConfig};
use pot_enc_calibration::error::{CalibrationError, CalibrationErrorCodes, ErrorCode};
use pot_enc_calibration::motion::{PotentiometerModel, SimulatedArm};
use pot_enc_calibration::report::CalibrationReport;
use pot_enc_calibration::sensor::{FeedSubscription, PotentiometerFeed, SensorBuffer};

struct Bench {
    arm: Arc<SimulatedArm>,
    procedure: CalibrationProcedure,
    _subscription: FeedSubscription,
}

fn fast_config(formula: DeviationFormula) -> AppConfig {
    let mut config = AppConfig::default();
    config.sweep = SweepConfig::immediate();
    config.analysis.deviation_formula = formula;
    config
}

fn bench(config: AppConfig, model: PotentiometerModel) -> Bench {
    let feed = PotentiometerFeed::default();
    let sensors = Arc::new(SensorBuffer::new());
    let subscription = feed.subscribe(Arc::clone(&sensors));
    let arm = Arc::new(SimulatedArm::new(config.arm.joint_count, model).with_feed(feed));
    let procedure = CalibrationProcedure::new(config, arm.clone(), sensors);
    Bench {
        arm,
        procedure,
        _subscription: subscription,
    }
}

/// Full 101-step sweep on joint 2 with a potentiometer reading half the
/// joint angle: the encoder-on-potentiometer slope is 2.
#[test]
fn test_full_sweep_recovers_gain() {
    let model = PotentiometerModel {
        gain: 0.5,
        offset: 0.02,
        noise: 0.0,
    };
    let mut bench = bench(fast_config(DeviationFormula::Sample), model);
    let mut operator = SimulatedOperator::new(
        AutoOperator::new(Some(2)),
        Arc::clone(&bench.arm),
        RangeExtremes::new(-1.2, 1.3),
    );

    let run = bench.procedure.run(&mut operator).expect("calibration run");

    assert_eq!(run.series.len(), 101);
    assert!((run.range_of_motion - 2.5).abs() < 1e-12);
    assert_eq!(run.series.encoder()[50], 0.0);
    assert!((run.series.encoder()[0] + 1.25).abs() < 1e-12);
    assert!((run.series.encoder()[100] - 1.25).abs() < 1e-12);
    assert!((run.result.correlation - 1.0).abs() < 1e-9);
    assert!((run.result.slope - 2.0).abs() < 1e-9);

    let report = CalibrationReport::from_run(&run);
    let text = report.to_text();
    assert!(text.starts_with("range of motion: 2.5000000000000000\n"));
    assert_eq!(text.lines().count(), 5);
    assert!(text.lines().last().unwrap().starts_with("regression slope: "));
    assert_eq!(bench.procedure.phase(), CalibrationPhase::Complete);
}

#[test]
fn test_noisy_potentiometer_still_correlates() {
    let model = PotentiometerModel {
        gain: 1.0,
        offset: 0.0,
        noise: 0.002,
    };
    let mut config = fast_config(DeviationFormula::Sample);
    config.sweep.half_steps = 20;
    let mut bench = bench(config, model);
    let mut operator = SimulatedOperator::new(
        AutoOperator::new(Some(5)),
        Arc::clone(&bench.arm),
        RangeExtremes::new(-1.0, 1.0),
    );

    let run = bench.procedure.run(&mut operator).expect("calibration run");
    assert_eq!(run.series.len(), 41);
    assert!(run.result.correlation > 0.999);
    assert!((run.result.slope - 1.0).abs() < 0.01);
}

#[test]
fn test_interactive_operator_over_stdin_lines() {
    let mut config = fast_config(DeviationFormula::Sample);
    config.sweep.half_steps = 5;
    let mut bench = bench(config, PotentiometerModel::default());
    let input = std::io::Cursor::new(b"4\n\n\n".to_vec());
    let mut operator = SimulatedOperator::new(
        StdinOperator::new(input, std::io::sink()),
        Arc::clone(&bench.arm),
        RangeExtremes::new(-0.6, 0.9),
    );

    let run = bench.procedure.run(&mut operator).expect("calibration run");
    assert_eq!(run.joint, 4);
    assert_eq!(run.extremes, RangeExtremes::new(-0.6, 0.9));
    assert!((run.result.slope - 1.0).abs() < 1e-9);
}

#[test]
fn test_operator_input_closed_mid_procedure() {
    let mut bench = bench(
        fast_config(DeviationFormula::Sample),
        PotentiometerModel::default(),
    );
    let input = std::io::Cursor::new(b"1\n".to_vec());
    let mut operator = StdinOperator::new(input, std::io::sink());

    let err = bench.procedure.run(&mut operator).unwrap_err();
    assert_eq!(err.code(), CalibrationErrorCodes::OPERATOR_ABORTED);
    assert_eq!(bench.procedure.phase(), CalibrationPhase::AwaitFirstExtreme);
}

/// Default formula on the default 101-step sweep. Centring leaves only a
/// rounding residue in Σa, so both deviations are tiny but non-zero and
/// their ratio still carries the gain.
#[test]
fn test_literal_formula_on_full_sweep() {
    let model = PotentiometerModel {
        gain: 0.5,
        offset: 0.0,
        noise: 0.0,
    };
    let config = AppConfig {
        sweep: SweepConfig::immediate(),
        ..AppConfig::default()
    };
    let mut bench = bench(config, model);
    let mut operator = SimulatedOperator::new(
        AutoOperator::new(Some(2)),
        Arc::clone(&bench.arm),
        RangeExtremes::new(-1.2, 1.3),
    );

    let run = bench.procedure.run(&mut operator).expect("calibration run");
    assert_eq!(run.result.formula, DeviationFormula::Literal);
    assert_eq!(run.series.len(), 101);
    assert!(run.result.x_std > 0.0 && run.result.x_std < 1e-15);
    assert!(run.result.y_std > 0.0 && run.result.y_std < 1e-15);
    assert!((run.result.slope - 2.0).abs() < 1e-9);
    assert_eq!(
        run.result.slope,
        run.result.correlation * (run.result.y_std / run.result.x_std)
    );
}

#[test]
fn test_literal_formula_exact_cancellation_is_degenerate() {
    let mut config = fast_config(DeviationFormula::Literal);
    config.sweep.half_steps = 10;
    let mut bench = bench(config, PotentiometerModel::default());
    let mut operator = SimulatedOperator::new(
        AutoOperator::new(Some(0)),
        Arc::clone(&bench.arm),
        RangeExtremes::new(-1.2, 1.3),
    );

    let err = bench.procedure.run(&mut operator).unwrap_err();
    assert!(matches!(err, CalibrationError::DegenerateRange { .. }));
    assert_eq!(err.code(), CalibrationErrorCodes::DEGENERATE_RANGE);
}

#[test]
fn test_reset_allows_second_run() {
    let mut config = fast_config(DeviationFormula::Sample);
    config.sweep.half_steps = 3;
    let mut bench = bench(config, PotentiometerModel::default());

    let mut first = SimulatedOperator::new(
        AutoOperator::new(Some(1)),
        Arc::clone(&bench.arm),
        RangeExtremes::new(-0.5, 0.5),
    );
    bench.procedure.run(&mut first).expect("first run");

    bench.procedure.reset();
    let mut second = SimulatedOperator::new(
        AutoOperator::new(Some(3)),
        Arc::clone(&bench.arm),
        RangeExtremes::new(-0.25, 0.75),
    );
    let run = bench.procedure.run(&mut second).expect("second run");
    assert_eq!(run.joint, 3);
    assert_eq!(run.series.len(), 7);
}
