use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use pot_enc_calibration::analysis::DeviationFormula;
use pot_enc_calibration::calibration::{
    AutoOperator, CalibrationProcedure, OperatorSignal, RangeExtremes, SimulatedOperator,
    StdinOperator, SweepProgress,
};
use pot_enc_calibration::config::AppConfig;
use pot_enc_calibration::error::CalibrationError;
use pot_enc_calibration::motion::{PotentiometerModel, SimulatedArm};
use pot_enc_calibration::report::{CalibrationReport, PartialSweepReport};
use pot_enc_calibration::sensor::{PotentiometerFeed, SensorBuffer};
use tokio::sync::broadcast::{self, error::RecvError};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_DEGENERATE_RANGE: u8 = 3;
const EXIT_SENSOR_UNAVAILABLE: u8 = 4;
const EXIT_MOTION_TIMEOUT: u8 = 5;

const PROGRESS_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(
    name = "pot_enc_cli",
    about = "Calibrate a joint potentiometer against its encoder on a simulated arm"
)]
struct Cli {
    /// Joint under test (prompted on stdin when omitted)
    #[arg(long)]
    joint: Option<usize>,
    /// JSON configuration file (defaults to assets/pot_enc_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Confirm both extremes without prompting; requires --joint
    #[arg(long, requires = "joint")]
    non_interactive: bool,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    #[arg(long)]
    settle_ms: Option<u64>,
    #[arg(long)]
    burst_interval_ms: Option<u64>,
    /// Per-request motion timeout; 0 waits indefinitely
    #[arg(long)]
    motion_timeout_ms: Option<u64>,
    /// Steps on each side of zero (the sweep visits 2n+1 positions)
    #[arg(long)]
    half_steps: Option<u32>,
    /// Standard deviation formula: literal or sample
    #[arg(long)]
    deviation: Option<DeviationFormula>,
    /// Where the simulated operator places the joint for the first extreme
    #[arg(long, default_value_t = -1.2, allow_negative_numbers = true)]
    first_extreme: f64,
    /// Where the simulated operator places the joint for the second extreme
    #[arg(long, default_value_t = 1.3, allow_negative_numbers = true)]
    second_extreme: f64,
    /// Simulated potentiometer gain (reading per radian)
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pot_gain: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pot_offset: f64,
    /// Half-width of uniform noise added to each potentiometer reading
    #[arg(long, default_value_t = 0.0)]
    pot_noise: f64,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> AppConfig {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    if let Some(settle_ms) = cli.settle_ms {
        config.sweep.settle_delay_ms = settle_ms;
    }
    if let Some(interval_ms) = cli.burst_interval_ms {
        config.sweep.burst_interval_ms = interval_ms;
    }
    if let Some(timeout_ms) = cli.motion_timeout_ms {
        config.sweep.motion_timeout_ms = timeout_ms;
    }
    if let Some(half_steps) = cli.half_steps {
        config.sweep.half_steps = half_steps;
    }
    if let Some(formula) = cli.deviation {
        config.analysis.deviation_formula = formula;
    }
    config
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = build_config(&cli);
    tracing::debug!(?config, "effective configuration");
    if let Err(err) = config.sweep.validate() {
        return report_failure(&err, None, cli.json);
    }

    let feed = PotentiometerFeed::default();
    let sensors = Arc::new(SensorBuffer::new());
    let _subscription = feed.subscribe(Arc::clone(&sensors));

    let model = PotentiometerModel {
        gain: cli.pot_gain,
        offset: cli.pot_offset,
        noise: cli.pot_noise,
    };
    let arm = Arc::new(SimulatedArm::new(config.arm.joint_count, model).with_feed(feed));
    let extremes = RangeExtremes::new(cli.first_extreme, cli.second_extreme);

    let (progress_tx, progress_rx) = broadcast::channel(PROGRESS_CAPACITY);
    let progress_logger = spawn_progress_logger(progress_rx)?;

    let mut procedure =
        CalibrationProcedure::new(config, arm.clone(), sensors).with_progress(progress_tx);

    let mut operator: Box<dyn OperatorSignal> = if cli.non_interactive {
        Box::new(SimulatedOperator::new(
            AutoOperator::new(cli.joint),
            arm,
            extremes,
        ))
    } else {
        Box::new(SimulatedOperator::new(
            StdinOperator::stdio().with_joint(cli.joint),
            arm,
            extremes,
        ))
    };

    let outcome = procedure.run(operator.as_mut());
    let joint = procedure.joint();

    // Closes the progress channel so the logger drains and exits
    drop(procedure);
    if progress_logger.join().is_err() {
        tracing::warn!("progress logger panicked");
    }

    match outcome {
        Ok(run) => {
            let report = CalibrationReport::from_run(&run);
            if cli.json {
                println!("{}", report.to_json().context("serializing report")?);
            } else {
                print!("{}", report.to_text());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_failure(&err, joint, cli.json),
    }
}

fn report_failure(err: &CalibrationError, joint: Option<usize>, json: bool) -> Result<ExitCode> {
    if let CalibrationError::MotionTimeout { step, partial, .. } = err {
        let partial = PartialSweepReport::new(joint, *step, partial);
        if json {
            println!("{}", partial.to_json().context("serializing partial report")?);
        } else {
            print!("{}", partial.to_text());
        }
    }
    eprintln!("Error: {}", err);
    Ok(ExitCode::from(exit_code(err)))
}

fn exit_code(err: &CalibrationError) -> u8 {
    match err {
        CalibrationError::InvalidJoint { .. } | CalibrationError::InvalidConfig { .. } => {
            EXIT_CONFIG
        }
        CalibrationError::DegenerateRange { .. } => EXIT_DEGENERATE_RANGE,
        CalibrationError::SensorUnavailable { .. } => EXIT_SENSOR_UNAVAILABLE,
        CalibrationError::MotionTimeout { .. } => EXIT_MOTION_TIMEOUT,
        _ => EXIT_FAILURE,
    }
}

fn spawn_progress_logger(
    mut rx: broadcast::Receiver<SweepProgress>,
) -> Result<JoinHandle<()>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("creating progress runtime")?;

    Ok(std::thread::spawn(move || {
        rt.block_on(async move {
            loop {
                match rx.recv().await {
                    Ok(progress) => tracing::info!(
                        step = progress.step,
                        completed = progress.completed,
                        total = progress.total_steps,
                        percent = progress.fraction() * 100.0,
                        pot = progress.pot_mean,
                        enc = progress.enc_mean,
                        "sweep progress"
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "progress logger lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }))
}
