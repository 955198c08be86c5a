use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pot_enc_cli"))
}

/// Short sweep without delays
const FAST_SWEEP: [&str; 6] = [
    "--half-steps",
    "10",
    "--settle-ms",
    "0",
    "--burst-interval-ms",
    "0",
];

#[test]
fn non_interactive_json_report() {
    let output = cli()
        .args(["--non-interactive", "--joint", "2", "--json"])
        .args(["--deviation", "sample", "--pot-gain", "0.5"])
        .args(FAST_SWEEP)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pot_enc_cli");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("calibration report JSON");
    assert_eq!(json["joint"], 2);
    assert_eq!(json["points"], 21);
    assert_eq!(json["deviation_formula"], "sample");
    let range = json["range_of_motion"].as_f64().unwrap_or_default();
    assert!((range - 2.5).abs() < 1e-12, "range {range}");
    let slope = json["slope"].as_f64().unwrap_or_default();
    assert!((slope - 2.0).abs() < 1e-9, "slope {slope}");
}

#[test]
fn default_formula_is_literal() {
    let output = cli()
        .args(["--non-interactive", "--joint", "2", "--json"])
        .args(["--settle-ms", "0", "--burst-interval-ms", "0"])
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pot_enc_cli");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let json: Value = serde_json::from_slice(&output.stdout).expect("report JSON");
    assert_eq!(json["deviation_formula"], "literal");
    assert_eq!(json["points"], 101);
    let x_std = json["x_std"].as_f64().unwrap_or_default();
    assert!(x_std > 0.0 && x_std < 1e-15, "x_std {x_std}");
    let slope = json["slope"].as_f64().unwrap_or_default();
    assert!((slope - 1.0).abs() < 1e-9, "slope {slope}");
}

#[test]
fn text_report_prints_labelled_statistics() {
    let output = cli()
        .args(["--non-interactive", "--joint", "1", "--deviation", "sample"])
        .args(FAST_SWEEP)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pot_enc_cli");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let labels: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split(": ").next())
        .collect();
    assert_eq!(
        labels,
        vec![
            "range of motion",
            "correlation",
            "x standard deviation",
            "y standard deviation",
            "regression slope",
        ]
    );
    assert!(stdout.starts_with("range of motion: 2.5000000000000000"));
}

#[test]
fn interactive_prompts_read_from_stdin() {
    let mut child = cli()
        .args(["--json", "--deviation", "sample"])
        .args(FAST_SWEEP)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn pot_enc_cli");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(b"3\n\n\n")
        .expect("write operator input");
    let output = child.wait_with_output().expect("wait for pot_enc_cli");
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("enter the joint you want to test"));
    assert!(stderr.contains("first extreme"));

    let json: Value = serde_json::from_slice(&output.stdout).expect("report JSON");
    assert_eq!(json["joint"], 3);
}

#[test]
fn invalid_joint_exits_with_config_code() {
    let output = cli()
        .args(["--non-interactive", "--joint", "9"])
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pot_enc_cli");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Invalid joint 9"), "stderr: {stderr}");
}

#[test]
fn equal_extremes_exit_with_degenerate_code() {
    let output = cli()
        .args(["--non-interactive", "--joint", "1"])
        .args(["--first-extreme", "0.4", "--second-extreme", "0.4"])
        .args(FAST_SWEEP)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pot_enc_cli");
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
}

#[test]
fn negative_joint_answer_exits_with_config_code() {
    let mut child = cli()
        .args(FAST_SWEEP)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn pot_enc_cli");
    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(b"-1\n\n\n")
        .expect("write operator input");
    let output = child.wait_with_output().expect("wait for pot_enc_cli");

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Invalid joint -1"), "stderr: {stderr}");
    assert!(!stderr.contains("Homing"), "stderr: {stderr}");
}

#[test]
fn invalid_sweep_geometry_exits_with_config_code() {
    for half_steps in ["0", "3000000000"] {
        let output = cli()
            .args(["--non-interactive", "--joint", "1", "--half-steps", half_steps])
            .stdin(Stdio::null())
            .output()
            .expect("failed to run pot_enc_cli");
        assert_eq!(output.status.code(), Some(2), "half_steps {half_steps}");
        assert!(output.stdout.is_empty());
        let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
        assert!(stderr.contains("half_steps"), "stderr: {stderr}");
    }
}

#[test]
fn closed_stdin_aborts_interactive_run() {
    let output = cli()
        .args(FAST_SWEEP)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pot_enc_cli");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Operator aborted"), "stderr: {stderr}");
}
