// Operator signals - the human side of the calibration workflow
//
// The procedure blocks on these calls while the operator picks a joint and
// physically holds it at each extreme.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::calibration::RangeExtremes;
use crate::error::CalibrationError;
use crate::motion::SimulatedArm;

/// Which physical extreme is being captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    First,
    Second,
}

impl Extreme {
    pub fn display_name(&self) -> &'static str {
        match self {
            Extreme::First => "first",
            Extreme::Second => "second",
        }
    }
}

/// Source of operator decisions and "ready" confirmations
pub trait OperatorSignal {
    /// Joint index the operator wants to test; the procedure range-checks
    /// the answer again before anything moves
    fn select_joint(&mut self, joint_count: usize) -> Result<usize, CalibrationError>;

    /// Block until the operator confirms the joint is held at `extreme`
    fn await_extreme(&mut self, joint: usize, extreme: Extreme) -> Result<(), CalibrationError>;
}

/// Line-oriented prompts on a reader/writer pair (stdin/stderr in the CLI)
pub struct StdinOperator<R, W> {
    input: R,
    output: W,
    preset_joint: Option<usize>,
}

impl StdinOperator<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr and read from stdin, keeping stdout for the report
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> StdinOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            preset_joint: None,
        }
    }

    /// Skip the joint prompt and use `joint`
    pub fn with_joint(mut self, joint: Option<usize>) -> Self {
        self.preset_joint = joint;
        self
    }

    fn prompt(&mut self, text: &str) -> Result<String, CalibrationError> {
        write!(self.output, "{}", text)
            .and_then(|_| self.output.flush())
            .map_err(|err| CalibrationError::OperatorAborted {
                reason: format!("cannot write prompt: {}", err),
            })?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|err| CalibrationError::OperatorAborted {
                reason: format!("cannot read operator input: {}", err),
            })?;
        if read == 0 {
            return Err(CalibrationError::OperatorAborted {
                reason: "operator input closed".to_string(),
            });
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> OperatorSignal for StdinOperator<R, W> {
    fn select_joint(&mut self, joint_count: usize) -> Result<usize, CalibrationError> {
        if let Some(joint) = self.preset_joint {
            log::info!("[StdinOperator] Using preset joint {}", joint);
            return Ok(joint);
        }
        let answer = self.prompt("enter the joint you want to test: ")?;
        let joint = answer
            .parse::<i64>()
            .map_err(|_| CalibrationError::OperatorAborted {
                reason: format!(
                    "'{}' is not a joint index (expected 0..{})",
                    answer, joint_count
                ),
            })?;
        // Negative answers are rejected here, never wrapped to the last joint
        match usize::try_from(joint) {
            Ok(index) if index < joint_count => Ok(index),
            _ => Err(CalibrationError::InvalidJoint { joint, joint_count }),
        }
    }

    fn await_extreme(&mut self, _joint: usize, extreme: Extreme) -> Result<(), CalibrationError> {
        self.prompt(&format!(
            "move the joint to the {} extreme, then press enter",
            extreme.display_name()
        ))?;
        Ok(())
    }
}

/// Non-interactive operator: fixed joint, immediate confirmations
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoOperator {
    joint: Option<usize>,
}

impl AutoOperator {
    pub fn new(joint: Option<usize>) -> Self {
        Self { joint }
    }
}

impl OperatorSignal for AutoOperator {
    fn select_joint(&mut self, _joint_count: usize) -> Result<usize, CalibrationError> {
        self.joint.ok_or_else(|| CalibrationError::OperatorAborted {
            reason: "no joint given for a non-interactive run".to_string(),
        })
    }

    fn await_extreme(&mut self, _joint: usize, _extreme: Extreme) -> Result<(), CalibrationError> {
        Ok(())
    }
}

/// Wraps another operator and places a simulated joint at scripted extremes
/// before each confirmation, standing in for the operator's hands.
pub struct SimulatedOperator<O> {
    inner: O,
    arm: Arc<SimulatedArm>,
    extremes: RangeExtremes,
}

impl<O: OperatorSignal> SimulatedOperator<O> {
    pub fn new(inner: O, arm: Arc<SimulatedArm>, extremes: RangeExtremes) -> Self {
        Self {
            inner,
            arm,
            extremes,
        }
    }
}

impl<O: OperatorSignal> OperatorSignal for SimulatedOperator<O> {
    fn select_joint(&mut self, joint_count: usize) -> Result<usize, CalibrationError> {
        self.inner.select_joint(joint_count)
    }

    fn await_extreme(&mut self, joint: usize, extreme: Extreme) -> Result<(), CalibrationError> {
        let position = match extreme {
            Extreme::First => self.extremes.first,
            Extreme::Second => self.extremes.second,
        };
        self.arm.place_joint(joint, position)?;
        self.inner.await_extreme(joint, extreme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{MotionInterface, PotentiometerModel};
    use std::io::Cursor;

    #[test]
    fn test_stdin_operator_reads_joint_and_confirmations() {
        let input = Cursor::new(b"2\n\n\n".to_vec());
        let mut output = Vec::new();
        {
            let mut operator = StdinOperator::new(input, &mut output);
            assert_eq!(operator.select_joint(7).unwrap(), 2);
            operator.await_extreme(2, Extreme::First).unwrap();
            operator.await_extreme(2, Extreme::Second).unwrap();
        }
        let prompts = String::from_utf8(output).unwrap();
        assert!(prompts.starts_with("enter the joint you want to test: "));
        assert!(prompts.contains("first extreme"));
        assert!(prompts.contains("second extreme"));
    }

    #[test]
    fn test_stdin_operator_eof_aborts() {
        let mut operator = StdinOperator::new(Cursor::new(b"3\n".to_vec()), Vec::new());
        assert_eq!(operator.select_joint(7).unwrap(), 3);
        assert!(matches!(
            operator.await_extreme(3, Extreme::First),
            Err(CalibrationError::OperatorAborted { .. })
        ));
    }

    #[test]
    fn test_stdin_operator_rejects_non_numeric_joint() {
        let mut operator = StdinOperator::new(Cursor::new(b"elbow\n".to_vec()), Vec::new());
        assert!(matches!(
            operator.select_joint(7),
            Err(CalibrationError::OperatorAborted { .. })
        ));
    }

    #[test]
    fn test_stdin_operator_rejects_out_of_range_joint() {
        for (answer, joint) in [("-1", -1), ("7", 7), ("-9000000000", -9_000_000_000)] {
            let input = Cursor::new(format!("{}\n", answer).into_bytes());
            let mut operator = StdinOperator::new(input, Vec::new());
            assert_eq!(
                operator.select_joint(7),
                Err(CalibrationError::InvalidJoint {
                    joint,
                    joint_count: 7
                })
            );
        }
    }

    #[test]
    fn test_preset_joint_skips_prompt() {
        let mut output = Vec::new();
        let mut operator =
            StdinOperator::new(Cursor::new(Vec::new()), &mut output).with_joint(Some(5));
        assert_eq!(operator.select_joint(7).unwrap(), 5);
        drop(operator);
        assert!(output.is_empty());
    }

    #[test]
    fn test_auto_operator_requires_joint() {
        assert!(AutoOperator::new(None).select_joint(7).is_err());
        assert_eq!(AutoOperator::new(Some(1)).select_joint(7).unwrap(), 1);
    }

    #[test]
    fn test_simulated_operator_places_joint() {
        let arm = Arc::new(SimulatedArm::new(7, PotentiometerModel::default()));
        let mut operator = SimulatedOperator::new(
            AutoOperator::new(Some(4)),
            Arc::clone(&arm),
            RangeExtremes::new(-0.8, 0.9),
        );
        operator.await_extreme(4, Extreme::Second).unwrap();
        assert_eq!(arm.current_positions().unwrap()[4], 0.9);
        // Hand placement is not a commanded move
        assert_eq!(arm.command_count(), 0);
    }
}
