use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;

use crate::error::MotionError;
use crate::sensor::{PotentiometerFeed, PotentiometerVector};

use super::{validate_move, MotionInterface};

/// Poll period while a stalled arm waits to be released
const STALL_POLL: Duration = Duration::from_millis(1);

/// Linear potentiometer response: `gain * position + offset`, plus uniform
/// noise in `[-noise, noise]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentiometerModel {
    pub gain: f64,
    pub offset: f64,
    pub noise: f64,
}

impl Default for PotentiometerModel {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
            noise: 0.0,
        }
    }
}

impl PotentiometerModel {
    pub fn reading(&self, position: f64) -> f64 {
        let clean = self.gain * position + self.offset;
        if self.noise > 0.0 {
            clean + rand::thread_rng().gen_range(-self.noise..=self.noise)
        } else {
            clean
        }
    }
}

/// In-process arm used by the CLI and tests.
///
/// Moves take effect immediately and every accepted move publishes a fresh
/// potentiometer vector on the attached feed. The arm can be told to stall
/// after a number of commands to exercise motion timeouts.
pub struct SimulatedArm {
    positions: Mutex<Vec<f64>>,
    model: PotentiometerModel,
    feed: Option<PotentiometerFeed>,
    commands: AtomicU64,
    stall_after: AtomicU64,
    released: AtomicBool,
}

impl SimulatedArm {
    pub fn new(joint_count: usize, model: PotentiometerModel) -> Self {
        Self {
            positions: Mutex::new(vec![0.0; joint_count]),
            model,
            feed: None,
            commands: AtomicU64::new(0),
            stall_after: AtomicU64::new(u64::MAX),
            released: AtomicBool::new(false),
        }
    }

    /// Publish potentiometer vectors on `feed` whenever the arm moves
    pub fn with_feed(mut self, feed: PotentiometerFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Stop acknowledging commands once `commands` moves have been accepted
    pub fn stall_after(&self, commands: u64) {
        self.released.store(false, Ordering::SeqCst);
        self.stall_after.store(commands, Ordering::SeqCst);
    }

    /// Let a stalled arm answer again
    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    /// Number of accepted move commands
    pub fn command_count(&self) -> u64 {
        self.commands.load(Ordering::SeqCst)
    }

    /// Place a joint directly, as an operator guiding the arm by hand would
    pub fn place_joint(&self, joint: usize, position: f64) -> Result<(), MotionError> {
        {
            let mut positions = self.lock_positions()?;
            validate_move(&[position], &[joint], positions.len())?;
            positions[joint] = position;
        }
        self.publish_current()
    }

    /// Publish the potentiometer vector for the current pose
    pub fn publish_current(&self) -> Result<(), MotionError> {
        if let Some(feed) = &self.feed {
            let positions = self.lock_positions()?;
            let readings: Vec<f64> = positions.iter().map(|&p| self.model.reading(p)).collect();
            drop(positions);
            feed.publish(PotentiometerVector::new(readings));
        }
        Ok(())
    }

    fn lock_positions(&self) -> Result<std::sync::MutexGuard<'_, Vec<f64>>, MotionError> {
        self.positions
            .lock()
            .map_err(|_| MotionError::LockPoisoned {
                component: "simulated_arm".to_string(),
            })
    }

    fn wait_while_stalled(&self) {
        let limit = self.stall_after.load(Ordering::SeqCst);
        if self.commands.load(Ordering::SeqCst) < limit {
            return;
        }
        while !self.released.load(Ordering::SeqCst) {
            std::thread::sleep(STALL_POLL);
        }
    }
}

impl MotionInterface for SimulatedArm {
    fn move_to(&self, positions: &[f64], joints: &[usize]) -> Result<(), MotionError> {
        self.wait_while_stalled();
        {
            let mut current = self.lock_positions()?;
            validate_move(positions, joints, current.len())?;
            for (&joint, &position) in joints.iter().zip(positions) {
                current[joint] = position;
            }
        }
        self.commands.fetch_add(1, Ordering::SeqCst);
        self.publish_current()
    }

    fn current_positions(&self) -> Result<Vec<f64>, MotionError> {
        self.wait_while_stalled();
        Ok(self.lock_positions()?.clone())
    }

    fn joint_count(&self) -> usize {
        self.positions.lock().map(|p| p.len()).unwrap_or(0)
    }
}
