//! Timeout-bounded access to a [`MotionInterface`].
//!
//! The arm is owned by a dedicated worker thread. Callers submit requests over
//! a channel and wait for the reply with a deadline, so an arm that never
//! answers surfaces as [`MotionCallError::TimedOut`] instead of stalling the
//! caller forever. A request that times out leaves the worker blocked; every
//! later request queues behind it, so callers are expected to abort.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{log_motion_error, MotionError};

use super::MotionInterface;

/// Failure of a single worker request
#[derive(Debug, Clone, PartialEq)]
pub enum MotionCallError {
    /// No reply within the configured timeout
    TimedOut { timeout: Duration },
    /// The arm answered with an error
    Failed(MotionError),
}

impl From<MotionError> for MotionCallError {
    fn from(err: MotionError) -> Self {
        MotionCallError::Failed(err)
    }
}

enum MotionRequest {
    MoveTo {
        positions: Vec<f64>,
        joints: Vec<usize>,
        reply: mpsc::Sender<Result<(), MotionError>>,
    },
    CurrentPositions {
        reply: mpsc::Sender<Result<Vec<f64>, MotionError>>,
    },
}

/// Worker thread wrapping a motion backend
pub struct MotionWorker {
    tx: Option<mpsc::Sender<MotionRequest>>,
    handle: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
    joint_count: usize,
}

impl MotionWorker {
    /// Spawn a worker for `arm`
    ///
    /// # Arguments
    /// * `arm` - Backend that executes the requests
    /// * `timeout` - Per-request deadline; `Duration::ZERO` waits indefinitely
    pub fn spawn(arm: Arc<dyn MotionInterface>, timeout: Duration) -> Self {
        let joint_count = arm.joint_count();
        let (tx, rx) = mpsc::channel::<MotionRequest>();

        let handle = std::thread::spawn(move || {
            for request in rx {
                match request {
                    MotionRequest::MoveTo {
                        positions,
                        joints,
                        reply,
                    } => {
                        let result = arm.move_to(&positions, &joints);
                        if let Err(err) = &result {
                            log_motion_error(err, "MotionWorker::move_to");
                        }
                        let _ = reply.send(result);
                    }
                    MotionRequest::CurrentPositions { reply } => {
                        let result = arm.current_positions();
                        if let Err(err) = &result {
                            log_motion_error(err, "MotionWorker::current_positions");
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            log::debug!("[MotionWorker] Request channel closed, exiting");
        });

        Self {
            tx: Some(tx),
            handle: Some(handle),
            timeout: (!timeout.is_zero()).then_some(timeout),
            joint_count,
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Command joints to absolute positions
    pub fn move_to(&self, positions: &[f64], joints: &[usize]) -> Result<(), MotionCallError> {
        let (reply, rx) = mpsc::channel();
        self.submit(MotionRequest::MoveTo {
            positions: positions.to_vec(),
            joints: joints.to_vec(),
            reply,
        })?;
        self.wait(rx)
    }

    /// Full joint-position vector
    pub fn current_positions(&self) -> Result<Vec<f64>, MotionCallError> {
        let (reply, rx) = mpsc::channel();
        self.submit(MotionRequest::CurrentPositions { reply })?;
        self.wait(rx)
    }

    /// Current position of a single joint
    pub fn current_position(&self, joint: usize) -> Result<f64, MotionCallError> {
        let positions = self.current_positions()?;
        positions.get(joint).copied().ok_or_else(|| {
            MotionCallError::Failed(MotionError::JointOutOfRange {
                joint,
                joint_count: positions.len(),
            })
        })
    }

    fn submit(&self, request: MotionRequest) -> Result<(), MotionCallError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or(MotionCallError::Failed(MotionError::WorkerUnavailable))?;
        tx.send(request)
            .map_err(|_| MotionCallError::Failed(MotionError::WorkerUnavailable))
    }

    fn wait<T>(&self, rx: mpsc::Receiver<Result<T, MotionError>>) -> Result<T, MotionCallError> {
        let reply = match self.timeout {
            Some(timeout) => rx.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => MotionCallError::TimedOut { timeout },
                RecvTimeoutError::Disconnected => dropped_reply(),
            })?,
            None => rx.recv().map_err(|_| dropped_reply())?,
        };
        reply.map_err(MotionCallError::Failed)
    }
}

/// The backend went away while holding the request (the worker thread died)
fn dropped_reply() -> MotionCallError {
    MotionCallError::Failed(MotionError::Disconnected {
        details: "motion backend dropped the request without replying".to_string(),
    })
}

impl Drop for MotionWorker {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                // A stalled arm may never return; leave the thread detached.
                log::debug!("[MotionWorker] Detaching busy worker thread");
            }
        }
    }
}
