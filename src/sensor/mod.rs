// Sensor module - latest-value potentiometer storage
//
// The potentiometer vector arrives asynchronously from the sensing side and
// is read by the sweep at arbitrary times. Only the most recent vector matters,
// so the buffer is a single atomically swapped slot: no queue, no history.
//
// Vectors routed through a feed carry the feed's publish sequence number, so
// a reader can wait until the buffer holds the newest published vector.

pub mod feed;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

pub use feed::{FeedSubscription, PotentiometerFeed};

/// Poll period used while waiting for a publish to arrive
const FIRST_UPDATE_POLL: Duration = Duration::from_millis(2);

/// Analog joint positions, one entry per joint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PotentiometerVector {
    positions: Vec<f64>,
    /// Publish sequence stamped by the feed; 0 for vectors written directly
    #[serde(default)]
    sequence: u64,
}

impl PotentiometerVector {
    pub fn new(positions: Vec<f64>) -> Self {
        Self {
            positions,
            sequence: 0,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn stamp(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Reading for one joint, if the vector covers it
    pub fn get(&self, joint: usize) -> Option<f64> {
        self.positions.get(joint).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.positions
    }
}

impl From<Vec<f64>> for PotentiometerVector {
    fn from(positions: Vec<f64>) -> Self {
        Self::new(positions)
    }
}

/// Single-slot holder for the most recent potentiometer vector
///
/// One writer (the feed subscription) and any number of readers. Each
/// `update` replaces the whole vector; readers never block the writer.
#[derive(Default)]
pub struct SensorBuffer {
    latest: ArcSwapOption<PotentiometerVector>,
    updates: AtomicU64,
    /// Publish counter of the feed routed into this buffer, if any
    source: ArcSwapOption<AtomicU64>,
}

impl SensorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored vector
    ///
    /// A stamped vector older than the stored one is dropped.
    pub fn update(&self, vector: PotentiometerVector) {
        let stored = self.latest.load();
        if let Some(current) = &*stored {
            if vector.sequence() != 0 && vector.sequence() < current.sequence() {
                return;
            }
        }
        drop(stored);
        self.latest.store(Some(Arc::new(vector)));
        self.updates.fetch_add(1, Ordering::Release);
    }

    /// Most recent vector, or `None` before the first update
    pub fn latest(&self) -> Option<Arc<PotentiometerVector>> {
        self.latest.load_full()
    }

    /// Number of updates received so far
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }

    pub fn has_data(&self) -> bool {
        self.latest.load().is_some()
    }

    /// Track the publish counter of the feed that writes into this buffer
    pub(crate) fn attach_source(&self, published: Arc<AtomicU64>) {
        self.source.store(Some(published));
    }

    /// Latest reading for a single joint
    ///
    /// # Errors
    /// `SensorUnavailable` if nothing has been received yet, the vector does
    /// not cover `joint`, or the reading is not a finite number.
    pub fn reading(&self, joint: usize) -> Result<f64, CalibrationError> {
        let vector = self
            .latest()
            .ok_or_else(|| CalibrationError::SensorUnavailable {
                reason: "no potentiometer vector received yet".to_string(),
            })?;

        let value = vector
            .get(joint)
            .ok_or_else(|| CalibrationError::SensorUnavailable {
                reason: format!(
                    "potentiometer vector has {} entries, joint {} missing",
                    vector.len(),
                    joint
                ),
            })?;

        if !value.is_finite() {
            return Err(CalibrationError::SensorUnavailable {
                reason: format!("joint {} reading is not finite ({})", joint, value),
            });
        }

        Ok(value)
    }

    /// Block until at least one vector has arrived
    ///
    /// # Arguments
    /// * `timeout` - Maximum time to wait
    ///
    /// # Returns
    /// * `Ok(vector)` - The latest vector once one is present
    /// * `Err(SensorUnavailable)` - Nothing arrived within `timeout`
    pub fn wait_for_first(
        &self,
        timeout: Duration,
    ) -> Result<Arc<PotentiometerVector>, CalibrationError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(vector) = self.latest() {
                return Ok(vector);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(CalibrationError::SensorUnavailable {
                    reason: format!(
                        "no potentiometer data received within {} ms",
                        timeout.as_millis()
                    ),
                });
            }
            std::thread::sleep(FIRST_UPDATE_POLL.min(deadline - now));
        }
    }

    /// Block until the buffer holds the newest vector published on the
    /// attached feed at the time of the call
    ///
    /// Returns immediately when no feed is attached.
    ///
    /// # Errors
    /// `SensorUnavailable` if the subscription does not catch up within
    /// `timeout`.
    pub fn wait_until_current(&self, timeout: Duration) -> Result<(), CalibrationError> {
        let target = match self.source.load_full() {
            Some(published) => published.load(Ordering::Acquire),
            None => return Ok(()),
        };
        let deadline = Instant::now() + timeout;
        loop {
            let seen = self.latest().map(|vector| vector.sequence()).unwrap_or(0);
            if seen >= target {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(CalibrationError::SensorUnavailable {
                    reason: format!(
                        "potentiometer vector {} not delivered within {} ms (latest {})",
                        target,
                        timeout.as_millis(),
                        seen
                    ),
                });
            }
            std::thread::sleep(FIRST_UPDATE_POLL.min(deadline - now));
        }
    }
}
