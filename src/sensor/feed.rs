//! Potentiometer publish/subscribe plumbing.
//!
//! The sensing side publishes vectors on a tokio broadcast channel. A
//! subscription drains the channel on its own thread and overwrites a
//! [`SensorBuffer`] with every vector it receives. Each published vector is
//! stamped with an increasing sequence number.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::runtime::Builder;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::{PotentiometerVector, SensorBuffer};

/// Default broadcast capacity; lagging subscribers simply skip ahead
const DEFAULT_FEED_CAPACITY: usize = 64;

/// Broadcast source of potentiometer vectors
#[derive(Clone)]
pub struct PotentiometerFeed {
    tx: broadcast::Sender<PotentiometerVector>,
    published: Arc<AtomicU64>,
}

impl PotentiometerFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish a vector to every subscriber
    ///
    /// Returns the number of receivers that got it. Publishing with no
    /// subscribers is not an error.
    pub fn publish(&self, mut vector: PotentiometerVector) -> usize {
        // Sequences start at 1; 0 marks vectors written without a feed
        let sequence = self.published.fetch_add(1, Ordering::AcqRel) + 1;
        vector.stamp(sequence);
        self.tx.send(vector).unwrap_or(0)
    }

    /// Sequence number of the most recent publish
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Raw receiver for callers that want to consume vectors themselves
    pub fn receiver(&self) -> broadcast::Receiver<PotentiometerVector> {
        self.tx.subscribe()
    }

    /// Route every published vector into `buffer`
    ///
    /// The receiver is registered before this returns, so any vector
    /// published afterwards reaches the buffer. The forwarding thread exits
    /// once every feed handle has been dropped.
    pub fn subscribe(&self, buffer: Arc<SensorBuffer>) -> FeedSubscription {
        let mut rx = self.tx.subscribe();
        buffer.attach_source(Arc::clone(&self.published));

        let handle = std::thread::spawn(move || {
            let rt = match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    log::error!("[PotentiometerFeed] Failed to create Tokio runtime: {}", err);
                    return;
                }
            };
            rt.block_on(async move {
                loop {
                    match rx.recv().await {
                        Ok(vector) => buffer.update(vector),
                        Err(RecvError::Lagged(skipped)) => {
                            log::debug!("[PotentiometerFeed] Skipped {} stale vectors", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            log::debug!("[PotentiometerFeed] Subscription closed");
        });

        FeedSubscription {
            handle: Some(handle),
        }
    }
}

impl Default for PotentiometerFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

/// Handle to a running feed subscription thread
pub struct FeedSubscription {
    handle: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the forwarding thread to exit (after the feed is dropped)
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("[PotentiometerFeed] Subscription thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_publish_without_subscribers() {
        let feed = PotentiometerFeed::default();
        assert_eq!(feed.publish(vec![0.0; 7].into()), 0);
    }

    #[test]
    fn test_subscription_updates_buffer() {
        let feed = PotentiometerFeed::default();
        let buffer = Arc::new(SensorBuffer::new());
        let subscription = feed.subscribe(Arc::clone(&buffer));
        assert_eq!(feed.subscriber_count(), 1);

        feed.publish(vec![0.25; 7].into());
        let vector = buffer.wait_for_first(Duration::from_secs(2)).unwrap();
        assert_eq!(vector.get(3), Some(0.25));
        assert!(subscription.is_active());

        drop(feed);
        subscription.join();
    }

    #[test]
    fn test_wait_until_current_sees_latest_publish() {
        let feed = PotentiometerFeed::new(4);
        let buffer = Arc::new(SensorBuffer::new());
        let _subscription = feed.subscribe(Arc::clone(&buffer));

        for i in 1..=50 {
            feed.publish(vec![i as f64; 3].into());
            buffer.wait_until_current(Duration::from_secs(2)).unwrap();
            assert_eq!(buffer.reading(2).unwrap(), i as f64);
        }
        assert_eq!(feed.published(), 50);
        assert_eq!(buffer.latest().unwrap().sequence(), 50);
    }

    #[test]
    fn test_latest_value_wins() {
        let feed = PotentiometerFeed::new(4);
        let buffer = Arc::new(SensorBuffer::new());
        let subscription = feed.subscribe(Arc::clone(&buffer));

        for i in 0..20 {
            feed.publish(vec![i as f64].into());
        }
        drop(feed);
        subscription.join();

        assert_eq!(buffer.reading(0).unwrap(), 19.0);
    }
}
