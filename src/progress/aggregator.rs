//! Aggregate progress of a batch.
//!
//! Every transfer sends [`ProgressEvent`]s on an unbounded channel, so
//! reporting can never hold a transfer back. The [`ProgressAggregator`] is the
//! only writer of the cumulative counts: it applies events as they arrive and,
//! on a fixed tick, derives a [`ProgressSample`] which it logs and optionally
//! publishes.
//!
//! Two counts are kept. The downloaded count is what the batch has on disk:
//! bytes received, plus bytes a transfer found already written, minus bytes
//! of an attempt that failed. The received count only grows and drives the
//! speed stream.
//!
//! Samples go out on [`tokio::sync::broadcast`] channels. A subscriber that
//! falls behind loses the oldest unread samples instead of stalling the
//! aggregator.

use crate::downloader::config::Log;

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// What a transfer reports to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A chunk of this many bytes was received.
    Received(u64),
    /// This many bytes of the destination were already on disk and are
    /// not fetched again.
    Kept(u64),
    /// A failed attempt takes back this many bytes it had counted.
    Rewound(u64),
}

/// One tick worth of progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    /// Bytes of the batch on disk.
    pub downloaded: u64,
    /// Bytes received over the network since the previous sample.
    pub delta: u64,
    /// Size of the whole batch, if every size is known.
    pub total: Option<u64>,
    /// `downloaded / total` in `[0, 1]`, only when the total is known.
    pub fraction: Option<f64>,
}

/// Senders of the caller-facing progress and speed streams.
///
/// Owned by the aggregator for the lifetime of one batch. Dropping it closes
/// both streams.
#[derive(Debug, Clone)]
pub struct ProgressPublisher {
    fraction: broadcast::Sender<f64>,
    speed: broadcast::Sender<u64>,
}

impl ProgressPublisher {
    /// Samples retained per stream for a subscriber that is not reading.
    pub const CAPACITY: usize = 16;

    /// Creates a publisher with no subscribers yet.
    pub fn new() -> Self {
        let (fraction, _) = broadcast::channel(Self::CAPACITY);
        let (speed, _) = broadcast::channel(Self::CAPACITY);
        Self { fraction, speed }
    }

    /// Subscribes to the completion fraction, between `0.0` and `1.0`.
    pub fn subscribe_fraction(&self) -> broadcast::Receiver<f64> {
        self.fraction.subscribe()
    }

    /// Subscribes to the bytes received per sample interval.
    pub fn subscribe_speed(&self) -> broadcast::Receiver<u64> {
        self.speed.subscribe()
    }

    fn publish(&self, sample: &ProgressSample) {
        // Sending only fails when nobody listens, which is fine.
        let _ = self.speed.send(sample.delta);
        if let Some(fraction) = sample.fraction {
            let _ = self.fraction.send(fraction);
        }
    }
}

impl Default for ProgressPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates byte events and samples them on a fixed tick.
pub struct ProgressAggregator {
    total: Option<u64>,
    interval: Duration,
    publisher: Option<ProgressPublisher>,
    log: Log,
    downloaded: u64,
    received: u64,
    last: u64,
}

impl ProgressAggregator {
    /// Creates an aggregator for a batch of `total` bytes, `None` if any size
    /// is unknown.
    pub fn new(total: Option<u64>, interval: Duration) -> Self {
        Self {
            total,
            interval,
            publisher: None,
            log: Log::default(),
            downloaded: 0,
            received: 0,
            last: 0,
        }
    }

    /// Publish samples through `publisher`.
    pub fn with_publisher(mut self, publisher: Option<ProgressPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub(crate) fn with_log(mut self, log: Log) -> Self {
        self.log = log;
        self
    }

    /// Applies one transfer event to the counts.
    pub fn record(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Received(bytes) => {
                self.received = self.received.saturating_add(bytes);
                self.downloaded = self.downloaded.saturating_add(bytes);
            }
            ProgressEvent::Kept(bytes) => {
                self.downloaded = self.downloaded.saturating_add(bytes);
            }
            ProgressEvent::Rewound(bytes) => {
                self.downloaded = self.downloaded.saturating_sub(bytes);
            }
        }
    }

    /// Bytes of the batch on disk so far.
    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    /// Takes a sample and starts a new interval.
    pub fn sample(&mut self) -> ProgressSample {
        let delta = self.received - self.last;
        self.last = self.received;
        ProgressSample {
            downloaded: self.downloaded,
            delta,
            total: self.total,
            fraction: self.total.map(|total| fraction(self.downloaded, total)),
        }
    }

    fn tick(&mut self) {
        let sample = self.sample();
        match sample.total {
            Some(total) => self.log.debug(format!(
                "downloaded {} bytes per interval, downloaded {} / {}",
                sample.delta, sample.downloaded, total
            )),
            None => self.log.debug(format!(
                "downloaded {} bytes per interval, downloaded {}",
                sample.delta, sample.downloaded
            )),
        }
        if let Some(publisher) = &self.publisher {
            publisher.publish(&sample);
        }
    }

    /// Runs until `stop` fires, then drains pending events, publishes a last
    /// sample and closes the streams.
    ///
    /// Returns the final cumulative byte count.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<ProgressEvent>,
        stop: CancellationToken,
    ) -> u64 {
        self.log.debug("Progress observer started");
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                Some(event) = events.recv() => self.record(event),
                _ = ticker.tick() => self.tick(),
            }
        }

        while let Ok(event) = events.try_recv() {
            self.record(event);
        }
        self.tick();
        self.log.debug("Progress observer finished");

        // Dropping `self` drops the publisher and ends the streams.
        self.downloaded
    }
}

fn fraction(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (downloaded as f64 / total as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProgressEvent::{Kept, Received, Rewound};
    use tokio::sync::broadcast::error::RecvError;

    #[test]
    fn test_sample_tracks_delta() {
        let mut aggregator = ProgressAggregator::new(Some(1000), Duration::from_secs(1));
        aggregator.record(Received(100));
        aggregator.record(Received(150));

        let first = aggregator.sample();
        assert_eq!(first.downloaded, 250);
        assert_eq!(first.delta, 250);
        assert_eq!(first.fraction, Some(0.25));

        aggregator.record(Received(50));
        let second = aggregator.sample();
        assert_eq!(second.downloaded, 300);
        assert_eq!(second.delta, 50);

        let idle = aggregator.sample();
        assert_eq!(idle.delta, 0);
        assert_eq!(idle.downloaded, 300);
    }

    #[test]
    fn test_kept_and_rewound_bytes_move_only_the_fraction() {
        let mut aggregator = ProgressAggregator::new(Some(1000), Duration::from_secs(1));
        aggregator.record(Kept(600));
        aggregator.record(Received(100));

        let sample = aggregator.sample();
        assert_eq!(sample.downloaded, 700);
        assert_eq!(sample.delta, 100);
        assert_eq!(sample.fraction, Some(0.7));

        aggregator.record(Rewound(700));
        aggregator.record(Kept(512));
        aggregator.record(Received(488));

        let sample = aggregator.sample();
        assert_eq!(sample.downloaded, 1000);
        assert_eq!(sample.delta, 488);
        assert_eq!(sample.fraction, Some(1.0));
    }

    #[test]
    fn test_rewind_never_goes_below_zero() {
        let mut aggregator = ProgressAggregator::new(Some(10), Duration::from_secs(1));
        aggregator.record(Received(4));
        aggregator.record(Rewound(9));
        assert_eq!(aggregator.downloaded(), 0);
        assert_eq!(aggregator.sample().delta, 4);
    }

    #[test]
    fn test_unknown_total_has_no_fraction() {
        let mut aggregator = ProgressAggregator::new(None, Duration::from_secs(1));
        aggregator.record(Received(42));
        let sample = aggregator.sample();
        assert_eq!(sample.fraction, None);
        assert_eq!(sample.delta, 42);
    }

    #[test]
    fn test_fraction_is_clamped() {
        assert_eq!(fraction(0, 0), 1.0);
        assert_eq!(fraction(50, 100), 0.5);
        assert_eq!(fraction(150, 100), 1.0);
    }

    #[tokio::test]
    async fn test_run_publishes_final_sample_and_closes() {
        let publisher = ProgressPublisher::new();
        let mut fractions = publisher.subscribe_fraction();
        let mut speeds = publisher.subscribe_speed();

        let (tx, rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let aggregator = ProgressAggregator::new(Some(400), Duration::from_secs(3600))
            .with_publisher(Some(publisher));
        let handle = tokio::spawn(aggregator.run(rx, stop.clone()));

        tx.send(Received(100)).unwrap();
        tx.send(Received(300)).unwrap();
        stop.cancel();

        assert_eq!(handle.await.unwrap(), 400);
        assert_eq!(fractions.recv().await.unwrap(), 1.0);
        assert!(matches!(fractions.recv().await, Err(RecvError::Closed)));
        assert_eq!(speeds.recv().await.unwrap(), 400);
        assert!(matches!(speeds.recv().await, Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn test_run_ticks_while_ingesting() {
        let publisher = ProgressPublisher::new();
        let mut speeds = publisher.subscribe_speed();

        let (tx, rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let aggregator = ProgressAggregator::new(None, Duration::from_millis(20))
            .with_publisher(Some(publisher));
        let handle = tokio::spawn(aggregator.run(rx, stop.clone()));

        tx.send(Received(10)).unwrap();
        let first = speeds.recv().await.unwrap();
        assert_eq!(first, 10);

        stop.cancel();
        assert_eq!(handle.await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_blocking() {
        let publisher = ProgressPublisher::new();
        let mut speeds = publisher.subscribe_speed();
        let mut aggregator =
            ProgressAggregator::new(None, Duration::from_secs(1)).with_publisher(Some(publisher));

        for _ in 0..(ProgressPublisher::CAPACITY + 4) {
            aggregator.record(Received(1));
            aggregator.tick();
        }

        assert!(matches!(speeds.recv().await, Err(RecvError::Lagged(4))));
        assert_eq!(speeds.recv().await.unwrap(), 1);
    }
}
