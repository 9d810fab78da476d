//! Bounded-concurrency dispatcher.
//!
//! Jobs are launched in request order, each after acquiring a slot of a
//! counting semaphore. A job owns its [`Slot`] for its whole lifetime and gives
//! it back when it ends, whether it succeeds, fails, is cancelled or panics.
//!
//! # Examples
//!
//! ```rust
//! use downpour::downloader::dispatcher::Dispatcher;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> downpour::Result<()> {
//! let dispatcher = Dispatcher::new(2)?;
//! let report = dispatcher
//!     .run(vec![1u64, 2, 3], &CancellationToken::new(), |n| async move {
//!         tokio::time::sleep(std::time::Duration::from_millis(n)).await;
//!         Ok(())
//!     })
//!     .await;
//!
//! assert_eq!(report.completed, 3);
//! assert!(dispatcher.peak_in_flight() <= 2);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Slot accounting shared between the dispatcher and its running jobs.
#[derive(Debug, Default)]
struct SlotStats {
    acquired: AtomicUsize,
    released: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlotStats {
    fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn release(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Permission to run one job. Returned to the dispatcher on drop.
struct Slot {
    _permit: OwnedSemaphorePermit,
    stats: Arc<SlotStats>,
}

impl Slot {
    fn new(permit: OwnedSemaphorePermit, stats: Arc<SlotStats>) -> Self {
        stats.acquire();
        Self {
            _permit: permit,
            stats,
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.stats.release();
    }
}

/// How the jobs of one [`Dispatcher::run`] ended.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Jobs that returned `Ok`.
    pub completed: usize,
    /// Jobs that returned an error other than a cancellation, or panicked.
    pub failed: usize,
    /// Jobs that returned a cancellation error.
    pub cancelled: usize,
    /// Items never launched because cancellation fired first.
    pub not_started: usize,
    /// The last error observed, in completion order.
    pub last_error: Option<Error>,
}

impl DispatchReport {
    /// Number of jobs that were launched.
    pub fn launched(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }

    fn record(&mut self, outcome: std::result::Result<Result<()>, JoinError>) {
        let err = match outcome {
            Ok(Ok(())) => {
                self.completed += 1;
                return;
            }
            Ok(Err(e)) => e,
            Err(join) => {
                warn!("Transfer task ended abnormally: {}", join);
                let msg = if join.is_panic() {
                    "transfer task panicked"
                } else {
                    "transfer task was aborted"
                };
                Error::Internal(msg.into())
            }
        };

        if err.is_cancellation() {
            self.cancelled += 1;
        } else {
            self.failed += 1;
        }
        self.last_error = Some(err);
    }
}

/// Runs jobs with at most `limit` of them in flight.
#[derive(Debug)]
pub struct Dispatcher {
    limit: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<SlotStats>,
}

impl Dispatcher {
    /// Creates a dispatcher with `limit` slots.
    ///
    /// A limit of zero could never launch anything and is rejected.
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::Config(
                "the number of concurrent downloads must be at least 1".into(),
            ));
        }
        Ok(Self {
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
            stats: Arc::new(SlotStats::default()),
        })
    }

    /// Launches `job` for every item, in order, as slots become free.
    ///
    /// Once `cancel` fires no further job is launched; the items left are
    /// counted as not started. Returns after every launched job has ended.
    pub async fn run<T, F, Fut>(
        &self,
        items: Vec<T>,
        cancel: &CancellationToken,
        mut job: F,
    ) -> DispatchReport
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let total = items.len();
        let mut report = DispatchReport::default();
        let mut tasks = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.not_started = total - index;
                    debug!("Cancelled, {} downloads not started", report.not_started);
                    break;
                }
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        report.not_started = total - index;
                        report.last_error = Some(Error::Internal("download slots closed".into()));
                        break;
                    }
                },
            };

            let slot = Slot::new(permit, self.stats.clone());
            let fut = job(item);
            debug!("Launching download {} of {}", index + 1, total);
            tasks.spawn(async move {
                let _slot = slot;
                fut.await
            });
        }

        while let Some(outcome) = tasks.join_next().await {
            report.record(outcome);
        }

        report
    }

    /// The configured number of slots.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Jobs currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of jobs that held a slot at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }

    /// Slots handed out so far.
    pub fn acquired(&self) -> usize {
        self.stats.acquired.load(Ordering::SeqCst)
    }

    /// Slots given back so far.
    pub fn released(&self) -> usize {
        self.stats.released.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;
    use tokio::time::sleep;

    #[test]
    fn test_zero_limit_is_rejected() {
        assert!(matches!(Dispatcher::new(0), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_peak_never_exceeds_limit() {
        let dispatcher = Dispatcher::new(3).unwrap();
        let report = dispatcher
            .run((0..10).collect(), &CancellationToken::new(), |_| async {
                sleep(Duration::from_millis(20)).await;
                Ok(())
            })
            .await;

        assert_eq!(report.completed, 10);
        assert!(report.last_error.is_none());
        assert_eq!(dispatcher.peak_in_flight(), 3);
        assert_eq!(dispatcher.in_flight(), 0);
        assert_eq!(dispatcher.available_slots(), 3);
        assert_eq!(dispatcher.released(), 10);
    }

    #[tokio::test]
    async fn test_limit_one_is_sequential() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let report = dispatcher
            .run(vec![3u64, 1, 2], &CancellationToken::new(), |n| {
                let order = order.clone();
                async move {
                    sleep(Duration::from_millis(n * 10)).await;
                    order.lock().unwrap().push(n);
                    Ok(())
                }
            })
            .await;

        assert_eq!(report.completed, 3);
        assert_eq!(*order.lock().unwrap(), vec![3, 1, 2]);
        assert_eq!(dispatcher.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_launching() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let report = dispatcher
            .run(vec![0, 1, 2, 3], &cancel, move |_| {
                let token = token.clone();
                async move {
                    token.cancel();
                    Ok(())
                }
            })
            .await;

        assert_eq!(report.completed, 1);
        assert_eq!(report.not_started, 3);
        assert_eq!(dispatcher.released(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_launches_nothing() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = dispatcher
            .run(vec![(), ()], &cancel, |_| async { Ok(()) })
            .await;

        assert_eq!(report.launched(), 0);
        assert_eq!(report.not_started, 2);
        assert_eq!(dispatcher.acquired(), 0);
    }

    #[tokio::test]
    async fn test_errors_and_panics_are_collected() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let report = dispatcher
            .run(vec![0, 1, 2], &CancellationToken::new(), |n| async move {
                match n {
                    0 => Ok(()),
                    1 => Err(Error::Cancelled),
                    _ => panic!("boom"),
                }
            })
            .await;

        assert_eq!(report.completed, 1);
        assert_eq!(report.cancelled, 1);
        assert_eq!(report.failed, 1);
        assert!(report.last_error.is_some());
        assert_eq!(dispatcher.released(), 3);
        assert_eq!(dispatcher.available_slots(), 2);
    }

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Succeed,
        Fail,
        Panic,
    }

    fn outcome() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            Just(Outcome::Succeed),
            Just(Outcome::Fail),
            Just(Outcome::Panic),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_slot_is_released(
            limit in 1usize..5,
            jobs in prop::collection::vec((outcome(), 0u64..5), 0..20),
        ) {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_time()
                .build()
                .unwrap();
            let n = jobs.len();
            let dispatcher = Dispatcher::new(limit).unwrap();

            let report = rt.block_on(dispatcher.run(jobs, &CancellationToken::new(), |(o, ms)| async move {
                sleep(Duration::from_millis(ms)).await;
                match o {
                    Outcome::Succeed => Ok(()),
                    Outcome::Fail => Err(Error::Internal("failed".into())),
                    Outcome::Panic => panic!("job panicked"),
                }
            }));

            prop_assert_eq!(report.launched(), n);
            prop_assert_eq!(dispatcher.acquired(), n);
            prop_assert_eq!(dispatcher.released(), n);
            prop_assert_eq!(dispatcher.in_flight(), 0);
            prop_assert_eq!(dispatcher.available_slots(), limit);
            prop_assert!(dispatcher.peak_in_flight() <= limit);
        }
    }
}
