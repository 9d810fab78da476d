//! Core downloader implementation with the batch orchestration.
//!
//! This module contains the main [`Downloader`] struct that probes remote
//! sizes, runs the transfers of a batch under a concurrency limit, feeds the
//! progress aggregator and enforces the overall deadline.
//!
//! # Examples
//!
//! ## Basic Download
//!
//! ```rust,no_run
//! use downpour::{Download, DownloaderBuilder};
//!
//! # async fn example() -> Result<(), downpour::Error> {
//! let downloader = DownloaderBuilder::new().build()?;
//! let downloads = vec![
//!     Download::try_from("https://example.com/file1.zip")?,
//!     Download::try_from("https://example.com/file2.pdf")?,
//! ];
//!
//! downloader.download_all(&downloads).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancelling From Another Task
//!
//! ```rust,no_run
//! use downpour::{Download, DownloaderBuilder};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), downpour::Error> {
//! let downloader = Arc::new(DownloaderBuilder::new().build()?);
//! let handle = downloader.clone();
//! tokio::spawn(async move {
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     handle.cancel();
//! });
//!
//! let res = downloader
//!     .download(&Download::try_from("https://example.com/large.iso")?)
//!     .await;
//! assert!(res.is_err_and(|e| e.is_cancellation()));
//! # Ok(())
//! # }
//! ```

use super::config::{DownloadCallback, DownloaderConfig, Log};
use super::dispatcher::Dispatcher;
use super::retry::with_retries;
use super::state::{Lifecycle, State};
use crate::download::{Download, Status, Summary};
use crate::error::{Error, Result};
use crate::http::{probe, total_size, ProbeMethod, RemoteMetadata};
use crate::progress::{ProgressAggregator, ProgressEvent, ProgressPublisher};
use crate::transfer::{Transfer, TransferReport};

use futures::stream::{self, StreamExt};
use reqwest::{header::HeaderMap, Url};
use reqwest_middleware::ClientWithMiddleware;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Represents the download controller.
///
/// A downloader runs exactly one batch. It is created via its builder:
///
/// ```rust
/// use downpour::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().build().unwrap();
/// assert_eq!(d.concurrent_downloads(), 3);
/// ```
pub struct Downloader {
    config: DownloaderConfig,
    client: ClientWithMiddleware,
    lifecycle: Lifecycle,
    cancel: CancellationToken,
    publisher: Mutex<Option<ProgressPublisher>>,
}

impl fmt::Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Downloader {
    /// Creates a new Downloader with a validated configuration and its client.
    pub(crate) fn new(config: DownloaderConfig, client: ClientWithMiddleware) -> Self {
        let publisher = config.detailed_progress.then(ProgressPublisher::new);
        Self {
            config,
            client,
            lifecycle: Lifecycle::new(),
            cancel: CancellationToken::new(),
            publisher: Mutex::new(publisher),
        }
    }

    /// Gets the maximum number of concurrent transfers.
    pub fn concurrent_downloads(&self) -> usize {
        self.config.concurrent_downloads
    }

    /// Gets the number of retries per download.
    pub fn retries(&self) -> u32 {
        self.config.retries
    }

    /// Gets the overall batch deadline.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Gets whether downloads are resumable.
    pub fn resumable(&self) -> bool {
        self.config.resumable
    }

    /// Gets whether progress and speed streams are published.
    pub fn detailed_progress(&self) -> bool {
        self.config.detailed_progress
    }

    /// Gets the interval between two progress samples.
    pub fn progress_interval(&self) -> Duration {
        self.config.progress_interval
    }

    /// Gets the proxy endpoint.
    pub fn proxy(&self) -> Option<&Url> {
        self.config.proxy.as_ref()
    }

    /// Gets the custom headers.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.config.headers.as_ref()
    }

    /// Gets how remote sizes are probed.
    pub fn probe_method(&self) -> ProbeMethod {
        self.config.probe_method
    }

    /// Gets whether to use range requests for content length.
    pub fn use_range_for_content_length(&self) -> bool {
        self.config.probe_method == ProbeMethod::Range
    }

    /// Gets the copy buffer size.
    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    /// Gets the lifecycle state.
    pub fn state(&self) -> State {
        self.lifecycle.current()
    }

    /// Requests cancellation of the batch, from any task.
    ///
    /// Running transfers stop at their next chunk, no further transfer is
    /// started and the batch call returns [`Error::Cancelled`]. Cancelling
    /// before the batch starts makes it return immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle on the cancellation signal of this downloader.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribes to the completion fraction of the batch.
    ///
    /// Returns `None` unless detailed progress is enabled and the batch has
    /// not started. Fractions are only sent when every remote size is known.
    /// The stream ends with the batch.
    pub fn progress(&self) -> Option<broadcast::Receiver<f64>> {
        self.with_publisher(ProgressPublisher::subscribe_fraction)
    }

    /// Subscribes to the number of bytes received per sample interval.
    ///
    /// Same availability rules as [`progress`](Downloader::progress).
    pub fn speed(&self) -> Option<broadcast::Receiver<u64>> {
        self.with_publisher(ProgressPublisher::subscribe_speed)
    }

    fn with_publisher<T>(&self, f: impl FnOnce(&ProgressPublisher) -> T) -> Option<T> {
        if self.state() != State::Ready {
            return None;
        }
        self.publisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }

    fn take_publisher(&self) -> Option<ProgressPublisher> {
        self.publisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Downloads a single file. See [`download_all`](Downloader::download_all).
    pub async fn download(&self, download: &Download) -> Result<()> {
        self.download_all(std::slice::from_ref(download)).await
    }

    /// Downloads a batch of files.
    ///
    /// Returns [`Error::Cancelled`] if [`cancel`](Downloader::cancel) stopped
    /// or prevented a transfer, [`Error::TimedOut`] if the deadline did,
    /// otherwise the last transfer error observed, if any. A cancellation
    /// that arrives once every transfer has ended leaves the result as is. Per-file outcomes go to the
    /// `on_complete` callback.
    ///
    /// # Panics
    ///
    /// If this downloader already ran a batch or is running one.
    pub async fn download_all(&self, downloads: &[Download]) -> Result<()> {
        let _finish = self.lifecycle.begin();
        let log = Log::new(self.config.log_sink.clone());
        // Owned by this call so the streams close on every exit path.
        let publisher = self.take_publisher();

        check_destinations(downloads)?;
        if self.cancel.is_cancelled() {
            log.info("Cancelled before start");
            return Err(Error::Cancelled);
        }

        let timeout = self.config.timeout;
        let pipeline = self.run_batch(downloads, publisher, &log);
        tokio::pin!(pipeline);
        let deadline = sleep(timeout);
        tokio::pin!(deadline);

        let mut deadline_passed = false;
        let mut timed_out = false;
        let result = loop {
            tokio::select! {
                res = &mut pipeline => break res,
                _ = &mut deadline, if !deadline_passed => {
                    deadline_passed = true;
                    if !self.cancel.is_cancelled() {
                        log.warn(format!("Deadline of {:?} reached, cancelling downloads", timeout));
                        timed_out = true;
                        self.cancel.cancel();
                    }
                }
            }
        };

        match result {
            Err(e) if e.is_cancellation() && timed_out => Err(Error::TimedOut(timeout)),
            other => other,
        }
    }

    async fn run_batch(
        &self,
        downloads: &[Download],
        publisher: Option<ProgressPublisher>,
        log: &Log,
    ) -> Result<()> {
        log.info(format!("Download Files: {}", downloads.len()));

        let metadata = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            metadata = self.probe_all(downloads, log) => metadata,
        };

        let total = total_size(&metadata);
        match total {
            Some(total) => log.info(format!("Total Download Bytes: {}", total)),
            None => log.warn("Could not get whole size... No progress value is available"),
        }

        let (events, receiver) = mpsc::unbounded_channel();
        let stop = self.cancel.child_token();
        let aggregator = ProgressAggregator::new(total, self.config.progress_interval)
            .with_publisher(publisher)
            .with_log(log.clone());
        let observer = tokio::spawn(aggregator.run(receiver, stop.clone()));

        let context = TransferContext {
            client: self.client.clone(),
            events,
            cancel: self.cancel.clone(),
            resumable: self.config.resumable,
            buffer_size: self.config.buffer_size,
            retries: self.config.retries,
            on_complete: self.config.on_complete.clone(),
            log: log.clone(),
        };

        let dispatcher = Dispatcher::new(self.config.concurrent_downloads)?;
        let items = downloads.iter().cloned().zip(metadata).collect();
        let report = dispatcher
            .run(items, &self.cancel, |(download, metadata)| {
                let context = context.clone();
                async move { context.run(download, metadata).await }
            })
            .await;
        drop(context);

        stop.cancel();
        match observer.await {
            Ok(bytes) => log.debug(format!("Downloaded {} bytes in total", bytes)),
            Err(e) => log.warn(format!("Progress observer ended abnormally: {}", e)),
        }

        log.info(format!(
            "{} done, {} failed, {} cancelled, {} not started",
            report.completed, report.failed, report.cancelled, report.not_started
        ));
        log.info("All Download Task Done.");

        // A cancellation that came after every transfer had ended changes nothing.
        if self.cancel.is_cancelled() && (report.cancelled > 0 || report.not_started > 0) {
            return Err(Error::Cancelled);
        }
        match report.last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Probes every URL, at most `concurrent_downloads` at a time, keeping the
    /// request order. A failed probe degrades to unknown metadata.
    async fn probe_all(&self, downloads: &[Download], log: &Log) -> Vec<RemoteMetadata> {
        let client = &self.client;
        let method = self.config.probe_method;

        stream::iter(downloads)
            .map(|d| async move {
                match probe(client, &d.url, method).await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        log.warn(format!("Could not get size of {}: {}", d.url, e));
                        RemoteMetadata::unknown()
                    }
                }
            })
            .buffered(self.config.concurrent_downloads)
            .collect()
            .await
    }
}

/// Rejects a batch in which two requests write the same file.
fn check_destinations(downloads: &[Download]) -> Result<()> {
    let mut seen = HashSet::with_capacity(downloads.len());
    for d in downloads {
        if !seen.insert(d.path.as_path()) {
            return Err(Error::Config(format!(
                "{} is the destination of more than one download",
                d.path.display()
            )));
        }
    }
    Ok(())
}

/// Everything a spawned transfer task needs.
#[derive(Clone)]
struct TransferContext {
    client: ClientWithMiddleware,
    events: mpsc::UnboundedSender<ProgressEvent>,
    cancel: CancellationToken,
    resumable: bool,
    buffer_size: usize,
    retries: u32,
    on_complete: Option<Arc<DownloadCallback>>,
    log: Log,
}

impl TransferContext {
    async fn run(&self, download: Download, metadata: RemoteMetadata) -> Result<()> {
        let client = &self.client;
        let events = &self.events;
        let cancel = &self.cancel;
        let target = &download;
        let log = &self.log;
        let (resumable, buffer_size) = (self.resumable, self.buffer_size);

        let (result, attempts) = with_retries(self.retries, cancel, |attempt| async move {
            if attempt > 1 {
                log.info(format!("Retrying {} (attempt {})", target.url, attempt));
            }
            Transfer::new(client, target, metadata)
                .resumable(resumable)
                .buffer_size(buffer_size)
                .run(events, cancel)
                .await
        })
        .await;

        let summary = self.summarize(&download, &result, attempts);
        if let Some(ref callback) = self.on_complete {
            callback(&summary);
        }
        result.map(|_| ())
    }

    fn summarize(
        &self,
        download: &Download,
        result: &Result<TransferReport>,
        attempts: u32,
    ) -> Summary {
        match result {
            Ok(report) if report.skipped => {
                self.log
                    .debug(format!("Download file skipped [{}]", download.url));
                Summary::new(download.clone(), 0, report.resumed_from, attempts)
                    .skip("the file was already fully downloaded")
            }
            Ok(report) => {
                self.log.debug(format!("Download file done [{}]", download.url));
                Summary::new(download.clone(), report.bytes, report.resumed_from, attempts)
            }
            Err(e) if e.is_cancellation() => {
                self.log
                    .debug(format!("Download file cancelled [{}]", download.url));
                Summary::new(download.clone(), 0, 0, attempts).with_status(Status::Cancelled)
            }
            Err(e) => {
                self.log
                    .warn(format!("Download file failed [{}]: {}", download.url, e));
                Summary::new(download.clone(), 0, 0, attempts).fail(e)
            }
        }
    }
}
