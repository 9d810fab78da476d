//! Configuration structures and defaults for the downloader.
//!
//! This module provides the configuration used by the [`Downloader`] and its
//! [`DownloaderBuilder`], the callback types it accepts, and the small log
//! mirror that forwards lifecycle lines to a caller-supplied sink.
//!
//! [`Downloader`]: crate::Downloader
//! [`DownloaderBuilder`]: crate::DownloaderBuilder
//!
//! # Examples
//!
//! ```rust
//! use downpour::downloader::{DownloadCallback, LogSink};
//! use downpour::download::{Status, Summary};
//! use std::sync::Arc;
//!
//! let callback: DownloadCallback = Box::new(|summary: &Summary| match summary.status() {
//!     Status::Success => println!("✓ {}", summary.download().path.display()),
//!     Status::Fail(msg) => println!("✗ {} - {}", summary.download().path.display(), msg),
//!     _ => {}
//! });
//!
//! let sink: LogSink = Arc::new(|line: &str| eprintln!("[downpour] {line}"));
//! ```

use crate::download::Summary;
use crate::http::ProbeMethod;
use crate::transfer::DEFAULT_BUFFER_SIZE;

use reqwest::{header::HeaderMap, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Callback type for download completion events
pub type DownloadCallback = Box<dyn Fn(&Summary) + Send + Sync>;

/// Callback receiving human readable log lines.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Default number of concurrent transfers.
pub const DEFAULT_CONCURRENT_DOWNLOADS: usize = 3;

/// Default overall batch timeout, one hour.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default interval between two progress samples.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration structure for the downloader
#[derive(Clone)]
pub struct DownloaderConfig {
    /// Number of maximum concurrent downloads.
    pub concurrent_downloads: usize,
    /// Number of retries per downloaded file.
    pub retries: u32,
    /// Overall deadline of a batch.
    pub timeout: Duration,
    /// Publish progress and speed samples.
    pub detailed_progress: bool,
    /// Interval between two progress samples.
    pub progress_interval: Duration,
    /// Optional proxy endpoint.
    pub proxy: Option<Url>,
    /// Resume the download if necessary and possible.
    pub resumable: bool,
    /// Custom HTTP headers.
    pub headers: Option<HeaderMap>,
    /// How remote sizes are discovered.
    pub probe_method: ProbeMethod,
    /// Copy buffer size, also the resume granularity.
    pub buffer_size: usize,
    /// Callback for when each download completes.
    pub on_complete: Option<Arc<DownloadCallback>>,
    /// Sink mirroring lifecycle log lines.
    pub log_sink: Option<LogSink>,
}

impl std::fmt::Debug for DownloaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloaderConfig")
            .field("concurrent_downloads", &self.concurrent_downloads)
            .field("retries", &self.retries)
            .field("timeout", &self.timeout)
            .field("detailed_progress", &self.detailed_progress)
            .field("progress_interval", &self.progress_interval)
            .field("proxy", &self.proxy)
            .field("resumable", &self.resumable)
            .field("headers", &self.headers)
            .field("probe_method", &self.probe_method)
            .field("buffer_size", &self.buffer_size)
            .field("on_complete", &self.on_complete.is_some())
            .field("log_sink", &self.log_sink.is_some())
            .finish()
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            concurrent_downloads: DEFAULT_CONCURRENT_DOWNLOADS,
            retries: 0,
            timeout: DEFAULT_TIMEOUT,
            detailed_progress: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            proxy: None,
            resumable: true,
            headers: None,
            probe_method: ProbeMethod::Head,
            buffer_size: DEFAULT_BUFFER_SIZE,
            on_complete: None,
            log_sink: None,
        }
    }
}

/// Emits a line through `tracing` and mirrors it to the optional sink.
#[derive(Clone, Default)]
pub(crate) struct Log {
    sink: Option<LogSink>,
}

impl Log {
    pub(crate) fn new(sink: Option<LogSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn debug(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        debug!("{}", line);
        self.mirror(line);
    }

    pub(crate) fn info(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        info!("{}", line);
        self.mirror(line);
    }

    pub(crate) fn warn(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        warn!("{}", line);
        self.mirror(line);
    }

    fn mirror(&self, line: &str) {
        if let Some(sink) = &self.sink {
            sink(line);
        }
    }
}
