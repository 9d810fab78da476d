//! Builder pattern implementation for creating Downloader instances.
//!
//! This module provides the [`DownloaderBuilder`] struct that implements the builder
//! pattern for configuring and creating [`Downloader`] instances. It allows for
//! flexible configuration of concurrency, retries, the batch deadline, progress
//! reporting, HTTP settings and callback functions.
//!
//! # Examples
//!
//! ## Basic Builder Usage
//!
//! ```rust
//! use downpour::DownloaderBuilder;
//!
//! # fn example() -> Result<(), downpour::Error> {
//! let downloader = DownloaderBuilder::new()
//!     .concurrent_downloads(5)
//!     .retries(3)
//!     .timeout_minutes(10)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Advanced Configuration with Callbacks
//!
//! ```rust
//! use downpour::{DownloaderBuilder, Status};
//! use reqwest::header::{HeaderMap, USER_AGENT};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut headers = HeaderMap::new();
//! headers.insert(USER_AGENT, "MyApp/1.0".parse()?);
//!
//! let downloader = DownloaderBuilder::new()
//!     .headers(headers)
//!     .detailed_progress(true)
//!     .on_complete(|summary| {
//!         match summary.status() {
//!             Status::Success => println!("Downloaded {}", summary.download().path.display()),
//!             Status::Fail(msg) => println!("Failed {}: {}", summary.download().url, msg),
//!             _ => {}
//!         }
//!     })
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use super::config::{DownloaderConfig, LogSink};
use super::downloader::Downloader;
use crate::download::Summary;
use crate::error::{Error, Result};
use crate::http::{create_http_client, HttpClientConfig, ProbeMethod};

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use reqwest::{Proxy, Url};
use std::sync::Arc;
use std::time::Duration;

/// A builder used to create a [`Downloader`].
///
/// ```rust
/// # fn main()  {
/// use downpour::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().retries(5).concurrent_downloads(2).build().unwrap();
/// # }
/// ```
#[derive(Default)]
pub struct DownloaderBuilder {
    config: DownloaderConfig,
}

impl DownloaderBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloaderBuilder::default()
    }

    /// Set the number of concurrent downloads. Must be at least 1.
    pub fn concurrent_downloads(mut self, concurrent_downloads: usize) -> Self {
        self.config.concurrent_downloads = concurrent_downloads;
        self
    }

    /// Set the number of retries per download.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the overall deadline of a batch.
    ///
    /// It is also the upper bound of every single HTTP request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the overall deadline of a batch, in minutes.
    pub fn timeout_minutes(self, minutes: u64) -> Self {
        self.timeout(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Publish progress and speed streams, see [`Downloader::progress`].
    pub fn detailed_progress(mut self, detailed_progress: bool) -> Self {
        self.config.detailed_progress = detailed_progress;
        self
    }

    /// Set the interval between two progress samples.
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.config.progress_interval = interval;
        self
    }

    /// Route every request through a proxy (`http`, `https` or `socks5`).
    pub fn proxy(mut self, proxy: Url) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Resume partially downloaded files when the server allows it.
    pub fn resumable(mut self, resumable: bool) -> Self {
        self.config.resumable = resumable;
        self
    }

    /// Choose how the size of each remote file is discovered.
    pub fn probe_method(mut self, method: ProbeMethod) -> Self {
        self.config.probe_method = method;
        self
    }

    /// Use range requests to get content length instead of HEAD requests.
    ///
    /// This is useful when servers don't provide accurate Content-Length headers
    /// in HEAD requests but do support range requests with Content-Range responses.
    pub fn use_range_for_content_length(self, use_range: bool) -> Self {
        self.probe_method(match use_range {
            true => ProbeMethod::Range,
            false => ProbeMethod::Head,
        })
    }

    /// Set the copy buffer size. Must be at least 1.
    ///
    /// Resumed downloads restart at a multiple of this size.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    /// Set callback for when each download completes.
    ///
    /// The callback will be called immediately when each download finishes,
    /// regardless of whether other downloads are still in progress.
    ///
    /// # Example
    ///
    /// ```rust
    /// use downpour::{DownloaderBuilder, Status};
    ///
    /// let downloader = DownloaderBuilder::new()
    ///     .on_complete(|summary| {
    ///         match summary.status() {
    ///             Status::Success => {
    ///                 println!("[Success] {} Downloaded", summary.download().url);
    ///             }
    ///             Status::Fail(error) => {
    ///                 println!("[Failed] {} - Error: {}", summary.download().url, error);
    ///             }
    ///             Status::Skipped(reason) => {
    ///                 println!("[Skipped] {} - {}", summary.download().url, reason);
    ///             }
    ///             Status::Cancelled => {}
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Summary) + Send + Sync + 'static,
    {
        self.config.on_complete = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Mirror lifecycle log lines to `sink`, in addition to `tracing`.
    pub fn log_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let sink: LogSink = Arc::new(sink);
        self.config.log_sink = Some(sink);
        self
    }

    /// Helper method to get or create a new HeaderMap.
    fn new_header(&self) -> HeaderMap {
        match self.config.headers {
            Some(ref h) => h.to_owned(),
            _ => HeaderMap::new(),
        }
    }

    /// Add the http headers.
    ///
    /// You can call `.headers()` multiple times and all `HeaderMap` will be
    /// merged into a single one.
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue, HeaderMap};
    /// use downpour::DownloaderBuilder;
    ///
    /// let ua = HeaderValue::from_static("curl/7.87");
    ///
    /// let builder = DownloaderBuilder::new()
    ///     .headers(HeaderMap::from_iter([(header::USER_AGENT, ua)]))
    ///     .build();
    /// ```
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.new_header();
        new.extend(headers);

        self.config.headers = Some(new);
        self
    }

    /// Add the http header
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue};
    /// use downpour::DownloaderBuilder;
    ///
    /// let builder = DownloaderBuilder::new()
    ///     .header(header::USER_AGENT, HeaderValue::from_static("downpour"))
    ///     .header(header::ACCEPT, HeaderValue::from_static("*/*"))
    ///     .build();
    /// ```
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.new_header();

        new.insert(name, value);

        self.config.headers = Some(new);
        self
    }

    /// Create the [`Downloader`] with the specified options.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a concurrency limit, timeout, progress interval
    /// or buffer size of zero, or a proxy the HTTP transport rejects.
    pub fn build(self) -> Result<Downloader> {
        let config = self.config;
        if config.concurrent_downloads == 0 {
            return Err(Error::Config(
                "the number of concurrent downloads must be at least 1".into(),
            ));
        }
        if config.timeout.is_zero() {
            return Err(Error::Config("the timeout must be positive".into()));
        }
        if config.progress_interval.is_zero() {
            return Err(Error::Config(
                "the progress interval must be positive".into(),
            ));
        }
        if config.buffer_size == 0 {
            return Err(Error::Config("the buffer size must be at least 1".into()));
        }

        let proxy = match &config.proxy {
            Some(url) => Some(
                Proxy::all(url.as_str())
                    .map_err(|e| Error::Config(format!("invalid proxy {}: {}", url, e)))?,
            ),
            None => None,
        };

        let client = create_http_client(HttpClientConfig {
            proxy,
            headers: config.headers.clone(),
            timeout: Some(config.timeout),
        })?;

        Ok(Downloader::new(config, client))
    }
}
