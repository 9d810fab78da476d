//! Downloader module containing the batch orchestration, builder pattern, and configuration.
//!
//! # Overview
//!
//! - `downloader` - Core Downloader struct running one batch end to end
//! - `builder` - DownloaderBuilder validating the configuration
//! - `config` - Configuration structures and callback types
//! - `dispatcher` - Bounded-concurrency launching of transfers
//! - `retry` - Per-transfer retry loop with exponential backoff
//! - `state` - The single-use `Ready → Downloading → Done` lifecycle
//!
//! # Examples
//!
//! ```rust,no_run
//! use downpour::{Download, DownloaderBuilder};
//!
//! # async fn example() -> Result<(), downpour::Error> {
//! let downloader = DownloaderBuilder::new()
//!     .concurrent_downloads(5)
//!     .retries(3)
//!     .on_complete(|summary| println!("{:?}: {:?}", summary.download().path, summary.status()))
//!     .build()?;
//!
//! let downloads = vec![
//!     Download::try_from("https://example.com/file1.zip")?.in_directory("downloads"),
//!     Download::try_from("https://example.com/file2.pdf")?.in_directory("downloads"),
//! ];
//! downloader.download_all(&downloads).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod downloader;
pub mod retry;
pub mod state;

pub use builder::DownloaderBuilder;
pub use config::{DownloadCallback, DownloaderConfig, LogSink};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use downloader::Downloader;
pub use state::State;
