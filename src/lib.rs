//! Downpour downloads files concurrently over HTTP(S).
//!
//! A batch of downloads runs with a bounded number of simultaneous transfers,
//! resumes partially downloaded files through range requests, reports
//! aggregate progress and speed, and can be cancelled or cut short by an
//! overall deadline.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use downpour::{Download, DownloaderBuilder, Error};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let reqwest_rs = "https://github.com/seanmonstar/reqwest/archive/refs/tags/v0.11.9.zip";
//! let downloads = vec![Download::try_from(reqwest_rs)?.in_directory("output")];
//! let downloader = DownloaderBuilder::new()
//!     .concurrent_downloads(2)
//!     .retries(3)
//!     .build()?;
//! downloader.download_all(&downloads).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`download`] - The `Download` request and its per-file `Summary`
//! - [`downloader`] - The `Downloader`, its builder, dispatcher and lifecycle
//! - [`error`] - Centralized error handling with the `Error` enum
//! - [`http`] - HTTP client setup and remote size probing
//! - [`progress`] - Progress aggregation and terminal rendering
//! - [`transfer`] - The resumable, cancellable per-file transfer
//! - [`utils`] - Header parsing helpers

pub mod download;
pub mod downloader;
pub mod error;
pub mod http;
pub mod progress;
pub mod transfer;
pub mod utils;

pub use download::{Download, Status, Summary};
pub use downloader::{Downloader, DownloaderBuilder, State};
pub use error::{Error, Result};
pub use http::{create_http_client, HttpClientConfig, ProbeMethod, RemoteMetadata};
pub use progress::{ProgressDisplay, ProgressSample};
pub use utils::content_length::{content_length, parse_content_range_total, total_length};
