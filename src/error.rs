//! Error handling for downpour.
//!
//! Every fallible operation in the crate returns [`Result`]. Cancellation is a
//! distinct variant so callers can tell "the user stopped this" apart from
//! "the network failed"; see [`Error::is_cancellation`].

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can happen when using downpour.
#[derive(Error, Debug)]
pub enum Error {
    /// The downloader or the batch was configured incorrectly.
    ///
    /// Returned by [`DownloaderBuilder::build`](crate::DownloaderBuilder::build)
    /// for an invalid concurrency limit, timeout or buffer size, and by a batch
    /// call when two requests share a destination path.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error from the underlying URL parser or the expected URL format.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The download was cancelled through the downloader's cancellation handle.
    #[error("Download cancelled")]
    Cancelled,

    /// The overall batch deadline elapsed.
    #[error("Download timed out after {0:?}")]
    TimedOut(Duration),

    /// The sink accepted fewer bytes than it was handed.
    #[error("Short write: sink accepted {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes handed to the sink.
        expected: usize,
        /// Bytes the sink reported as written.
        written: usize,
    },

    /// Error from an underlying system, such as a panicked transfer task.
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O Error.
    #[error("I/O error: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the HTTP middleware stack.
    #[error("HTTP middleware error: {source}")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },
}

impl Error {
    /// Whether this error was caused by cancellation or by the batch deadline
    /// rather than by a network or file system failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::TimedOut(_))
    }
}

/// Result type alias for operations that can fail with a downpour error.
pub type Result<T> = std::result::Result<T, Error>;
