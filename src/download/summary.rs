//! Per-transfer outcomes.
//!
//! A batch call only returns one aggregate error. The [`Summary`] of every
//! individual transfer is handed to the `on_complete` callback configured on
//! the [`DownloaderBuilder`](crate::DownloaderBuilder) as soon as that
//! transfer reaches a terminal state.

use super::download::Download;

/// Terminal status of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The body was written to disk completely.
    Success,
    /// Nothing was fetched, with the reason.
    Skipped(String),
    /// The transfer stopped because the batch was cancelled or timed out.
    Cancelled,
    /// Download failed with error message
    Fail(String),
}

/// Represents a [`Download`] summary.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Downloaded item.
    download: Download,
    /// Bytes fetched over the network by the final attempt.
    size: u64,
    /// Offset the final attempt resumed from.
    resumed_from: u64,
    /// Number of attempts made, retries included.
    attempts: u32,
    /// Status.
    status: Status,
}

impl Summary {
    /// Create a new [`Download`] [`Summary`].
    pub fn new(download: Download, size: u64, resumed_from: u64, attempts: u32) -> Self {
        Self {
            download,
            size,
            resumed_from,
            attempts,
            status: Status::Success,
        }
    }

    /// Attach a status to a [`Download`] [`Summary`].
    pub fn with_status(self, status: Status) -> Self {
        Self { status, ..self }
    }

    /// Mark the summary as failed with a message.
    pub fn fail(self, msg: impl std::fmt::Display) -> Self {
        self.with_status(Status::Fail(msg.to_string()))
    }

    /// Mark the summary as skipped with a message.
    pub fn skip(self, msg: impl std::fmt::Display) -> Self {
        self.with_status(Status::Skipped(msg.to_string()))
    }

    /// Get a reference to the summary's download.
    pub fn download(&self) -> &Download {
        &self.download
    }

    /// Get the number of bytes fetched by the final attempt.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get the offset the final attempt resumed from, `0` for a full fetch.
    pub fn resumed_from(&self) -> u64 {
        self.resumed_from
    }

    /// Get the number of attempts made.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Get a reference to the summary's status.
    pub fn status(&self) -> &Status {
        &self.status
    }
}
