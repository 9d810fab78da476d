//! One resumable file transfer.

use super::copy::{copy_cancellable, DEFAULT_BUFFER_SIZE};
use super::resume::{self, range_header, ResumePlan};
use crate::download::Download;
use crate::error::{Error, Result};
use crate::http::RemoteMetadata;
use crate::progress::ProgressEvent;

use futures::TryStreamExt;
use reqwest::{header::RANGE, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncSeekExt, AsyncWriteExt},
    sync::mpsc::UnboundedSender,
};
use tokio_util::{io::StreamReader, sync::CancellationToken};
use tracing::{debug, warn};

/// What a finished transfer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Bytes fetched over the network and written.
    pub bytes: u64,
    /// Offset the body was appended at, `0` for a full fetch.
    pub resumed_from: u64,
    /// Whether the destination was already complete and nothing was fetched.
    pub skipped: bool,
}

/// Downloads one [`Download`] to disk, resuming a partial file when the
/// server and the file size allow it.
#[derive(Debug)]
pub struct Transfer<'a> {
    client: &'a ClientWithMiddleware,
    download: &'a Download,
    metadata: RemoteMetadata,
    resumable: bool,
    buffer_size: usize,
}

impl<'a> Transfer<'a> {
    /// Prepares a transfer of `download` whose remote side was probed as
    /// `metadata`.
    pub fn new(
        client: &'a ClientWithMiddleware,
        download: &'a Download,
        metadata: RemoteMetadata,
    ) -> Self {
        Self {
            client,
            download,
            metadata,
            resumable: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Allow or forbid resuming an existing destination file.
    pub fn resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }

    /// Set the copy buffer size, which is also the resume granularity.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Runs the transfer to completion, cancellation or failure.
    ///
    /// Progress goes to `events`: the part of the destination that is kept
    /// (all of it when the file is already complete), then the byte count of
    /// every chunk received, sent before the chunk is written. A failed
    /// attempt rewinds what it reported, since a retry counts the file
    /// again. The destination file and the response body are released on
    /// every exit path.
    pub async fn run(
        &self,
        events: &UnboundedSender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> Result<TransferReport> {
        let mut tally = Tally::new(events);
        let res = self.attempt(&mut tally, cancel).await;
        if matches!(&res, Err(e) if !e.is_cancellation()) {
            tally.rewind();
        }
        res
    }

    async fn attempt(
        &self,
        tally: &mut Tally<'_>,
        cancel: &CancellationToken,
    ) -> Result<TransferReport> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let path = self.download.path.as_path();
        let on_disk = existing_size(path).await?;
        let plan = resume::plan(
            on_disk,
            self.metadata.content_length,
            self.resumable && self.metadata.supports_range,
            self.buffer_size,
        );

        if plan == ResumePlan::Complete {
            debug!("{} is already fully downloaded", path.display());
            let size = on_disk.unwrap_or_default();
            tally.kept(size);
            return Ok(TransferReport {
                bytes: 0,
                resumed_from: size,
                skipped: true,
            });
        }

        let mut offset = plan.offset();
        debug!("Opening destination {:?} at offset {}", path, offset);
        let mut file = open_destination(path, offset).await?;

        debug!("Fetching {}", self.download.url);
        let mut req = self.client.get(self.download.url.clone());
        if let (ResumePlan::Resume { offset }, Some(length)) = (plan, self.metadata.content_length)
        {
            let range = range_header(offset, length);
            debug!("Resume enabled, requesting {}", range);
            req = req.header(RANGE, range);
        }

        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            res = req.send() => res?,
        };
        res.error_for_status_ref()?;

        if offset > 0 && res.status() != StatusCode::PARTIAL_CONTENT {
            warn!(
                "{} ignored the range request ({}), restarting from zero",
                self.download.url,
                res.status()
            );
            file.set_len(0).await?;
            file.seek(SeekFrom::Start(0)).await?;
            offset = 0;
        }
        tally.kept(offset);

        let body = StreamReader::new(res.bytes_stream().map_err(io::Error::other));
        tokio::pin!(body);

        let copied = copy_cancellable(&mut body, &mut file, self.buffer_size, cancel, |n| {
            tally.received(n as u64)
        })
        .await;
        let flushed = file.flush().await;

        let bytes = copied?;
        flushed?;
        debug!("Download file done [{}], {} bytes", self.download.url, bytes);

        Ok(TransferReport {
            bytes,
            resumed_from: offset,
            skipped: false,
        })
    }
}

/// Progress one attempt has reported.
struct Tally<'a> {
    events: &'a UnboundedSender<ProgressEvent>,
    counted: u64,
}

impl<'a> Tally<'a> {
    fn new(events: &'a UnboundedSender<ProgressEvent>) -> Self {
        Self { events, counted: 0 }
    }

    fn kept(&mut self, bytes: u64) {
        if bytes > 0 {
            self.counted += bytes;
            self.send(ProgressEvent::Kept(bytes));
        }
    }

    fn received(&mut self, bytes: u64) {
        self.counted += bytes;
        self.send(ProgressEvent::Received(bytes));
    }

    fn rewind(&mut self) {
        if self.counted > 0 {
            self.send(ProgressEvent::Rewound(self.counted));
            self.counted = 0;
        }
    }

    fn send(&self, event: ProgressEvent) {
        // The aggregator may already be gone during shutdown.
        let _ = self.events.send(event);
    }
}

/// Size of the file at `path`, `None` if there is no such file.
async fn existing_size(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path).await {
        Ok(m) if m.is_dir() => Err(io::Error::other(format!(
            "{} is a directory, not a file",
            path.display()
        ))
        .into()),
        Ok(m) => Ok(Some(m.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Opens the destination positioned at `offset`, discarding anything after
/// it. An offset of zero creates or truncates the file.
async fn open_destination(path: &Path, offset: u64) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    if offset == 0 {
        return Ok(File::create(path).await?);
    }

    let mut file = OpenOptions::new().read(true).write(true).open(path).await?;
    file.set_len(offset).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    Ok(file)
}
