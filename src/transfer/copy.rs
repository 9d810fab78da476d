//! Cancellable byte copy.
//!
//! [`tokio::io::copy`] cannot be interrupted short of dropping its future,
//! and it gives no hook to observe bytes as they arrive. This copy loop checks
//! the cancellation token before every read and reports each chunk through a
//! callback before writing it out.

use crate::error::{Error, Result};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Default size of the copy buffer, 32 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Copies `source` into `sink` in chunks of at most `buffer_size` bytes.
///
/// `on_read` receives the length of every non-empty chunk as soon as it has
/// been read, before it is written. Returns the number of bytes written when
/// `source` reaches end of input.
///
/// # Errors
///
/// - [`Error::Cancelled`] when `cancel` fires between chunks or while a read
///   is pending
/// - [`Error::ShortWrite`] when the sink accepts fewer bytes than a chunk
/// - [`Error::IOError`] for any other read or write failure
pub async fn copy_cancellable<R, W, F>(
    source: &mut R,
    sink: &mut W,
    buffer_size: usize,
    cancel: &CancellationToken,
    mut on_read: F,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
    F: FnMut(usize),
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut written: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let nr = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            read = source.read(&mut buf) => read?,
        };
        if nr == 0 {
            return Ok(written);
        }
        on_read(nr);

        let nw = sink.write(&buf[..nr]).await?;
        written += nw as u64;
        if nw != nr {
            return Err(Error::ShortWrite {
                expected: nr,
                written: nw,
            });
        }
    }
}
