//! Remote metadata probing.
//!
//! Before any body byte is fetched, every URL of a batch is probed once to
//! learn its size and whether it accepts byte-range requests. The size feeds
//! the aggregate progress fraction, range support decides whether a partial
//! file on disk can be resumed.

use crate::error::Result;
use crate::utils::content_length::{accepts_ranges, content_length, total_length};

use reqwest::{header::RANGE, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;

/// How the remote size is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMethod {
    /// A `HEAD` request, reading `Content-Length` and `Accept-Ranges`.
    #[default]
    Head,
    /// A `GET` for the first byte only (`Range: bytes=0-0`), reading the total
    /// from `Content-Range`.
    ///
    /// Useful for servers that answer HEAD without an accurate
    /// `Content-Length`.
    Range,
}

/// What a probe learned about a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteMetadata {
    /// Full size of the resource, if the server disclosed it.
    pub content_length: Option<u64>,
    /// Whether the server accepts `Range` requests for this resource.
    pub supports_range: bool,
}

impl RemoteMetadata {
    /// Metadata for a URL whose probe failed: size unknown, no resume.
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Probes `url` for its size and range support.
///
/// # Errors
///
/// Network failures and non-success statuses are returned as errors; the
/// caller decides whether that is fatal.
pub async fn probe(
    client: &ClientWithMiddleware,
    url: &Url,
    method: ProbeMethod,
) -> Result<RemoteMetadata> {
    match method {
        ProbeMethod::Head => {
            let res = client.head(url.clone()).send().await?;
            res.error_for_status_ref()?;
            let headers = res.headers();
            let metadata = RemoteMetadata {
                content_length: content_length(headers),
                supports_range: accepts_ranges(headers),
            };
            debug!(%url, ?metadata, "HEAD probe");
            Ok(metadata)
        }
        ProbeMethod::Range => {
            let res = client
                .get(url.clone())
                .header(RANGE, "bytes=0-0")
                .send()
                .await?;
            res.error_for_status_ref()?;
            let partial = res.status() == StatusCode::PARTIAL_CONTENT;
            let headers = res.headers();
            let metadata = RemoteMetadata {
                content_length: if partial {
                    total_length(headers)
                } else {
                    content_length(headers)
                },
                supports_range: partial,
            };
            debug!(%url, ?metadata, "Range probe");
            Ok(metadata)
        }
    }
}

/// Sums the sizes of a batch.
///
/// One unknown size makes the whole total unknown, since the aggregate
/// fraction needs every size.
pub fn total_size<'a>(metadata: impl IntoIterator<Item = &'a RemoteMetadata>) -> Option<u64> {
    metadata
        .into_iter()
        .map(|m| m.content_length)
        .sum::<Option<u64>>()
}
