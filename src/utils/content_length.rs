//! Header parsing utilities.
//!
//! Remote size and range support are read straight from the response headers
//! rather than from `Response::content_length`, which reports the size of the
//! body actually received (always empty for a HEAD reply).

use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE};

/// Parse the `Content-Length` header.
///
/// Returns `None` if the header is missing or is not an unsigned integer.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Extract the full resource size from a reply, preferring the total of a
/// `Content-Range` header over `Content-Length`.
///
/// ```rust
/// use downpour::utils::total_length;
/// use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_RANGE};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1"));
/// assert_eq!(total_length(&headers), Some(1));
///
/// headers.insert(CONTENT_RANGE, HeaderValue::from_static("bytes 0-0/230917262"));
/// assert_eq!(total_length(&headers), Some(230917262));
/// ```
pub fn total_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_content_range_total)
        .or_else(|| content_length(headers))
}

/// Parse Content-Range header to extract total size.
///
/// Content-Range header format: "bytes start-end/total". An unknown total
/// (`*`) yields `None`.
///
/// ```rust
/// use downpour::utils::parse_content_range_total;
///
/// let total = parse_content_range_total("bytes 0-1023/2048");
/// assert_eq!(total, Some(2048));
/// ```
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    content_range
        .split_once('/')
        .and_then(|(_, size)| size.trim().parse::<u64>().ok())
}

/// Whether the `Accept-Ranges` header advertises byte-range support.
///
/// A missing header or the explicit value `none` means no support.
pub fn accepts_ranges(headers: &HeaderMap) -> bool {
    match headers.get(ACCEPT_RANGES) {
        None => false,
        Some(x) if x == "none" => false,
        Some(_) => true,
    }
}
