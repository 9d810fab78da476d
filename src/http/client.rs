//! HTTP client setup and middleware configuration.
//!
//! The client is built once per [`Downloader`](crate::Downloader) and shared by
//! every probe and transfer of its batch.
//!
//! - **Tracing**: every request is traced through `reqwest-tracing`
//! - **Proxy Support**: optional HTTP/HTTPS/SOCKS5 proxy
//! - **Timeout**: the batch deadline doubles as a per-request ceiling
//! - **Custom Headers**: default headers applied to all requests
//!
//! Retries are not handled here: a failed transfer is re-run as a whole by
//! the downloader so that it can resume from what is already on disk.
//!
//! ```rust
//! use downpour::http::{create_http_client, HttpClientConfig};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig {
//!     timeout: Some(Duration::from_secs(30)),
//!     ..HttpClientConfig::default()
//! };
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```

use reqwest::{header::HeaderMap, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// Configuration for HTTP client setup.
#[derive(Debug, Clone, Default)]
pub struct HttpClientConfig {
    /// Optional proxy configuration.
    pub proxy: Option<Proxy>,
    /// Default headers to include with all requests.
    pub headers: Option<HeaderMap>,
    /// Upper bound for any single request, body included.
    pub timeout: Option<Duration>,
}

/// Creates an HTTP client with middleware configuration.
///
/// # Errors
///
/// Fails when the underlying reqwest client cannot be built, for instance
/// because the TLS backend cannot be initialised.
pub fn create_http_client(
    config: HttpClientConfig,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let mut inner_client_builder = reqwest::Client::builder();

    if let Some(proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(proxy);
    }

    if let Some(headers) = config.headers {
        inner_client_builder = inner_client_builder.default_headers(headers);
    }

    if let Some(timeout) = config.timeout {
        inner_client_builder = inner_client_builder.timeout(timeout);
    }

    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        .build();

    Ok(client)
}
