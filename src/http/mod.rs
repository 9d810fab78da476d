//! HTTP module containing client setup and metadata probing.
//!
//! - [`client`] - HTTP client creation and middleware configuration
//! - [`probe`] - Size and range-support discovery before a transfer
//!
//! # Examples
//!
//! ```rust,no_run
//! use downpour::http::{create_http_client, probe, HttpClientConfig, ProbeMethod};
//! use reqwest::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! let url = Url::parse("https://example.com/file.zip")?;
//! let metadata = probe(&client, &url, ProbeMethod::Head).await?;
//! println!("{:?} bytes, resumable: {}", metadata.content_length, metadata.supports_range);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod probe;

pub use client::{create_http_client, HttpClientConfig};
pub use probe::{probe, total_size, ProbeMethod, RemoteMetadata};
