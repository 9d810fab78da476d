//! Download requests and their outcomes.
//!
//! - [`download`] - The [`Download`] request: a URL and a destination path
//! - [`summary`] - Per-transfer [`Summary`] and [`Status`] handed to callbacks
//!
//! # Examples
//!
//! ```rust
//! use downpour::download::{Download, Status, Summary};
//! use std::convert::TryFrom;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let download = Download::try_from("https://example.com/file.zip")?;
//! let summary = Summary::new(download, 2048, 0, 1);
//!
//! match summary.status() {
//!     Status::Success => println!("Downloaded {} bytes", summary.size()),
//!     Status::Fail(msg) => println!("Download failed: {}", msg),
//!     _ => {}
//! }
//! # Ok(())
//! # }
//! ```

pub mod download;
pub mod summary;

pub use download::Download;
pub use summary::{Status, Summary};
