//! Download requests.
//!
//! A [`Download`] pairs a remote URL with the local path the body is written
//! to. Batches are plain slices of requests; their order only decides the
//! order in which transfers are admitted.
//!
//! # Examples
//!
//! ```rust
//! use downpour::download::Download;
//! use std::convert::TryFrom;
//!
//! // The file name is derived from the last URL path segment.
//! let download = Download::try_from("https://example.com/file.zip")?;
//! assert_eq!(download.path.to_str(), Some("file.zip"));
//!
//! // Or place it in a directory.
//! let download = download.in_directory("downloads");
//! assert_eq!(download.path.to_str(), Some("downloads/file.zip"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::Error;

use reqwest::Url;
use std::convert::TryFrom;
use std::path::{Path, PathBuf};

/// Represents a file to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// URL of the file to download.
    pub url: Url,
    /// Local path the file is written to.
    pub path: PathBuf,
}

impl Download {
    /// Creates a new [`Download`] writing `url` to `path`.
    ///
    /// When using the [`Download::try_from`] method, the file name is
    /// automatically extracted from the URL.
    pub fn new(url: &Url, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.clone(),
            path: path.into(),
        }
    }

    /// Moves the destination into `directory`, keeping its file name.
    pub fn in_directory(self, directory: impl AsRef<Path>) -> Self {
        let path = directory.as_ref().join(&self.path);
        Self { path, ..self }
    }

    /// The file name component of the destination, if any.
    pub fn filename(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

impl TryFrom<&Url> for Download {
    type Error = crate::error::Error;

    fn try_from(value: &Url) -> Result<Self, Self::Error> {
        value
            .path_segments()
            .ok_or_else(|| {
                Error::InvalidUrl(format!(
                    "The url \"{}\" does not contain a valid path",
                    value
                ))
            })?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .map(|filename| Download {
                url: value.clone(),
                path: PathBuf::from(
                    form_urlencoded::parse(filename.as_bytes())
                        .map(|(key, val)| [key, val].concat())
                        .collect::<String>(),
                ),
            })
            .ok_or_else(|| {
                Error::InvalidUrl(format!("The url \"{}\" does not contain a filename", value))
            })
    }
}

impl TryFrom<&str> for Download {
    type Error = crate::error::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value)
            .map_err(|e| {
                Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", value, e))
            })
            .and_then(|u| Download::try_from(&u))
    }
}
