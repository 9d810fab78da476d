//! Terminal rendering of the batch progress streams.
//!
//! This module provides the [`ProgressDisplay`] struct that draws a single
//! indicatif bar from the fraction and speed streams of a
//! [`Downloader`](crate::Downloader).
//!
//! # Examples
//!
//! ```rust,no_run
//! use downpour::progress::ProgressDisplay;
//! use downpour::{Download, DownloaderBuilder};
//!
//! # async fn example() -> Result<(), downpour::Error> {
//! let downloader = DownloaderBuilder::new().detailed_progress(true).build()?;
//! let fractions = downloader.progress().expect("detailed progress is enabled");
//! let speeds = downloader.speed().expect("detailed progress is enabled");
//!
//! let display = ProgressDisplay::new(downloader.progress_interval());
//! let rendering = tokio::spawn(display.run(fractions, speeds));
//!
//! downloader
//!     .download(&Download::try_from("https://example.com/file.zip")?)
//!     .await?;
//! rendering.await.ok();
//! # Ok(())
//! # }
//! ```

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::{error::RecvError, Receiver};

/// Draws the batch progress as one bar with a throughput message.
pub struct ProgressDisplay {
    bar: ProgressBar,
    interval: Duration,
    clear: bool,
}

impl ProgressDisplay {
    /// Template representing the bar, its percentage and the current speed.
    ///
    /// `███████████████████████▋                 59% 12.40 MiB/s`
    pub const TEMPLATE: &'static str = "{bar:40.blue} {percent:>3}% {msg}";
    /// Use fine blocks as progress characters: `"█▉▊▋▌▍▎▏  "`.
    pub const CHARS_FINE: &'static str = "█▉▊▋▌▍▎▏  ";
    /// Number of bar positions a fraction of `1.0` maps to.
    pub const SCALE: u64 = 1000;

    /// Creates a display drawing to stderr.
    ///
    /// `interval` is the sample interval of the downloader, used to turn the
    /// per-interval byte counts of the speed stream into bytes per second.
    pub fn new(interval: Duration) -> Self {
        let style = match ProgressStyle::default_bar().template(Self::TEMPLATE) {
            Ok(style) => style.progress_chars(Self::CHARS_FINE),
            Err(_) => ProgressStyle::default_bar(),
        };
        Self {
            bar: ProgressBar::new(Self::SCALE).with_style(style),
            interval,
            clear: false,
        }
    }

    /// Creates a display that tracks state without drawing anything.
    pub fn hidden(interval: Duration) -> Self {
        let display = Self::new(interval);
        display.bar.set_draw_target(ProgressDrawTarget::hidden());
        display
    }

    /// Set to `true` to clear the bar once the streams end.
    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// Current bar position, between `0` and [`Self::SCALE`].
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    fn set_fraction(&self, fraction: f64) {
        let position = (fraction.clamp(0.0, 1.0) * Self::SCALE as f64).round() as u64;
        self.bar.set_position(position);
    }

    fn set_speed(&self, bytes: u64) {
        let secs = self.interval.as_secs_f64();
        let per_sec = if secs > 0.0 {
            (bytes as f64 / secs) as u64
        } else {
            bytes
        };
        self.bar.set_message(format!("{}/s", HumanBytes(per_sec)));
    }

    /// Renders samples until both streams are closed, then finishes the bar.
    ///
    /// Lagging behind only skips samples.
    pub async fn run(self, mut fractions: Receiver<f64>, mut speeds: Receiver<u64>) -> Self {
        let mut fractions_open = true;
        let mut speeds_open = true;

        while fractions_open || speeds_open {
            tokio::select! {
                res = fractions.recv(), if fractions_open => match res {
                    Ok(fraction) => self.set_fraction(fraction),
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => fractions_open = false,
                },
                res = speeds.recv(), if speeds_open => match res {
                    Ok(bytes) => self.set_speed(bytes),
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => speeds_open = false,
                },
            }
        }

        if self.clear {
            self.bar.finish_and_clear();
        } else {
            self.bar.finish();
        }
        self
    }
}
