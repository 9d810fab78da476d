//! Progress module containing aggregation and rendering of batch progress.
//!
//! # Overview
//!
//! - `aggregator` - Sole owner of the cumulative byte counts; samples them on a
//!   fixed tick and publishes fraction and speed streams
//! - `display` - Indicatif bar drawn from those streams, used by the CLI
//!
//! # Examples
//!
//! ```rust
//! use downpour::progress::{ProgressAggregator, ProgressEvent, ProgressPublisher};
//! use std::time::Duration;
//!
//! let publisher = ProgressPublisher::new();
//! let fractions = publisher.subscribe_fraction();
//!
//! let mut aggregator = ProgressAggregator::new(Some(2_000), Duration::from_secs(1))
//!     .with_publisher(Some(publisher));
//! aggregator.record(ProgressEvent::Kept(300));
//! aggregator.record(ProgressEvent::Received(200));
//! assert_eq!(aggregator.sample().fraction, Some(0.25));
//! ```

pub mod aggregator;
pub mod display;

pub use aggregator::{ProgressAggregator, ProgressEvent, ProgressPublisher, ProgressSample};
pub use display::ProgressDisplay;
