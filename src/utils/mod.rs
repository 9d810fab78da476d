//! Shared utility functions.
//!
//! - [`content_length`] - Size and range-support extraction from HTTP headers

pub mod content_length;

// Re-export commonly used utilities
pub use content_length::{accepts_ranges, content_length, parse_content_range_total, total_length};
