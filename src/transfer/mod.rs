//! Per-file transfer protocol.
//!
//! - [`copy`] - Chunked byte copy that stops at the next chunk once cancelled
//! - [`resume`] - Where to restart a partially downloaded file
//! - [`transfer`] - Opening the destination, the (ranged) GET, and the copy

pub mod copy;
pub mod resume;
pub mod transfer;

pub use copy::{copy_cancellable, DEFAULT_BUFFER_SIZE};
pub use resume::{plan, resume_offset, should_resume, ResumePlan};
pub use transfer::{Transfer, TransferReport};
