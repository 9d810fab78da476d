//! Resume planning.
//!
//! A process killed mid-download may leave a torn final chunk on disk, so a
//! resume never trusts the tail of a partial file: the offset is rounded down
//! to a buffer boundary and the last partial chunk is fetched again. Small
//! files are never resumed at all.

/// A file is only resumed when the remote resource is at least this many
/// copy buffers long.
pub const MIN_RESUME_BUFFERS: u64 = 1000;

/// What to do with a destination before fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Create or truncate the destination and fetch the whole body.
    Fresh,
    /// Truncate the destination to `offset` and fetch the rest.
    Resume {
        /// First byte to request.
        offset: u64,
    },
    /// The destination already holds the full resource.
    Complete,
}

impl ResumePlan {
    /// Offset the transfer starts writing at.
    pub fn offset(&self) -> u64 {
        match self {
            ResumePlan::Resume { offset } => *offset,
            ResumePlan::Fresh | ResumePlan::Complete => 0,
        }
    }
}

/// Whether a resource of `content_length` bytes is large enough to resume.
pub fn should_resume(content_length: u64, buffer_size: usize) -> bool {
    content_length >= (buffer_size as u64).saturating_mul(MIN_RESUME_BUFFERS)
}

/// Rounds `on_disk` down to the nearest multiple of `buffer_size`.
pub fn resume_offset(on_disk: u64, buffer_size: usize) -> u64 {
    let buffer_size = buffer_size.max(1) as u64;
    on_disk - on_disk % buffer_size
}

/// Decides how to treat a destination.
///
/// `on_disk` is the size of an existing destination file, `None` when there
/// is none. `resumable` combines the caller's preference with the server's
/// range support.
pub fn plan(
    on_disk: Option<u64>,
    content_length: Option<u64>,
    resumable: bool,
    buffer_size: usize,
) -> ResumePlan {
    let (Some(on_disk), Some(content_length), true) = (on_disk, content_length, resumable) else {
        return ResumePlan::Fresh;
    };

    if on_disk == content_length {
        return ResumePlan::Complete;
    }
    if on_disk > content_length || !should_resume(content_length, buffer_size) {
        return ResumePlan::Fresh;
    }

    match resume_offset(on_disk, buffer_size) {
        0 => ResumePlan::Fresh,
        offset => ResumePlan::Resume { offset },
    }
}

/// The `Range` header value for a resumed request.
///
/// The end is the remote length itself; servers clamp an end past the last
/// byte to the resource size.
pub fn range_header(offset: u64, content_length: u64) -> String {
    format!("bytes={}-{}", offset, content_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIB32: usize = 32 * 1024;
    const BIG: u64 = 64 * 1024 * 1024;

    #[test]
    fn test_resume_offset_rounds_down() {
        let table: &[(u64, usize, u64)] = &[
            (0, KIB32, 0),
            (1, KIB32, 0),
            (32 * 1024 - 1, KIB32, 0),
            (32 * 1024, KIB32, 32 * 1024),
            (32 * 1024 + 1, KIB32, 32 * 1024),
            (100_000, KIB32, 98_304),
            (1_000_000, 1000, 1_000_000),
            (1_000_999, 1000, 1_000_000),
            (7, 3, 6),
        ];
        for &(size, buffer, expected) in table {
            assert_eq!(
                resume_offset(size, buffer),
                expected,
                "file size {size} with buffer {buffer}"
            );
        }
    }

    #[test]
    fn test_should_resume_threshold() {
        assert!(!should_resume(1000 * KIB32 as u64 - 1, KIB32));
        assert!(should_resume(1000 * KIB32 as u64, KIB32));
        assert!(should_resume(BIG, KIB32));
    }

    #[test]
    fn test_plan_without_existing_file() {
        assert_eq!(plan(None, Some(BIG), true, KIB32), ResumePlan::Fresh);
    }

    #[test]
    fn test_plan_resumes_large_partial_file() {
        assert_eq!(
            plan(Some(100_000), Some(BIG), true, KIB32),
            ResumePlan::Resume { offset: 98_304 }
        );
    }

    #[test]
    fn test_plan_refetches_when_not_resumable() {
        assert_eq!(plan(Some(100_000), Some(BIG), false, KIB32), ResumePlan::Fresh);
        assert_eq!(plan(Some(100_000), None, true, KIB32), ResumePlan::Fresh);
    }

    #[test]
    fn test_plan_refetches_small_files() {
        assert_eq!(plan(Some(500), Some(1000), true, KIB32), ResumePlan::Fresh);
    }

    #[test]
    fn test_plan_refetches_partial_first_chunk() {
        assert_eq!(plan(Some(10), Some(BIG), true, KIB32), ResumePlan::Fresh);
    }

    #[test]
    fn test_plan_detects_complete_and_oversized() {
        assert_eq!(plan(Some(BIG), Some(BIG), true, KIB32), ResumePlan::Complete);
        assert_eq!(plan(Some(BIG + 1), Some(BIG), true, KIB32), ResumePlan::Fresh);
    }

    #[test]
    fn test_range_header() {
        assert_eq!(range_header(98_304, 2_000_000), "bytes=98304-2000000");
        assert_eq!(ResumePlan::Resume { offset: 5 }.offset(), 5);
        assert_eq!(ResumePlan::Complete.offset(), 0);
    }
}
