//! Time→offset binary search over file bytes
//!
//! Finds the byte offset of the first line whose timestamp satisfies a
//! predicate, without scanning the file. Relies on timestamps being
//! monotonically non-decreasing in append order; when producers violate
//! that, the result is a best-effort offset whose line satisfies the
//! predicate but may miss earlier matches.

use std::fs::File;

use crate::locate::LineLocator;
use crate::timestamp::TimestampCodec;

/// Boundary flavor of the search predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// First line with timestamp `>= target`
    LowerBound,
    /// First line with timestamp `> target`
    UpperBound,
}

/// Binary search for the smallest line-start offset whose line timestamp
/// satisfies the mode predicate against `target`.
///
/// `min_offset` restricts the search to `[min_offset, size)`; callers pass
/// the lower bound of an enclosing range so the prefix is not re-probed.
/// Returns `size` when no line qualifies.
///
/// Cost is `O(log size)` bounded window reads.
pub fn find_offset_by_time(
    file: &mut File,
    size: u64,
    codec: TimestampCodec,
    target: i64,
    mode: SearchMode,
    min_offset: u64,
) -> std::io::Result<u64> {
    let mut lo = min_offset.min(size);
    let mut hi = size;
    let mut candidate: Option<u64> = None;
    let mut locator = LineLocator::new(file, size, codec);

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let located = locator.locate(mid)?;

        // Pivot fell past the probe window: everything in [mid, hi) is the
        // tail of one line or continuation lines; treat it as "after".
        if located.line_start >= hi {
            hi = mid;
            continue;
        }

        let (ts, pivot_start) = match located.timestamp {
            Some(ts) => (ts, located.line_start),
            None => match locator.scan_forward_for_timestamp(located.line_start, hi)? {
                Some(found) => found,
                None => {
                    hi = mid;
                    continue;
                }
            },
        };

        let satisfied = match mode {
            SearchMode::LowerBound => ts >= target,
            SearchMode::UpperBound => ts > target,
        };

        if satisfied {
            candidate = Some(pivot_start);
            hi = mid;
        } else {
            lo = (mid + 1).max(pivot_start);
        }
    }

    Ok(candidate.unwrap_or(size))
}
