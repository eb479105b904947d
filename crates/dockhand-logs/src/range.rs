//! Time-range slice reader
//!
//! Converts an inclusive `[from, to]` instant range to a byte slice via the
//! binary search, materializes it in one read, then filters and paginates.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use dockhand_core::{Error, Result, SearchResult};

use crate::search::{find_offset_by_time, SearchMode};
use crate::timestamp::TimestampCodec;

/// Read all lines whose timestamp lies in `[from, to]`, apply the substring
/// filter, and paginate with `limit`/`offset`.
///
/// Continuation lines travel with their preceding timestamped line. The
/// slice is bounded by `cap` bytes; larger ranges fail with
/// [`Error::RangeTooLarge`] before any allocation so callers can narrow the
/// window and re-query.
#[allow(clippy::too_many_arguments)]
pub fn read_range(
    path: &Path,
    codec: TimestampCodec,
    from: Option<i64>,
    to: Option<i64>,
    limit: usize,
    offset: usize,
    substring: &str,
    cap: u64,
) -> Result<SearchResult> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    let start_offset = match from {
        Some(t) => find_offset_by_time(&mut file, size, codec, t, SearchMode::LowerBound, 0)?,
        None => 0,
    };
    // `to` is inclusive at millisecond resolution: the end offset is the
    // first line at or after to + 1ms
    let end_offset = match to {
        Some(t) => find_offset_by_time(
            &mut file,
            size,
            codec,
            t + 1,
            SearchMode::LowerBound,
            start_offset,
        )?,
        None => size,
    };

    if end_offset <= start_offset {
        return Ok(SearchResult::empty());
    }

    let span = end_offset - start_offset;
    if span > cap {
        return Err(Error::RangeTooLarge { bytes: span, cap });
    }

    let mut buf = vec![0u8; span as usize];
    file.seek(SeekFrom::Start(start_offset))?;
    file.read_exact(&mut buf)?;

    let text = String::from_utf8_lossy(&buf);
    let retained: Vec<&str> = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .filter(|line| substring.is_empty() || line.contains(substring))
        .collect();

    let total = retained.len();
    let lines = retained
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(str::to_string)
        .collect();

    Ok(SearchResult { lines, total })
}
