//! Bounded-window line locator
//!
//! Maps an arbitrary byte offset to the start of the next complete line and
//! extracts that line's leading timestamp, reading only small windows around
//! the probe point. This is the primitive the time→offset binary search
//! pivots on.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use dockhand_core::constants::{LOCATOR_WINDOW, TIMESTAMP_WINDOW};

use crate::timestamp::TimestampCodec;

/// A located line start and its leading timestamp, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// Smallest offset `q >= p` with `q == 0` or a newline at `q - 1`.
    /// Equal to the file size when no line starts at or after `p`.
    pub line_start: u64,
    pub timestamp: Option<i64>,
}

/// Window-read line locator over an open file handle
pub struct LineLocator<'a> {
    file: &'a mut File,
    size: u64,
    codec: TimestampCodec,
}

impl<'a> LineLocator<'a> {
    pub fn new(file: &'a mut File, size: u64, codec: TimestampCodec) -> Self {
        Self { file, size, codec }
    }

    /// Locate the first line starting at or after `p`.
    pub fn locate(&mut self, p: u64) -> std::io::Result<Located> {
        let line_start = self.find_line_start(p)?;
        let timestamp = if line_start < self.size {
            self.timestamp_at(line_start)?
        } else {
            None
        };
        Ok(Located {
            line_start,
            timestamp,
        })
    }

    /// Scan forward line-by-line from `from` for a timestamped line,
    /// stopping at `ceiling`.
    ///
    /// Recovers binary-search pivots that land on continuation lines; the
    /// ceiling keeps it from degenerating into a full linear scan.
    pub fn scan_forward_for_timestamp(
        &mut self,
        from: u64,
        ceiling: u64,
    ) -> std::io::Result<Option<(i64, u64)>> {
        let mut probe = from;
        while probe < ceiling {
            let located = self.locate(probe)?;
            if located.line_start >= ceiling {
                return Ok(None);
            }
            if let Some(ts) = located.timestamp {
                return Ok(Some((ts, located.line_start)));
            }
            // step past this continuation line
            probe = located.line_start + 1;
        }
        Ok(None)
    }

    /// Smallest `q >= p` such that `q == 0` or byte `q-1` is a newline.
    fn find_line_start(&mut self, p: u64) -> std::io::Result<u64> {
        if p == 0 {
            return Ok(0);
        }
        if p >= self.size {
            return Ok(self.size);
        }

        // Look for the first newline at or after p-1; the line starts just
        // past it. The first pass reads a double window so a typical line
        // resolves in one read.
        let mut scan = p - 1;
        let mut window = LOCATOR_WINDOW * 2;
        let mut buf = vec![0u8; window];

        loop {
            let want = (window as u64).min(self.size - scan) as usize;
            let chunk = &mut buf[..want];
            self.file.seek(SeekFrom::Start(scan))?;
            self.file.read_exact(chunk)?;

            if let Some(i) = chunk.iter().position(|&b| b == b'\n') {
                return Ok(scan + i as u64 + 1);
            }

            scan += want as u64;
            if scan >= self.size {
                return Ok(self.size);
            }
            window = LOCATOR_WINDOW;
        }
    }

    /// Parse the leading timestamp of the line starting at `line_start`.
    fn timestamp_at(&mut self, line_start: u64) -> std::io::Result<Option<i64>> {
        let want = (TIMESTAMP_WINDOW as u64).min(self.size - line_start) as usize;
        let mut buf = [0u8; TIMESTAMP_WINDOW];
        self.file.seek(SeekFrom::Start(line_start))?;
        self.file.read_exact(&mut buf[..want])?;

        // the window may cut the line short; the token never exceeds it
        let header = match buf[..want].iter().position(|&b| b == b'\n') {
            Some(nl) => &buf[..nl],
            None => &buf[..want],
        };
        Ok(self.codec.parse_leading(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use std::io::Write;
    use tempfile::TempDir;

    fn utc() -> TimestampCodec {
        TimestampCodec::fixed(FixedOffset::east_opt(0).unwrap())
    }

    fn write_file(dir: &TempDir, content: &str) -> (File, u64) {
        let path = dir.path().join("test.log");
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        let file = File::open(&path).unwrap();
        let size = file.metadata().unwrap().len();
        (file, size)
    }

    #[test]
    fn test_locate_at_zero() {
        let dir = TempDir::new().unwrap();
        let (mut file, size) = write_file(&dir, "11/20/2025, 11:00:00 PM hello\nplain\n");
        let mut locator = LineLocator::new(&mut file, size, utc());

        let located = locator.locate(0).unwrap();
        assert_eq!(located.line_start, 0);
        assert!(located.timestamp.is_some());
    }

    #[test]
    fn test_locate_mid_line_snaps_to_next() {
        let dir = TempDir::new().unwrap();
        let content = "first line\nsecond line\n";
        let (mut file, size) = write_file(&dir, content);
        let mut locator = LineLocator::new(&mut file, size, utc());

        // offset 3 is inside "first line"; next line starts at 11
        let located = locator.locate(3).unwrap();
        assert_eq!(located.line_start, 11);
        assert_eq!(located.timestamp, None);
    }

    #[test]
    fn test_locate_exactly_on_line_start() {
        let dir = TempDir::new().unwrap();
        let content = "first\n11/20/2025, 1:00:00 AM second\n";
        let (mut file, size) = write_file(&dir, content);
        let mut locator = LineLocator::new(&mut file, size, utc());

        let located = locator.locate(6).unwrap();
        assert_eq!(located.line_start, 6);
        assert!(located.timestamp.is_some());
    }

    #[test]
    fn test_locate_past_last_newline() {
        let dir = TempDir::new().unwrap();
        let content = "only line no trailing newline";
        let (mut file, size) = write_file(&dir, content);
        let mut locator = LineLocator::new(&mut file, size, utc());

        let located = locator.locate(5).unwrap();
        assert_eq!(located.line_start, size);
        assert_eq!(located.timestamp, None);
    }

    #[test]
    fn test_locate_spanning_long_line() {
        let dir = TempDir::new().unwrap();
        // one line far longer than the locator window
        let long = "x".repeat(LOCATOR_WINDOW * 5);
        let content = format!("{}\n11/20/2025, 2:00:00 AM after\n", long);
        let (mut file, size) = write_file(&dir, &content);
        let mut locator = LineLocator::new(&mut file, size, utc());

        let located = locator.locate(10).unwrap();
        assert_eq!(located.line_start, long.len() as u64 + 1);
        assert!(located.timestamp.is_some());
    }

    #[test]
    fn test_scan_forward_skips_continuations() {
        let dir = TempDir::new().unwrap();
        let content = "\
11/20/2025, 11:00:00 PM head
  continuation one
  continuation two
11/20/2025, 11:30:00 PM next
";
        let (mut file, size) = write_file(&dir, content);
        let mut locator = LineLocator::new(&mut file, size, utc());

        // start inside the first continuation line
        let first_cont = content.find("  continuation one").unwrap() as u64;
        let (ts, at) = locator
            .scan_forward_for_timestamp(first_cont, size)
            .unwrap()
            .unwrap();
        assert_eq!(at, content.find("11/20/2025, 11:30:00").unwrap() as u64);
        let expected = utc().parse_leading(b"11/20/2025, 11:30:00 PM x").unwrap();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_scan_forward_respects_ceiling() {
        let dir = TempDir::new().unwrap();
        let content = "  continuation\n11/20/2025, 11:30:00 PM late\n";
        let (mut file, size) = write_file(&dir, content);
        let mut locator = LineLocator::new(&mut file, size, utc());

        // ceiling before the timestamped line begins
        let result = locator.scan_forward_for_timestamp(0, 5).unwrap();
        assert_eq!(result, None);
        // full range finds it
        assert!(locator
            .scan_forward_for_timestamp(0, size)
            .unwrap()
            .is_some());
    }
}
