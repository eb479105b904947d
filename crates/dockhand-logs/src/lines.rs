//! Line-index reader: head/tail access by signed line index

use std::path::Path;

use dockhand_core::{Error, Result};

/// Read `num_lines` lines starting at `start_line`.
///
/// A negative `start_line` counts from the end of the file (`-N` means the
/// Nth line from the end), clamped to the first line. Reads the whole file;
/// log files here are bounded by the writer's rotation policy, so a reverse
/// chunk reader has not been worth its complexity.
pub fn read_lines(path: &Path, start_line: i64, num_lines: i64) -> Result<Vec<String>> {
    if num_lines <= 0 {
        return Err(Error::InvalidLineCount(num_lines));
    }

    let content = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&content);

    let mut all: Vec<&str> = text.split('\n').collect();
    // a trailing newline yields one empty trailing segment, not a line
    if all.last() == Some(&"") {
        all.pop();
    }

    let count = all.len() as i64;
    let begin = if start_line < 0 {
        (count + start_line).max(0)
    } else {
        start_line.min(count)
    } as usize;
    let take = num_lines as usize;

    Ok(all
        .into_iter()
        .skip(begin)
        .take(take)
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn numbered_file(dir: &TempDir, n: usize) -> std::path::PathBuf {
        let path = dir.path().join("numbered.log");
        let mut f = File::create(&path).unwrap();
        for i in 0..n {
            writeln!(f, "line {}", i).unwrap();
        }
        path
    }

    #[test]
    fn test_head() {
        let dir = TempDir::new().unwrap();
        let path = numbered_file(&dir, 10);

        let lines = read_lines(&path, 0, 3).unwrap();
        assert_eq!(lines, vec!["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn test_middle() {
        let dir = TempDir::new().unwrap();
        let path = numbered_file(&dir, 10);

        let lines = read_lines(&path, 4, 2).unwrap();
        assert_eq!(lines, vec!["line 4", "line 5"]);
    }

    #[test]
    fn test_negative_index_tail() {
        let dir = TempDir::new().unwrap();
        let path = numbered_file(&dir, 10);

        let lines = read_lines(&path, -2, 2).unwrap();
        assert_eq!(lines, vec!["line 8", "line 9"]);
    }

    #[test]
    fn test_negative_index_clamped_to_start() {
        let dir = TempDir::new().unwrap();
        let path = numbered_file(&dir, 3);

        // asking for the last 100 of a 3-line file returns all 3
        let lines = read_lines(&path, -100, 100).unwrap();
        assert_eq!(lines, vec!["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn test_start_past_end_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = numbered_file(&dir, 3);

        let lines = read_lines(&path, 50, 5).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_num_clamped_to_file() {
        let dir = TempDir::new().unwrap();
        let path = numbered_file(&dir, 5);

        let lines = read_lines(&path, 3, 100).unwrap();
        assert_eq!(lines, vec!["line 3", "line 4"]);
    }

    #[test]
    fn test_non_positive_num_rejected() {
        let dir = TempDir::new().unwrap();
        let path = numbered_file(&dir, 5);

        assert!(matches!(
            read_lines(&path, 0, 0),
            Err(Error::InvalidLineCount(0))
        ));
        assert!(matches!(
            read_lines(&path, 0, -1),
            Err(Error::InvalidLineCount(-1))
        ));
    }

    #[test]
    fn test_no_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.log");
        File::create(&path)
            .unwrap()
            .write_all(b"first\nsecond")
            .unwrap();

        let lines = read_lines(&path, -1, 1).unwrap();
        assert_eq!(lines, vec!["second"]);
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.log");
        File::create(&path).unwrap();

        let lines = read_lines(&path, 0, 10).unwrap();
        assert!(lines.is_empty());
    }
}
