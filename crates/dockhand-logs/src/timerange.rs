//! Time-range metadata with a persistent rotation-aware sidecar cache
//!
//! Each log file gets a `<file>.timecache` JSON sidecar recording the first
//! and last embedded timestamp together with the file identity observed at
//! write time (size, inode, header signature). The identity triple detects
//! every rotation flavor: rename+recreate (inode), truncate-in-place (size
//! shrink), and rewrite-that-grew-back (header signature).

use serde::{Deserialize, Serialize};
use std::fs::{self, File, Metadata};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

use dockhand_core::constants::{
    timecache_path, ACTIVE_LOG_SUFFIX, HEADER_SIG_LEN, HEAD_SCAN_LIMIT, TAIL_SCAN_CHUNK,
    TAIL_SCAN_LIMIT,
};
use dockhand_core::{Result, TimeRange};

use crate::timestamp::TimestampCodec;

/// Persisted sidecar entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    start: Option<i64>,
    end: Option<i64>,
    size: u64,
    inode: u64,
    header_sig: String,
}

/// File identity observed at query time
struct Identity {
    size: u64,
    inode: u64,
    header_sig: String,
}

/// Return the first and last embedded timestamp of a log file.
///
/// Rotated files (names not ending in `.log`) are immutable, so a complete
/// cached entry is returned as-is. For active files the cached `start` is
/// reused while identity holds; `end` is recomputed on every query and the
/// persisted `end` stays null.
pub fn get_time_range(path: &Path, codec: TimestampCodec) -> Result<TimeRange> {
    let identity = observe(path)?;
    let sidecar = timecache_path(path);
    let cached = load_cache(&sidecar);
    let rotated = is_rotated(path);

    if rotated {
        if let Some(entry) = &cached {
            if entry.start.is_some() && entry.end.is_some() {
                return Ok(TimeRange {
                    start: entry.start,
                    end: entry.end,
                });
            }
        }
        let start = scan_start(path, codec)?;
        let end = scan_end(path, codec, identity.size)?;
        store_cache(
            &sidecar,
            &CacheEntry {
                start,
                end,
                size: identity.size,
                inode: identity.inode,
                header_sig: identity.header_sig,
            },
        );
        return Ok(TimeRange { start, end });
    }

    let valid = cached.as_ref().is_some_and(|entry| {
        entry.inode == identity.inode
            && identity.size >= entry.size
            && entry.header_sig == identity.header_sig
    });

    let (start, start_from_cache) = if valid {
        (cached.as_ref().and_then(|e| e.start), true)
    } else {
        if cached.is_some() {
            debug!("time cache invalidated for {}", path.display());
        }
        (scan_start(path, codec)?, false)
    };
    let end = scan_end(path, codec, identity.size)?;

    // skip the write only when nothing observable changed
    let unchanged =
        start_from_cache && cached.as_ref().is_some_and(|e| e.size == identity.size);
    if !unchanged {
        store_cache(
            &sidecar,
            &CacheEntry {
                start,
                end: None,
                size: identity.size,
                inode: identity.inode,
                header_sig: identity.header_sig,
            },
        );
    }

    Ok(TimeRange { start, end })
}

/// Whether the name marks a closed rotation snapshot
fn is_rotated(path: &Path) -> bool {
    !path
        .file_name()
        .map(|n| n.to_string_lossy().ends_with(ACTIVE_LOG_SUFFIX))
        .unwrap_or(false)
}

fn observe(path: &Path) -> Result<Identity> {
    let mut file = File::open(path)?;
    let meta = file.metadata()?;
    let size = meta.len();

    let want = (HEADER_SIG_LEN as u64).min(size) as usize;
    let mut head = [0u8; HEADER_SIG_LEN];
    file.read_exact(&mut head[..want])?;

    Ok(Identity {
        size,
        inode: inode_of(&meta),
        header_sig: hex_sig(&head[..want]),
    })
}

#[cfg(unix)]
fn inode_of(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn inode_of(_meta: &Metadata) -> u64 {
    0
}

fn hex_sig(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

fn load_cache(sidecar: &Path) -> Option<CacheEntry> {
    let raw = fs::read(sidecar).ok()?;
    match serde_json::from_slice(&raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            debug!("discarding corrupt time cache {}: {}", sidecar.display(), e);
            None
        }
    }
}

/// Write the sidecar atomically: temp file in the same directory, then
/// rename. Concurrent writers resolve last-writer-wins at the rename.
/// Persist failures degrade to recomputing next query.
fn store_cache(sidecar: &Path, entry: &CacheEntry) {
    let tmp = sidecar.with_extension("timecache.tmp");
    let result = serde_json::to_vec(entry)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        .and_then(|bytes| fs::write(&tmp, bytes))
        .and_then(|_| fs::rename(&tmp, sidecar));
    if let Err(e) = result {
        warn!("failed to persist time cache {}: {}", sidecar.display(), e);
    }
}

/// First timestamp within the head of the file, scanning at most
/// `HEAD_SCAN_LIMIT` bytes.
fn scan_start(path: &Path, codec: TimestampCodec) -> Result<Option<i64>> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    let want = HEAD_SCAN_LIMIT.min(size) as usize;
    let mut buf = vec![0u8; want];
    file.read_exact(&mut buf)?;

    for line in buf.split(|&b| b == b'\n') {
        if let Some(ts) = codec.parse_leading(line) {
            return Ok(Some(ts));
        }
    }
    Ok(None)
}

/// Last timestamp near the tail of the file: backward scan in
/// `TAIL_SCAN_CHUNK` steps, giving up after `TAIL_SCAN_LIMIT` bytes.
fn scan_end(path: &Path, codec: TimestampCodec, size: u64) -> Result<Option<i64>> {
    let mut file = File::open(path)?;
    let mut buf: Vec<u8> = Vec::new();
    let mut scanned: u64 = 0;

    while scanned < size && scanned < TAIL_SCAN_LIMIT {
        let chunk = TAIL_SCAN_CHUNK
            .min(size - scanned)
            .min(TAIL_SCAN_LIMIT - scanned);
        let read_start = size - scanned - chunk;

        let mut chunk_buf = vec![0u8; chunk as usize];
        file.seek(SeekFrom::Start(read_start))?;
        file.read_exact(&mut chunk_buf)?;
        chunk_buf.extend_from_slice(&buf);
        buf = chunk_buf;
        scanned += chunk;

        // line starts certain within the buffer: just past each newline,
        // plus the buffer head when it coincides with the file head
        if let Some(ts) = last_timestamp_in(&buf, read_start == 0, codec) {
            return Ok(Some(ts));
        }
    }
    Ok(None)
}

fn last_timestamp_in(buf: &[u8], covers_head: bool, codec: TimestampCodec) -> Option<i64> {
    let mut starts: Vec<usize> = Vec::new();
    if covers_head {
        starts.push(0);
    }
    starts.extend(
        buf.iter()
            .enumerate()
            .filter(|(_, &b)| b == b'\n')
            .map(|(i, _)| i + 1)
            .filter(|&i| i < buf.len()),
    );

    for &start in starts.iter().rev() {
        let rest = &buf[start..];
        let line = match rest.iter().position(|&b| b == b'\n') {
            Some(nl) => &rest[..nl],
            None => rest,
        };
        if let Some(ts) = codec.parse_leading(line) {
            return Some(ts);
        }
    }
    None
}
