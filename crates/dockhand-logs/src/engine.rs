//! Engine facade: the public surface of the log inspection engine
//!
//! Validates and resolves `(service, file)` pairs strictly inside
//! `<root>/<service>/logs`, normalizes request-side times through the
//! codec, and dispatches to the readers and the follower registry. IO
//! errors leave the facade with paths redacted to the service-relative
//! form.

use chrono::FixedOffset;
use std::path::PathBuf;
use tracing::debug;

use dockhand_core::constants::{logs_dir, TIMECACHE_SUFFIX};
use dockhand_core::{
    validate_log_file_name, validate_service_name, Config, Error, Result, SearchResult, TimeRange,
};

use crate::follow::{FollowerRegistry, Subscription};
use crate::timestamp::TimestampCodec;
use crate::{lines, range, timerange};

/// The log inspection engine, one per process.
pub struct LogEngine {
    root: PathBuf,
    codec: TimestampCodec,
    range_cap: u64,
    followers: FollowerRegistry,
}

impl LogEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.container_dir.clone(),
            codec: TimestampCodec::with_offset(config.tz_offset),
            range_cap: config.range_cap_bytes,
            followers: FollowerRegistry::new(),
        }
    }

    /// Engine rooted at a directory with defaults elsewhere
    pub fn with_root(root: impl Into<PathBuf>, tz_offset: Option<FixedOffset>) -> Self {
        let mut config = Config::with_root(root.into());
        config.tz_offset = tz_offset;
        Self::new(&config)
    }

    /// List the log files of a service, newest-name-last, without cache
    /// sidecars. Orphaned sidecars whose companion log is gone are swept
    /// here.
    pub fn list_log_files(&self, service: &str) -> Result<Vec<String>> {
        let dir = self.resolve_logs_dir(service)?;

        let mut names: Vec<String> = Vec::new();
        let mut sidecars: Vec<String> = Vec::new();
        if dir.is_dir() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(TIMECACHE_SUFFIX) {
                    sidecars.push(name);
                } else {
                    names.push(name);
                }
            }
        }

        for sidecar in sidecars {
            let companion = &sidecar[..sidecar.len() - TIMECACHE_SUFFIX.len()];
            if !names.iter().any(|n| n == companion) {
                debug!("sweeping orphaned sidecar {}/{}", service, sidecar);
                let _ = std::fs::remove_file(dir.join(&sidecar));
            }
        }

        names.sort();
        Ok(names)
    }

    /// Read `num_lines` lines starting at a signed line index.
    pub fn read_lines(
        &self,
        service: &str,
        file: &str,
        start_line: i64,
        num_lines: i64,
    ) -> Result<Vec<String>> {
        let path = self.resolve_file(service, file)?;
        lines::read_lines(&path, start_line, num_lines)
            .map_err(|e| redact(service, file, e))
    }

    /// Read the lines whose timestamps fall in `[from, to]`, filtered and
    /// paginated. `from`/`to` accept ISO-8601 with offset or the locale
    /// line format.
    #[allow(clippy::too_many_arguments)]
    pub fn read_time_range(
        &self,
        service: &str,
        file: &str,
        from: Option<&str>,
        to: Option<&str>,
        limit: usize,
        offset: usize,
        search: &str,
    ) -> Result<SearchResult> {
        let path = self.resolve_file(service, file)?;
        let from = from.map(|t| self.codec.parse_query(t)).transpose()?;
        let to = to.map(|t| self.codec.parse_query(t)).transpose()?;

        // when the file's known time range cannot intersect the request
        // window, skip the search entirely
        if from.is_some() || to.is_some() {
            let known = timerange::get_time_range(&path, self.codec)
                .map_err(|e| redact(service, file, e))?;
            let before = matches!((to, known.start), (Some(t), Some(s)) if t < s);
            let after = matches!((from, known.end), (Some(f), Some(e)) if f > e);
            if before || after {
                return Ok(SearchResult::empty());
            }
        }

        range::read_range(
            &path,
            self.codec,
            from,
            to,
            limit,
            offset,
            search,
            self.range_cap,
        )
        .map_err(|e| redact(service, file, e))
    }

    /// First and last embedded timestamp of a log file.
    pub fn get_time_range(&self, service: &str, file: &str) -> Result<TimeRange> {
        let path = self.resolve_file(service, file)?;
        timerange::get_time_range(&path, self.codec).map_err(|e| redact(service, file, e))
    }

    /// Follow a log file live. The file itself may appear later; the
    /// service and its log directory must exist.
    pub fn follow(&self, service: &str, file: &str, filter: &str) -> Result<Subscription> {
        let path = self.resolve_file(service, file)?;
        Ok(self.followers.subscribe(&path, filter))
    }

    /// Cancel all followers and close their subscribers.
    pub fn shutdown(&self) {
        self.followers.shutdown();
    }

    /// Live follower count, exposed for teardown checks
    pub fn follower_count(&self) -> usize {
        self.followers.follower_count()
    }

    fn resolve_logs_dir(&self, service: &str) -> Result<PathBuf> {
        if !validate_service_name(service) {
            return Err(Error::ServiceNotFound(service.to_string()));
        }
        let service_dir = self.root.join(service);
        if !service_dir.is_dir() {
            return Err(Error::ServiceNotFound(service.to_string()));
        }
        Ok(logs_dir(&self.root, service))
    }

    fn resolve_file(&self, service: &str, file: &str) -> Result<PathBuf> {
        let dir = self.resolve_logs_dir(service)?;
        if !validate_log_file_name(file) {
            return Err(Error::InvalidLogFile(file.to_string()));
        }
        Ok(dir.join(file))
    }
}

impl Drop for LogEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Rewrite IO errors to carry the service-relative path only.
fn redact(service: &str, file: &str, err: Error) -> Error {
    match err {
        Error::IoError(source) => {
            Error::file_io(format!("{}/logs/{}", service, file), source)
        }
        other => other,
    }
}
