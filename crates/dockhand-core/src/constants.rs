//! Constants and default values for Dockhand

use std::path::{Path, PathBuf};

/// Environment variable naming the root directory of all service directories
pub const CONTAINER_DIR_VAR: &str = "CONTAINER_DIR";

/// Environment variable with the host IP handed to compose manifests
pub const HOST_IP_VAR: &str = "HOST_IP";

/// Environment variable overriding the timestamp codec timezone (`+HH:MM`)
pub const TZ_OFFSET_VAR: &str = "DOCKHAND_TZ_OFFSET";

/// Environment variable overriding the HTTP bind address
pub const BIND_ADDR_VAR: &str = "DOCKHAND_BIND";

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8090";

/// Log directory name inside a service directory
pub const LOGS_DIR: &str = "logs";

/// Environment file name inside a service directory
pub const ENV_FILE: &str = ".env";

/// Compose manifest name inside a service directory
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Magic comment prefix carrying the manifest version on its first line
pub const COMPOSE_MAGIC_PREFIX: &str = "# DCM:";

/// Suffix of the per-log-file time-range cache sidecar
pub const TIMECACHE_SUFFIX: &str = ".timecache";

/// Extension of an active (still growing) log file
pub const ACTIVE_LOG_SUFFIX: &str = ".log";

/// Soft cap on the byte slice a single time-range read may materialize (64MB)
pub const DEFAULT_RANGE_CAP_BYTES: u64 = 64 * 1024 * 1024;

/// Window size for the bounded line-locator reads
pub const LOCATOR_WINDOW: usize = 256;

/// Window read at a line start when extracting its timestamp token
pub const TIMESTAMP_WINDOW: usize = 64;

/// Bytes of the file head hashed into the rotation signature
pub const HEADER_SIG_LEN: usize = 64;

/// Bytes scanned from the head of a file for its first timestamp (50KB)
pub const HEAD_SCAN_LIMIT: u64 = 50 * 1024;

/// Chunk size of the backward scan for a file's last timestamp (10KB)
pub const TAIL_SCAN_CHUNK: u64 = 10 * 1024;

/// Total bytes the backward scan may cover (100KB)
pub const TAIL_SCAN_LIMIT: u64 = 100 * 1024;

/// Capacity of each live-follow subscriber queue
pub const SUBSCRIBER_QUEUE_CAP: usize = 256;

/// Follower poll interval when no filesystem event arrives
pub const FOLLOW_POLL_MS: u64 = 500;

/// Attempts to (re)establish a follower watcher before giving up
pub const WATCHER_RETRY_LIMIT: u32 = 5;

/// Get the directory of a service
pub fn service_dir(root: &Path, service: &str) -> PathBuf {
    root.join(service)
}

/// Get the log directory of a service
pub fn logs_dir(root: &Path, service: &str) -> PathBuf {
    root.join(service).join(LOGS_DIR)
}

/// Get the env file path of a service
pub fn env_path(root: &Path, service: &str) -> PathBuf {
    root.join(service).join(ENV_FILE)
}

/// Get the compose manifest path of a service
pub fn compose_path(root: &Path, service: &str) -> PathBuf {
    root.join(service).join(COMPOSE_FILE)
}

/// Get the cache sidecar path of a log file
pub fn timecache_path(log_path: &Path) -> PathBuf {
    let name = log_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    log_path.with_file_name(format!("{}{}", name, TIMECACHE_SUFFIX))
}
