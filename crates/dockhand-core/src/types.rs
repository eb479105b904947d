//! Core types for Dockhand

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::TIMECACHE_SUFFIX;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex pattern for valid service and log file names
static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("Invalid name regex"));

/// Validate a service directory name to prevent path traversal
pub fn validate_service_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

/// Validate a log file name for read APIs.
///
/// Rejects path separators, dotfiles, `..` components, and cache sidecars.
pub fn validate_log_file_name(name: &str) -> bool {
    NAME_REGEX.is_match(name) && !name.ends_with(TIMECACHE_SUFFIX)
}

/// Running state of a service as reported by the container CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Up,
    Down,
}

impl ServiceStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, ServiceStatus::Up)
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Up => write!(f, "Up"),
            ServiceStatus::Down => write!(f, "Down"),
        }
    }
}

/// Power action applied to a service through the container CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    Start,
    Stop,
    Restart,
    Down,
}

impl PowerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerAction::Start => "start",
            PowerAction::Stop => "stop",
            PowerAction::Restart => "restart",
            PowerAction::Down => "down",
        }
    }
}

impl FromStr for PowerAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(PowerAction::Start),
            "stop" => Ok(PowerAction::Stop),
            "restart" => Ok(PowerAction::Restart),
            "down" => Ok(PowerAction::Down),
            other => Err(Error::UnknownPowerAction(other.to_string())),
        }
    }
}

impl std::fmt::Display for PowerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// First and last embedded timestamp of a log file, epoch milliseconds.
///
/// `None` means no timestamped line was found in the scanned window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Result of a time-range search: the requested page plus the total
/// number of matching lines before pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub lines: Vec<String>,
    pub total: usize,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total: 0,
        }
    }
}
