//! Runtime configuration read from the environment

use chrono::FixedOffset;
use std::path::PathBuf;

use crate::constants::*;
use crate::error::{Error, Result};

/// Dockhand runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding one subdirectory per service
    pub container_dir: PathBuf,
    /// Host IP surfaced to compose manifests; unused by the log engine
    pub host_ip: Option<String>,
    /// HTTP bind address
    pub bind_addr: String,
    /// Fixed timezone for the timestamp codec; `None` uses the process-local zone
    pub tz_offset: Option<FixedOffset>,
    /// Soft cap on the byte slice a time-range read may materialize
    pub range_cap_bytes: u64,
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// `CONTAINER_DIR` is required and must name an existing directory.
    pub fn from_env() -> Result<Self> {
        let container_dir = std::env::var(CONTAINER_DIR_VAR)
            .map(PathBuf::from)
            .map_err(|_| {
                Error::config(format!("{} environment variable not set", CONTAINER_DIR_VAR))
            })?;

        if !container_dir.is_dir() {
            return Err(Error::config(format!(
                "{} is not a directory: {}",
                CONTAINER_DIR_VAR,
                container_dir.display()
            )));
        }

        let tz_offset = match std::env::var(TZ_OFFSET_VAR) {
            Ok(raw) => Some(parse_tz_offset(&raw)?),
            Err(_) => None,
        };

        Ok(Self {
            container_dir,
            host_ip: std::env::var(HOST_IP_VAR).ok(),
            bind_addr: std::env::var(BIND_ADDR_VAR)
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            tz_offset,
            range_cap_bytes: DEFAULT_RANGE_CAP_BYTES,
        })
    }

    /// Build a config rooted at a specific directory, defaults elsewhere.
    pub fn with_root(container_dir: PathBuf) -> Self {
        Self {
            container_dir,
            host_ip: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            tz_offset: None,
            range_cap_bytes: DEFAULT_RANGE_CAP_BYTES,
        }
    }
}

/// Parse a `+HH:MM` / `-HH:MM` offset string
fn parse_tz_offset(raw: &str) -> Result<FixedOffset> {
    let err = || Error::config(format!("Invalid timezone offset: {}", raw));

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1i32, &raw[1..]),
        Some(b'-') => (-1i32, &raw[1..]),
        _ => return Err(err()),
    };

    let (hh, mm) = rest.split_once(':').ok_or_else(err)?;
    let hours: i32 = hh.parse().map_err(|_| err())?;
    let minutes: i32 = mm.parse().map_err(|_| err())?;
    if hours > 23 || minutes > 59 {
        return Err(err());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tz_offset() {
        assert_eq!(
            parse_tz_offset("+05:30").unwrap(),
            FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(
            parse_tz_offset("-08:00").unwrap(),
            FixedOffset::west_opt(8 * 3600).unwrap()
        );
        assert!(parse_tz_offset("05:30").is_err());
        assert!(parse_tz_offset("+5").is_err());
        assert!(parse_tz_offset("+25:00").is_err());
    }

    #[test]
    fn test_with_root_defaults() {
        let config = Config::with_root(PathBuf::from("/containers"));
        assert_eq!(config.container_dir, PathBuf::from("/containers"));
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert!(config.tz_offset.is_none());
        assert_eq!(config.range_cap_bytes, DEFAULT_RANGE_CAP_BYTES);
    }
}
