//! Environment file reader and writer
//!
//! `KEY=VALUE` one per line; blank lines and `#` comments are skipped on
//! read. Writes go through a temp file and rename so a crash never leaves
//! a half-written env file behind.

use std::path::Path;

use dockhand_core::{Error, Result};

/// Read an env file into ordered key/value pairs.
///
/// Values keep inner whitespace; a matched pair of single or double quotes
/// around the whole value is stripped.
pub fn read_env(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_env(&content))
}

fn parse_env(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(pos) = line.find('=') {
            let key = line[..pos].trim().to_string();
            let value = line[pos + 1..].trim();
            let value = value
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(value)
                .to_string();
            entries.push((key, value));
        }
    }
    entries
}

/// Validate and write env content atomically.
///
/// Every non-blank, non-comment line must contain `=`; on violation nothing
/// is written.
pub fn write_env(path: &Path, content: &str) -> Result<()> {
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !line.contains('=') {
            return Err(Error::config(format!(
                "env line {} has no '=': {}",
                idx + 1,
                line
            )));
        }
    }

    let mut normalized = content.trim_end().to_string();
    if !normalized.is_empty() {
        normalized.push('\n');
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{}.tmp", name));
    std::fs::write(&tmp, normalized)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
