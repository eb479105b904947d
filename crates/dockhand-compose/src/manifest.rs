//! Compose manifest access
//!
//! The manifest is surfaced verbatim to the UI; the only structure read
//! out of it is the optional magic comment `# DCM:<major>.<minor>` on the
//! first line, which tags manifests produced by the generator.

use std::path::Path;

use dockhand_core::constants::COMPOSE_MAGIC_PREFIX;
use dockhand_core::Result;

/// A service's compose manifest and its generator version, if tagged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeManifest {
    pub version: Option<(u32, u32)>,
    pub content: String,
}

impl ComposeManifest {
    /// Version as `"major.minor"` for the wire
    pub fn version_string(&self) -> Option<String> {
        self.version.map(|(major, minor)| format!("{}.{}", major, minor))
    }
}

/// Read a manifest and extract its magic version comment.
pub fn read_manifest(path: &Path) -> Result<ComposeManifest> {
    let content = std::fs::read_to_string(path)?;
    let version = content.lines().next().and_then(parse_magic);
    Ok(ComposeManifest { version, content })
}

fn parse_magic(first_line: &str) -> Option<(u32, u32)> {
    let rest = first_line.trim().strip_prefix(COMPOSE_MAGIC_PREFIX)?;
    let (major, minor) = rest.trim().split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_magic() {
        assert_eq!(parse_magic("# DCM:1.2"), Some((1, 2)));
        assert_eq!(parse_magic("# DCM:10.0 "), Some((10, 0)));
        assert_eq!(parse_magic("# DCM:"), None);
        assert_eq!(parse_magic("# DCM:1"), None);
        assert_eq!(parse_magic("# DCM:a.b"), None);
        assert_eq!(parse_magic("services:"), None);
    }

    #[test]
    fn test_read_manifest_with_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docker-compose.yml");
        std::fs::write(&path, "# DCM:2.1\nservices:\n  web:\n    image: nginx\n").unwrap();

        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.version, Some((2, 1)));
        assert_eq!(manifest.version_string(), Some("2.1".to_string()));
        assert!(manifest.content.contains("image: nginx"));
    }

    #[test]
    fn test_read_manifest_without_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docker-compose.yml");
        std::fs::write(&path, "services:\n  web:\n    image: nginx\n").unwrap();

        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.version, None);
        assert_eq!(manifest.version_string(), None);
    }

    // the magic comment only counts on the first line
    #[test]
    fn test_magic_not_on_first_line_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docker-compose.yml");
        std::fs::write(&path, "services: {}\n# DCM:1.0\n").unwrap();

        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.version, None);
    }
}
