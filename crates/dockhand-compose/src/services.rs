//! Service enumeration over the container root directory

use std::path::Path;

use dockhand_core::constants::COMPOSE_FILE;
use dockhand_core::{validate_service_name, Result};

/// List service directories under the root: subdirectories that hold a
/// compose manifest, sorted by name.
pub fn list_services(root: &Path) -> Result<Vec<String>> {
    let mut services = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !validate_service_name(&name) {
            continue;
        }
        if entry.path().join(COMPOSE_FILE).is_file() {
            services.push(name);
        }
    }
    services.sort();
    Ok(services)
}

/// Whether `name` is a known service under the root
pub fn service_exists(root: &Path, name: &str) -> bool {
    validate_service_name(name) && root.join(name).join(COMPOSE_FILE).is_file()
}
