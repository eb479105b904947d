//! Dockhand Compose - service enumeration, container CLI control, and
//! per-service configuration I/O

mod control;
mod envfile;
mod manifest;
mod services;

pub use control::{power, service_status, PowerGuard, PowerPermit};
pub use envfile::{read_env, write_env};
pub use manifest::{read_manifest, ComposeManifest};
pub use services::{list_services, service_exists};
