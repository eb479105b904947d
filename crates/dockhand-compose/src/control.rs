//! Container CLI control: status probes and power actions
//!
//! Every action shells out to `docker compose` in the service directory,
//! the same manifest the operator would use by hand. Concurrent actions on
//! one service are serialized by [`PowerGuard`].

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

use dockhand_core::{Error, PowerAction, Result, ServiceStatus};

/// Ask the container CLI whether the service has running containers.
pub async fn service_status(root: &Path, service: &str) -> Result<ServiceStatus> {
    let output = compose_command(root, service, &["ps", "--quiet"]).await?;
    let up = !output.trim().is_empty();
    Ok(if up { ServiceStatus::Up } else { ServiceStatus::Down })
}

/// Apply a power action to a service. Returns a human-readable summary.
pub async fn power(root: &Path, service: &str, action: PowerAction) -> Result<String> {
    info!("applying {} to service {}", action, service);

    let args: &[&str] = match action {
        PowerAction::Start => &["up", "-d"],
        PowerAction::Stop => &["stop"],
        PowerAction::Restart => &["restart"],
        PowerAction::Down => &["down"],
    };
    compose_command(root, service, args).await?;
    Ok(format!("{} applied to {}", action, service))
}

/// Run `docker compose <args>` in the service directory and capture stdout.
async fn compose_command(root: &Path, service: &str, args: &[&str]) -> Result<String> {
    let dir = root.join(service);

    let output = Command::new("docker")
        .arg("compose")
        .args(args)
        .current_dir(&dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::command(format!("failed to run docker compose: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::command(format!(
            "docker compose {} failed for {}: {}",
            args.first().unwrap_or(&""),
            service,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Process-wide registry of in-flight power actions.
///
/// One action per service at a time; a second request while the first is
/// still running fails fast instead of queueing behind the container CLI.
#[derive(Default)]
pub struct PowerGuard {
    in_flight: Mutex<HashSet<String>>,
}

/// Slot held while a power action runs; released on drop, so every exit
/// path (including errors) frees the service.
pub struct PowerPermit<'a> {
    guard: &'a PowerGuard,
    key: String,
}

impl PowerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the service for an action, failing if one is already running.
    pub fn acquire(&self, service: &str) -> Result<PowerPermit<'_>> {
        let mut set = self.in_flight.lock();
        if !set.insert(service.to_string()) {
            return Err(Error::ActionInFlight(service.to_string()));
        }
        Ok(PowerPermit {
            guard: self,
            key: service.to_string(),
        })
    }

    pub fn is_busy(&self, service: &str) -> bool {
        self.in_flight.lock().contains(service)
    }
}

impl Drop for PowerPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.lock().remove(&self.key);
    }
}
