//! Shared application state threaded into every request handler

use std::sync::Arc;

use dockhand_compose::PowerGuard;
use dockhand_core::Config;
use dockhand_logs::LogEngine;

/// Process-wide state: configuration, the log engine with its follower
/// registry, and the in-flight power-action guard.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<LogEngine>,
    pub power_guard: Arc<PowerGuard>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let engine = Arc::new(LogEngine::new(&config));
        Self {
            config: Arc::new(config),
            engine,
            power_guard: Arc::new(PowerGuard::new()),
        }
    }
}
