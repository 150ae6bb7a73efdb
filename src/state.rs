//! Application state management for the server.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and the request instrumentation layer.

use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::metrics::ServerMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// State shared across requests.
pub struct AppState {
    pub registry: Registry,
    pub metrics: ServerMetrics,
    pub config: Arc<Config>,
    /// Server start time for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    /// Builds a fresh registry with every instrument registered once.
    pub fn new(config: Config) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let metrics = ServerMetrics::new(&registry)?;

        Ok(Self {
            registry,
            metrics,
            config: Arc::new(config),
            start_time: Instant::now(),
        })
    }
}
