//! Application state shared across HTTP handlers

use std::sync::Arc;

use crate::config::Config;
use crate::core::directory::ProviderDirectory;
use crate::core::forwarder::RequestForwarder;
use crate::core::usage::{LogUsageSink, UsageSink};
use crate::utils::error::Result;

/// HTTP server state shared across handlers.
///
/// Everything is behind an `Arc`; cloning the state per worker is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Relay configuration (shared read-only)
    pub config: Arc<Config>,
    /// Model-to-provider routing table
    pub directory: Arc<ProviderDirectory>,
    /// Request forwarding core
    pub forwarder: Arc<RequestForwarder>,
}

impl AppState {
    /// Build state with the default logging sink
    pub fn new(config: Config) -> Result<Self> {
        Self::with_sink(config, Arc::new(LogUsageSink))
    }

    /// Build state with a caller-provided usage sink
    pub fn with_sink(config: Config, sink: Arc<dyn UsageSink>) -> Result<Self> {
        let directory = Arc::new(ProviderDirectory::from_config(&config)?);
        let forwarder = Arc::new(RequestForwarder::new(Arc::clone(&directory), sink));
        Ok(Self {
            config: Arc::new(config),
            directory,
            forwarder,
        })
    }
}
