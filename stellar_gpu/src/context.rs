/// Context - explicit replacement for process-wide singletons
///
/// Holds the logger handle and the configuration. Every long-lived component
/// (swapchain, caches, renderer, backend device) receives a `&Context` at
/// construction and clones what it needs.

use std::sync::Arc;

use crate::config::Config;
use crate::log::{Log, Logger};

/// Shared construction context
#[derive(Debug, Clone)]
pub struct Context {
    log: Log,
    config: Config,
}

impl Context {
    /// Create a context logging to the colored console
    pub fn new(config: Config) -> Self {
        let log = Log::console(config.min_log_severity);
        Self { log, config }
    }

    /// Create a context with a custom logger
    pub fn with_logger(config: Config, logger: Arc<dyn Logger>) -> Self {
        let log = Log::new(logger, config.min_log_severity);
        Self { log, config }
    }

    /// Create a context around an existing log handle
    pub fn with_log(config: Config, log: Log) -> Self {
        Self { log, config }
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
