//! Queue configuration and statistics

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Queue configuration
///
/// # Example
///
/// ```
/// use everruns_flow::QueueConfig;
///
/// let config = QueueConfig::default()
///     .with_name("thumbnails")
///     .with_concurrency(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Name used in log fields
    pub name: String,

    /// Maximum number of tasks executing at once
    pub concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            concurrency: 10,
        }
    }
}

impl QueueConfig {
    /// Create a configuration with the given concurrency
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Default::default()
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `FLOW_QUEUE_NAME`: queue name (default: `default`)
    /// - `FLOW_QUEUE_CONCURRENCY`: maximum concurrent tasks (default: 10)
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let name = env::var("FLOW_QUEUE_NAME").unwrap_or(defaults.name);
        let concurrency = env::var("FLOW_QUEUE_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.concurrency);

        Self { name, concurrency }
    }

    /// Set the queue name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the concurrency limit
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.concurrency == 0 {
            return Err(QueueError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(QueueError::InvalidConfig("name must not be empty".into()));
        }
        Ok(())
    }
}

/// Snapshot of a queue's counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStats {
    /// Tasks waiting in the backlog
    pub pending: usize,
    /// Tasks currently executing
    pub running: usize,
    /// Tasks that completed successfully
    pub completed: u64,
    /// Tasks whose worker failed or panicked
    pub failed: u64,
}

impl QueueStats {
    /// Tasks admitted but not finished (pending + running)
    pub fn active(&self) -> usize {
        self.pending + self.running
    }

    /// Total finished tasks
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }

    /// Success rate as a percentage
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.processed();
        if total == 0 {
            None
        } else {
            Some((self.completed as f64 / total as f64) * 100.0)
        }
    }
}
