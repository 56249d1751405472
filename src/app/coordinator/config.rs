//! Configuration for the coordinator loop

use std::time::Duration;

use crate::config::AppConfig;
use crate::constants::coordinator;

/// Configuration for the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How often the task queue is drained
    pub drain_interval: Duration,
    /// Number of BDSIA rows offered for download
    pub bulk_rows: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            drain_interval: coordinator::DRAIN_INTERVAL,
            bulk_rows: coordinator::BULK_TABLE_ROWS,
        }
    }
}

impl CoordinatorConfig {
    /// Take the coordinator settings from the loaded configuration
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            drain_interval: config.drain_interval(),
            bulk_rows: config.coordinator.bulk_rows,
        }
    }

    /// Set the drain interval
    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    /// Set how many BDSIA rows are offered
    pub fn with_bulk_rows(mut self, rows: usize) -> Self {
        self.bulk_rows = rows;
        self
    }
}
