//! Poller configuration types
//!
//! Minimal knobs for the fetch cycle and the derived views. Where the rows
//! come from (the source URL) is passed to the poller per call, so the same
//! configuration can drive any source.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the poller and its published views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Delay between fetches in milliseconds (default: 5000ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// HTTP request timeout in milliseconds (default: 10000ms)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Number of trailing records exposed to trend consumers (default: 50)
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    /// Number of trailing records exposed to tabular consumers (default: 10)
    #[serde(default = "default_display_window")]
    pub display_window: usize,
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_trend_window() -> usize {
    50
}

fn default_display_window() -> usize {
    10
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            trend_window: default_trend_window(),
            display_window: default_display_window(),
        }
    }
}

impl PollerConfig {
    /// Create a new poller configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the poll interval
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Builder method: set the HTTP request timeout
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// Builder method: set the trend window size
    pub fn with_trend_window(mut self, records: usize) -> Self {
        self.trend_window = records;
        self
    }

    /// Builder method: set the table window size
    pub fn with_display_window(mut self, records: usize) -> Self {
        self.display_window = records;
        self
    }

    /// Poll interval as a `Duration`, never shorter than one millisecond
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
