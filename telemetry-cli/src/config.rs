//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use telemetry_core::PollerConfig;

/// Published sheet the dashboard watches when nothing else is configured
pub const DEFAULT_SOURCE_URL: &str =
    "https://opensheet.elk.sh/1L9CAlNGDNurB_zUn7e3EPiL22sENxrifkqS8kYOrqag/Sheet1";

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

fn default_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            request_timeout_ms: default_timeout(),
        }
    }
}

fn default_interval() -> u64 {
    5000
}

fn default_timeout() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    #[serde(default = "default_table_rows")]
    pub table_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            trend_window: default_trend_window(),
            table_rows: default_table_rows(),
        }
    }
}

fn default_trend_window() -> usize {
    50
}

fn default_table_rows() -> usize {
    10
}

impl AppConfig {
    /// Reject values the dashboard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            bail!("source.url must not be empty");
        }
        if self.polling.interval_ms == 0 {
            bail!("polling.interval_ms must be greater than zero");
        }
        if self.display.trend_window == 0 || self.display.table_rows == 0 {
            bail!("display windows must hold at least one record");
        }
        Ok(())
    }

    /// Settings handed to the core poller
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::new()
            .with_interval_ms(self.polling.interval_ms)
            .with_request_timeout_ms(self.polling.request_timeout_ms)
            .with_trend_window(self.display.trend_window)
            .with_display_window(self.display.table_rows)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}
