//! Configuration management for Wicketwatch.
//!
//! Provides TOML-based configuration with environment variable overrides.
//! The service is headless, so the config file path itself comes from
//! `WICKETWATCH_CONFIG` rather than a platform config directory.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main application configuration.
///
/// Loaded from the path in `WICKETWATCH_CONFIG` (default `wicketwatch.toml`
/// in the working directory). If the file doesn't exist, default values
/// are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Source-site discovery settings
    pub discovery: DiscoveryConfig,
    /// Downstream collector service settings
    pub collector: CollectorConfig,
    /// Headless browser settings
    pub browser: BrowserConfig,
    /// Per-match worker settings
    pub worker: WorkerConfig,
    /// Persistence settings
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from a file, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or is not valid TOML.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `WICKETWATCH_CONFIG`: path to the TOML config file
    /// - `WICKETWATCH_SOURCE_URL`: override the discovery source URL
    /// - `WICKETWATCH_COLLECTOR_URL`: override the collector base URL
    /// - `WICKETWATCH_DATABASE_PATH`: override the SQLite database path
    /// - `WICKETWATCH_HEADLESS`: override browser headless mode (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let path =
            std::env::var("WICKETWATCH_CONFIG").unwrap_or_else(|_| "wicketwatch.toml".to_string());
        let mut config = Self::load_from(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides to an already-loaded config.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("WICKETWATCH_SOURCE_URL") {
            tracing::debug!("Override discovery.source_url from env: {}", val);
            self.discovery.source_url = val;
        }

        if let Ok(val) = std::env::var("WICKETWATCH_COLLECTOR_URL") {
            tracing::debug!("Override collector.base_url from env: {}", val);
            self.collector.base_url = val;
        }

        if let Ok(val) = std::env::var("WICKETWATCH_DATABASE_PATH") {
            tracing::debug!("Override database.path from env: {}", val);
            self.database.path = val;
        }

        if let Ok(val) = std::env::var("WICKETWATCH_HEADLESS") {
            if let Ok(headless) = val.parse() {
                tracing::debug!("Override browser.headless from env: {}", headless);
                self.browser.headless = headless;
            }
        }
    }

    /// Save configuration to disk.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Source-site discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Base URL of the source site listing live matches
    pub source_url: String,
    /// Seconds between discovery cycles
    pub interval_secs: u64,
    /// Milliseconds to let the listing page settle before querying it
    pub settle_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            source_url: "https://crex.live".to_string(),
            interval_secs: 60,
            settle_ms: 10_000,
        }
    }
}

/// Downstream collector service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Base URL of the collector service
    pub base_url: String,
    /// Username for the token endpoint
    pub username: String,
    /// Password for the token endpoint
    pub password: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8099".to_string(),
            username: "tanmay".to_string(),
            password: "tanmay".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 60,
        }
    }
}

/// Per-match worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Milliseconds between extraction iterations
    pub poll_interval_ms: u64,
    /// Milliseconds to wait for the odds-view toggle to appear
    pub odds_toggle_timeout_ms: u64,
    /// Seconds a stop request waits for the worker to exit before
    /// cleaning up regardless
    pub stop_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_500,
            odds_toggle_timeout_ms: 30_000,
            stop_timeout_secs: 10,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "url_state.db".to_string(),
        }
    }
}
