//! Wicketwatch Core - foundation crate for the live match scraper.
//!
//! Provides the shared types, error handling and configuration management
//! that the other Wicketwatch crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Core error types using thiserror
//! - [`config`] - TOML-based configuration with environment overrides
//! - [`types`] - Shared newtypes and enums (`MatchId`, `MatchKind`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, CollectorConfig, DatabaseConfig, DiscoveryConfig, WorkerConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use types::{MatchId, MatchKind};
