//! Configuration management for jobbin
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use jobbin::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Job binary limit: {}KB", config.job_binaries.max_kb);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `JOBBIN__<section>__<key>`
//!
//! Examples:
//! - `JOBBIN__JOB_BINARIES__MAX_KB=10240`
//! - `JOBBIN__JOB_BINARIES__USE_DOMAIN_FOR_PROXY_USERS=true`
//! - `JOBBIN__SWIFT__URL_SUFFIX=.internal`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/jobbin.toml`.
//! This can be overridden using the `JOBBIN_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, JobBinariesConfig, StorageConfig, StorageProvider, SwiftConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`JOBBIN__*`)
    /// 2. TOML file (default: `config/jobbin.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
