use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub job_binaries: JobBinariesConfig,
    #[serde(default)]
    pub swift: SwiftConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Retrieval limits and credential mode
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobBinariesConfig {
    /// Maximum job binary size in kilobytes
    #[serde(default = "default_max_kb")]
    pub max_kb: u64,
    /// Proxy users are provisioned per domain, so binaries may omit credentials
    #[serde(default)]
    pub use_domain_for_proxy_users: bool,
    /// Timeout applied to each backend call
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Default directory binaries are staged into on execution hosts
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
}

impl Default for JobBinariesConfig {
    fn default() -> Self {
        Self {
            max_kb: default_max_kb(),
            use_domain_for_proxy_users: false,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            staging_dir: default_staging_dir(),
        }
    }
}

fn default_max_kb() -> u64 {
    5120
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_staging_dir() -> String {
    "/tmp".to_string()
}

/// Internal object storage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwiftConfig {
    /// Container suffix marking the internal namespace
    #[serde(default = "default_url_suffix")]
    pub url_suffix: String,
}

impl Default for SwiftConfig {
    fn default() -> Self {
        Self {
            url_suffix: default_url_suffix(),
        }
    }
}

fn default_url_suffix() -> String {
    crate::binaries::DEFAULT_URL_SUFFIX.to_string()
}

/// Storage provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    Local,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Local,
            root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data/objects")
}
