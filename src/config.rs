//! Configuration management for leadminer.
//!
//! All configuration is loaded from `./config/leadminer.toml`. No
//! hardcoded defaults exist in source code - all defaults are in the
//! config template.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/leadminer.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/leadminer.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty or zero")]
    EmptyRequired { field: String },

    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: String, value: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub enrichment: EnrichmentConfig,
    pub phones: PhonesConfig,
}

/// Session type used by the fetch pool
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Headless Chrome pages (renders JavaScript)
    Browser,
    /// Plain HTTP client
    Http,
}

/// Fetch session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub mode: FetchMode,
    pub pool_size: usize,
    pub user_agent: String,
    pub page_load_timeout_secs: u64,
    pub content_timeout_secs: u64,
}

impl FetchConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_secs)
    }
}

/// Per-record enrichment policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub task_timeout_secs: u64,
    pub request_delay_ms: u64,
    #[serde(default)]
    pub record_empty_results: bool,
}

/// Phone extraction filter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PhonesConfig {
    pub min_digits: usize,
    #[serde(default)]
    pub allowed_area_codes: Vec<String>,
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.pool_size == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "fetch.pool_size".to_string(),
            });
        }
        if self.fetch.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "fetch.user_agent".to_string(),
            });
        }
        if self.fetch.page_load_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "fetch.page_load_timeout_secs".to_string(),
            });
        }
        if self.fetch.content_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "fetch.content_timeout_secs".to_string(),
            });
        }
        if self.enrichment.task_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "enrichment.task_timeout_secs".to_string(),
            });
        }
        if self.phones.min_digits == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "phones.min_digits".to_string(),
            });
        }

        for code in &self.phones.allowed_area_codes {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::InvalidValue {
                    field: "phones.allowed_area_codes".to_string(),
                    value: code.clone(),
                });
            }
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}
