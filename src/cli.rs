use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, FetchMode};
use crate::store;

#[derive(Parser, Debug)]
#[command(name = "leadminer")]
#[command(about = "Enrich harvested contact datasets with emails and phones scraped from company websites")]
#[command(version)]
pub struct Cli {
    /// Path to the dataset file to enrich (must be named contacts*.json)
    #[arg(value_name = "DATASET")]
    pub input: Option<PathBuf>,

    /// Create default configuration file at ./config/leadminer.toml
    #[arg(long)]
    pub init: bool,

    /// Number of concurrent fetch sessions (overrides config)
    #[arg(short = 'j', long, value_name = "N")]
    pub pool_size: Option<usize>,

    /// Page fetch backend: 'browser' or 'http' (overrides config)
    #[arg(long, value_name = "MODE")]
    pub fetch_mode: Option<String>,

    /// Maximum retry attempts for failed page fetches (overrides config)
    #[arg(long, value_name = "COUNT")]
    pub max_retries: Option<u32>,

    /// Per-record deadline in seconds (overrides config)
    #[arg(long, value_name = "SECS")]
    pub task_timeout_secs: Option<u64>,

    /// Persist empty enrichment results instead of leaving the records
    /// eligible for a later run
    #[arg(long)]
    pub record_empty: bool,

    /// Verbose logging (use -v for INFO, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Validate flags and return the checked dataset path. `--init` runs
    /// never reach this; the binary handles that flag before validating.
    pub fn validate(&self) -> Result<&Path, String> {
        let input = self.input.as_deref().ok_or_else(|| {
            "Dataset path is required (or use --init to create a config)".to_string()
        })?;
        if !store::is_dataset_filename(input) {
            return Err(format!(
                "Dataset file must be named {}*{}: {}",
                store::DATASET_PREFIX,
                store::DATASET_SUFFIX,
                input.display()
            ));
        }

        if let Some(n) = self.pool_size {
            if n == 0 {
                return Err("Pool size must be greater than 0".to_string());
            }
            if n > 50 {
                return Err("Pool size cannot exceed 50 to avoid overwhelming target sites".to_string());
            }
        }

        if let Some(mode) = &self.fetch_mode {
            if !["browser", "http"].contains(&mode.as_str()) {
                return Err("Fetch mode must be 'browser' or 'http'".to_string());
            }
        }

        if let Some(secs) = self.task_timeout_secs {
            if secs == 0 {
                return Err("Task timeout must be greater than 0".to_string());
            }
        }

        Ok(input)
    }

    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(n) = self.pool_size {
            config.fetch.pool_size = n;
        }
        if let Some(mode) = &self.fetch_mode {
            config.fetch.mode = match mode.as_str() {
                "http" => FetchMode::Http,
                _ => FetchMode::Browser,
            };
        }
        if let Some(n) = self.max_retries {
            config.enrichment.max_retries = n;
        }
        if let Some(secs) = self.task_timeout_secs {
            config.enrichment.task_timeout_secs = secs;
        }
        if self.record_empty {
            config.enrichment.record_empty_results = true;
        }
    }
}
