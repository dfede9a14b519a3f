//! Dataset persistence: load the contact file once at startup, rewrite
//! the whole file after each enrichment.
//!
//! Snapshots are atomic (write to temp file, fsync, rename) so an
//! interrupted run never leaves a half-written dataset behind. Readers
//! either see the previous snapshot or the new one, never a torn file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::record::ContactRecord;

/// Dataset files are named `contacts*.json` by convention.
pub const DATASET_PREFIX: &str = "contacts";
pub const DATASET_SUFFIX: &str = ".json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset file not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// True if `path` follows the `contacts*.json` naming convention.
/// Enforced at the CLI layer only; `Dataset::load` accepts any path.
pub fn is_dataset_filename(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with(DATASET_PREFIX) && name.ends_with(DATASET_SUFFIX),
        None => false,
    }
}

/// The full contact dataset plus the path it persists to.
#[derive(Debug)]
pub struct Dataset {
    path: PathBuf,
    pub records: Vec<ContactRecord>,
}

impl Dataset {
    /// Load and parse the dataset file at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            return Err(StoreError::NotFound(path));
        }
        let content = fs::read_to_string(&path)?;
        let records: Vec<ContactRecord> = serde_json::from_str(&content)?;
        debug!("loaded {} records from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Indexes of records that still need enrichment, in file order.
    pub fn eligible_indexes(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_eligible())
            .map(|(i, _)| i)
            .collect()
    }

    /// Rewrite the dataset file with the current records.
    ///
    /// Writes to a sibling temp file, fsyncs, then renames over the
    /// target. Rename is atomic on the filesystems we care about.
    pub fn snapshot(&self) -> Result<(), StoreError> {
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&self.records)?;

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!("snapshot of {} records written to {}", self.records.len(), self.path.display());
        Ok(())
    }
}
