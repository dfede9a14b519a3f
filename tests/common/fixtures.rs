use anyhow::anyhow;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use leadminer::{ContactRecord, PageFetcher};

/// Write a dataset file named `contacts.json` into a fresh temp dir and
/// return both. The `TempDir` must be kept alive for the path to stay valid.
pub fn dataset_file(json: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("contacts.json");
    std::fs::write(&path, json).expect("write dataset fixture");
    (dir, path)
}

pub fn read_records(path: &Path) -> Vec<ContactRecord> {
    let content = std::fs::read_to_string(path).expect("read dataset file");
    serde_json::from_str(&content).expect("parse dataset file")
}

/// Fetcher that fails its first `fail_first` calls and then serves `body`,
/// counting every call.
pub struct ScriptedFetcher {
    pub calls: Arc<AtomicUsize>,
    pub fail_first: usize,
    pub body: String,
}

impl ScriptedFetcher {
    pub fn succeeding(body: &str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_first: 0,
            body: body.to_string(),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_first: usize::MAX,
            body: String::new(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &str) -> anyhow::Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            Err(anyhow!("simulated fetch failure"))
        } else {
            Ok(self.body.clone())
        }
    }
}
