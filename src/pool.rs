//! Fetch session pool.
//!
//! Owns a fixed-size set of fetch sessions, one per scheduler worker.
//! Each browser session is a separate Chrome process (~100-300 MB RAM),
//! so the pool size doubles as the concurrency limit.

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::config::{FetchConfig, FetchMode};
use crate::fetcher::{BrowserFetcher, HttpFetcher, PageFetcher};

pub struct SessionPool {
    sessions: Vec<Box<dyn PageFetcher>>,
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl SessionPool {
    /// Launch `pool_size` sessions. A session that fails to initialize is
    /// logged and skipped; the run proceeds with whatever subset came up.
    /// Zero surviving sessions aborts the run before any work starts.
    pub fn launch(config: &FetchConfig) -> Result<Self> {
        Self::launch_with(config, |_| Self::launch_one(config))
    }

    fn launch_with(
        config: &FetchConfig,
        mut factory: impl FnMut(usize) -> Result<Box<dyn PageFetcher>>,
    ) -> Result<Self> {
        let mut sessions: Vec<Box<dyn PageFetcher>> = Vec::with_capacity(config.pool_size);

        for slot in 0..config.pool_size {
            match factory(slot) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("session {} failed to initialize: {}", slot, e),
            }
        }

        if sessions.is_empty() {
            bail!(
                "no fetch sessions could be initialized (wanted {})",
                config.pool_size
            );
        }

        info!(
            "session pool ready: {}/{} {} sessions",
            sessions.len(),
            config.pool_size,
            match config.mode {
                FetchMode::Browser => "browser",
                FetchMode::Http => "http",
            }
        );
        Ok(Self { sessions })
    }

    fn launch_one(config: &FetchConfig) -> Result<Box<dyn PageFetcher>> {
        Ok(match config.mode {
            FetchMode::Browser => Box::new(BrowserFetcher::launch(config)?),
            FetchMode::Http => Box::new(HttpFetcher::new(config)?),
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Hand the sessions to the scheduler, one per worker.
    pub fn into_sessions(self) -> Vec<Box<dyn PageFetcher>> {
        self.sessions
    }
}
