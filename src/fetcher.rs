//! Page fetch sessions.
//!
//! The pipeline depends only on the narrow [`PageFetcher`] contract:
//! given a URL, return rendered page content or fail. Two implementations
//! exist - a headless Chrome session for JavaScript-heavy sites and a
//! plain HTTP client. Tests substitute scripted fetchers.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;

/// One reusable fetch session, bound to a single worker for a run.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Navigate to `url` and return the rendered page content. Both the
    /// navigation and the content retrieval are individually bounded by
    /// the session's configured timeouts.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Default the scheme to https when the dataset stores a bare host.
/// Anything `Url` cannot parse is passed through unchanged - navigation
/// errors on garbage input flow into the normal retry path.
pub fn normalize_website_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    match Url::parse(&with_scheme) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!("leaving unparseable URL as-is ({with_scheme}): {e}");
            with_scheme
        }
    }
}

/// Headless Chrome session. The `headless_chrome` API is blocking, so
/// every call runs under `spawn_blocking` with a `tokio::time::timeout`
/// race on top. A lost race abandons the blocking call (it finishes in
/// the background and is ignored) rather than aborting Chrome mid-flight.
pub struct BrowserFetcher {
    browser: headless_chrome::Browser,
    page_load_timeout: Duration,
    content_timeout: Duration,
}

impl BrowserFetcher {
    /// Launch a dedicated Chrome process for this session. Disables the
    /// sandbox inside containers (detected via /.dockerenv or the
    /// LEADMINER_CONTAINER env var) and assigns a unique debug port to
    /// avoid conflicts between pool sessions.
    pub fn launch(config: &FetchConfig) -> Result<Self> {
        let is_container = std::env::var("LEADMINER_CONTAINER").is_ok()
            || std::path::Path::new("/.dockerenv").exists();

        static PORT_COUNTER: std::sync::atomic::AtomicU16 =
            std::sync::atomic::AtomicU16::new(9222);
        let debug_port = PORT_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if debug_port > 9322 {
            PORT_COUNTER.store(9222, std::sync::atomic::Ordering::Relaxed);
        }

        let options = headless_chrome::LaunchOptions::default_builder()
            .sandbox(!is_container)
            .port(Some(debug_port))
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| anyhow!("Failed to build Chrome launch options: {}", e))?;
        let browser = headless_chrome::Browser::new(options)
            .map_err(|e| anyhow!("Failed to launch headless Chrome: {}", e))?;

        Ok(Self {
            browser,
            page_load_timeout: config.page_load_timeout(),
            content_timeout: config.content_timeout(),
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let browser = self.browser.clone();
        let target = url.to_string();
        let nav_deadline = self.page_load_timeout;

        // Phase 1: open a tab and navigate, waiting for DOM construction
        // only (wait_until_navigated), not network idle. The tab must be
        // closed on every failure exit; Chrome outlives the call and would
        // otherwise accumulate one orphan tab per failed attempt.
        let navigation = tokio::task::spawn_blocking(move || {
            let tab = browser
                .new_tab()
                .map_err(|e| anyhow!("Failed to open browser tab: {}", e))?;
            tab.set_default_timeout(nav_deadline);
            let navigated = tab
                .navigate_to(&target)
                .and_then(|_| tab.wait_until_navigated());
            if let Err(e) = navigated {
                let _ = tab.close(true);
                return Err(anyhow!("Navigation to {} failed: {}", target, e));
            }
            Ok::<_, anyhow::Error>(tab)
        });

        let tab = tokio::time::timeout(self.page_load_timeout, navigation)
            .await
            .map_err(|_| anyhow!("Page load timed out after {:?}", self.page_load_timeout))?
            .map_err(|e| anyhow!("Browser task aborted: {}", e))??;

        // Phase 2: retrieve the rendered content under its own deadline.
        // Closing before inspecting the result covers the error exit too.
        let retrieval = tokio::task::spawn_blocking(move || {
            let content = tab.get_content();
            let _ = tab.close(true);
            content.map_err(|e| anyhow!("Content retrieval failed: {}", e))
        });

        let html = tokio::time::timeout(self.content_timeout, retrieval)
            .await
            .map_err(|_| anyhow!("Content retrieval timed out after {:?}", self.content_timeout))?
            .map_err(|e| anyhow!("Browser task aborted: {}", e))??;

        debug!("fetched {} bytes via browser from {}", html.len(), url);
        Ok(html)
    }
}

/// Plain HTTP session. Misses JavaScript-rendered contact blocks but is
/// an order of magnitude cheaper than a Chrome process.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.page_load_timeout())
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch {}: {}", url, e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Non-success status {} for {}", response.status(), url));
        }

        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", url, e))?;
        debug!("fetched {} bytes via http from {}", body.len(), url);
        Ok(body)
    }
}
