//! Per-record enrichment: fetch a company website and extract contact
//! details, with bounded retries and absorbed failures.
//!
//! `enrich` never returns an error. A site that cannot be fetched after
//! all retries yields an empty [`ContactInfo`], which the scheduler
//! treats as "nothing found" - one bad website must never abort a batch.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::extract::{extract_contact_info, PhoneFilter};
use crate::fetcher::PageFetcher;
use crate::record::ContactInfo;

/// All tunables for one enrichment run, derived from config once and
/// shared by every worker.
#[derive(Debug, Clone)]
pub struct EnrichPolicy {
    /// Retries after the first failed attempt (total fetches = 1 + this).
    pub max_retries: u32,
    /// Fixed delay before each retry.
    pub retry_delay: Duration,
    /// Outer deadline for a whole per-record attempt, applied by the
    /// scheduler, independent of the fetcher's per-step timeouts.
    pub task_timeout: Duration,
    /// Pause between records on one worker.
    pub request_delay: Duration,
    /// Persist empty results (marking records as attempted) instead of
    /// leaving them eligible for a future pass.
    pub record_empty_results: bool,
    pub phone_filter: PhoneFilter,
}

impl EnrichPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.enrichment.max_retries,
            retry_delay: Duration::from_millis(config.enrichment.retry_delay_ms),
            task_timeout: Duration::from_secs(config.enrichment.task_timeout_secs),
            request_delay: Duration::from_millis(config.enrichment.request_delay_ms),
            record_empty_results: config.enrichment.record_empty_results,
            phone_filter: PhoneFilter {
                min_digits: config.phones.min_digits,
                allowed_area_codes: config.phones.allowed_area_codes.clone(),
            },
        }
    }
}

/// Fetch `url` with the given session and extract contact details.
///
/// The retry policy is an explicit bounded loop: attempt, and on any
/// fetch failure sleep `retry_delay` and go again, up to `max_retries`
/// retries. Exhausted retries degrade to an empty result.
pub async fn enrich(fetcher: &dyn PageFetcher, url: &str, policy: &EnrichPolicy) -> ContactInfo {
    if url.trim().is_empty() {
        return ContactInfo::default();
    }

    for attempt in 0..=policy.max_retries {
        match fetcher.fetch(url).await {
            Ok(content) => {
                let info = extract_contact_info(&content, &policy.phone_filter);
                debug!(
                    "{}: {} emails, {} phones (attempt {})",
                    url,
                    info.emails.len(),
                    info.phones.len(),
                    attempt + 1
                );
                return info;
            }
            Err(e) => {
                if attempt < policy.max_retries {
                    debug!(
                        "attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        policy.max_retries + 1,
                        url,
                        e,
                        policy.retry_delay
                    );
                    sleep(policy.retry_delay).await;
                } else {
                    warn!(
                        "all {} attempts for {} failed, last error: {}",
                        policy.max_retries + 1,
                        url,
                        e
                    );
                }
            }
        }
    }

    ContactInfo::default()
}
