//! Run orchestration: a fixed pool of fetch sessions draining a shared
//! queue of eligible records.
//!
//! Each session drives one worker future; the futures are polled
//! cooperatively with `join_all`, so the number of in-flight page visits
//! never exceeds the pool size. The dataset and its backing file are
//! guarded by a single fair mutex: whoever holds it may mutate records
//! and write a snapshot, so the file on disk always reflects a
//! consistent point in the merge order.

use chrono::Utc;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::enrich::{enrich, EnrichPolicy};
use crate::fetcher::{normalize_website_url, PageFetcher};
use crate::record::ContactInfo;
use crate::store::Dataset;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Eligible records at startup.
    pub queued: usize,
    /// Records enriched with at least one email or phone.
    pub enriched: usize,
    /// Records whose attempt produced nothing.
    pub empty: usize,
}

pub struct Scheduler {
    dataset: Mutex<Dataset>,
    policy: EnrichPolicy,
}

impl Scheduler {
    pub fn new(dataset: Dataset, policy: EnrichPolicy) -> Self {
        Self {
            dataset: Mutex::new(dataset),
            policy,
        }
    }

    /// Process every eligible record with the given sessions and return
    /// the final stats. Consumes the scheduler; the dataset's last
    /// snapshot is already on disk when this returns.
    pub async fn run(self, sessions: Vec<Box<dyn PageFetcher>>) -> RunStats {
        let queued = {
            let dataset = self.dataset.lock().await;
            dataset.eligible_indexes()
        };
        let total = queued.len();
        info!("{} of the dataset's records are eligible for enrichment", total);

        if total == 0 || sessions.is_empty() {
            return RunStats {
                queued: total,
                ..Default::default()
            };
        }

        let queue: Mutex<VecDeque<usize>> = Mutex::new(queued.into_iter().collect());
        let enriched = AtomicUsize::new(0);
        let empty = AtomicUsize::new(0);

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        let workers = sessions.iter().enumerate().map(|(worker_id, session)| {
            self.worker(worker_id, session.as_ref(), &queue, &pb, &enriched, &empty)
        });
        join_all(workers).await;

        pb.finish_with_message("done");

        RunStats {
            queued: total,
            enriched: enriched.load(Ordering::SeqCst),
            empty: empty.load(Ordering::SeqCst),
        }
    }

    /// One worker: pop, fetch, extract, merge, snapshot, pause, repeat.
    async fn worker(
        &self,
        worker_id: usize,
        session: &dyn PageFetcher,
        queue: &Mutex<VecDeque<usize>>,
        pb: &ProgressBar,
        enriched: &AtomicUsize,
        empty: &AtomicUsize,
    ) {
        loop {
            let idx = match queue.lock().await.pop_front() {
                Some(idx) => idx,
                None => break,
            };

            let (url, company) = {
                let dataset = self.dataset.lock().await;
                let record = &dataset.records[idx];
                (
                    normalize_website_url(&record.company.website),
                    record.company.name.clone(),
                )
            };

            pb.set_message(format!("worker {} -> {}", worker_id, company));

            // The outer deadline wins the race against a stuck attempt.
            // The losing enrich future is dropped, not awaited further.
            let info = match timeout(self.policy.task_timeout, enrich(session, &url, &self.policy))
                .await
            {
                Ok(info) => info,
                Err(_) => {
                    warn!(
                        "enrichment of {} exceeded the {:?} task deadline, recording no result",
                        url, self.policy.task_timeout
                    );
                    ContactInfo::default()
                }
            };

            let found = !info.is_empty();
            if found {
                enriched.fetch_add(1, Ordering::SeqCst);
            } else {
                empty.fetch_add(1, Ordering::SeqCst);
            }

            // Empty results are not persisted unless configured to, so a
            // later run can retry those records.
            if found || self.policy.record_empty_results {
                let mut dataset = self.dataset.lock().await;
                dataset.records[idx].apply_enrichment(info, Utc::now());
                if let Err(e) = dataset.snapshot() {
                    warn!("snapshot after record {} failed: {}", idx, e);
                }
            }

            pb.inc(1);

            if !self.policy.request_delay.is_zero() {
                sleep(self.policy.request_delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PhoneFilter;
    use crate::store::Dataset;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct FixedFetcher {
        body: String,
    }

    #[async_trait]
    impl PageFetcher for FixedFetcher {
        async fn fetch(&self, _url: &str) -> anyhow::Result<String> {
            Ok(self.body.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl PageFetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> anyhow::Result<String> {
            Err(anyhow!("unreachable"))
        }
    }

    fn policy() -> EnrichPolicy {
        EnrichPolicy {
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
            task_timeout: Duration::from_secs(5),
            request_delay: Duration::ZERO,
            record_empty_results: false,
            phone_filter: PhoneFilter::default(),
        }
    }

    fn write_dataset(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("contacts.json");
        fs::write(&path, body).unwrap();
        path
    }

    fn two_record_dataset() -> &'static str {
        r#"[
            {"company": {"name": "Acme", "website": "https://acme.test"}},
            {"company": {"name": "Globex", "website": "https://globex.test"}}
        ]"#
    }

    #[tokio::test]
    async fn test_run_enriches_all_eligible_records() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, two_record_dataset());

        let dataset = Dataset::load(&path).unwrap();
        let scheduler = Scheduler::new(dataset, policy());
        let sessions: Vec<Box<dyn PageFetcher>> = vec![
            Box::new(FixedFetcher {
                body: "write to sales@acme.test".to_string(),
            }),
            Box::new(FixedFetcher {
                body: "write to sales@acme.test".to_string(),
            }),
        ];

        let stats = scheduler.run(sessions).await;
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.enriched, 2);
        assert_eq!(stats.empty, 0);

        let reloaded = Dataset::load(&path).unwrap();
        assert!(reloaded.eligible_indexes().is_empty());
        for record in &reloaded.records {
            let info = record.company.contact_info.as_ref().unwrap();
            assert!(info.emails.contains("sales@acme.test"));
        }
    }

    #[tokio::test]
    async fn test_empty_results_not_persisted_by_default() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, two_record_dataset());
        let before = fs::read_to_string(&path).unwrap();

        let dataset = Dataset::load(&path).unwrap();
        let scheduler = Scheduler::new(dataset, policy());
        let sessions: Vec<Box<dyn PageFetcher>> = vec![Box::new(FailingFetcher)];

        let stats = scheduler.run(sessions).await;
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.enriched, 0);
        assert_eq!(stats.empty, 2);

        // Nothing was persisted, so the file is byte-identical and the
        // records stay eligible for a future run.
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(Dataset::load(&path).unwrap().eligible_indexes().len(), 2);
    }

    #[tokio::test]
    async fn test_record_empty_results_marks_records_attempted() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, two_record_dataset());

        let dataset = Dataset::load(&path).unwrap();
        let mut policy = policy();
        policy.record_empty_results = true;
        let scheduler = Scheduler::new(dataset, policy);
        let sessions: Vec<Box<dyn PageFetcher>> = vec![Box::new(FailingFetcher)];

        let stats = scheduler.run(sessions).await;
        assert_eq!(stats.empty, 2);

        let reloaded = Dataset::load(&path).unwrap();
        assert!(reloaded.eligible_indexes().is_empty());
        for record in &reloaded.records {
            assert!(record.company.contact_info.as_ref().unwrap().is_empty());
            assert_eq!(record.crawl_history.as_ref().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_run_with_no_eligible_records_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            r#"[{"company": {"name": "Acme", "website": ""}}]"#,
        );

        let dataset = Dataset::load(&path).unwrap();
        let scheduler = Scheduler::new(dataset, policy());
        let sessions: Vec<Box<dyn PageFetcher>> = vec![Box::new(FailingFetcher)];

        let stats = scheduler.run(sessions).await;
        assert_eq!(stats, RunStats::default());
    }

    #[tokio::test]
    async fn test_task_deadline_yields_empty_result() {
        struct StuckFetcher;

        #[async_trait]
        impl PageFetcher for StuckFetcher {
            async fn fetch(&self, _url: &str) -> anyhow::Result<String> {
                sleep(Duration::from_secs(3600)).await;
                unreachable!()
            }
        }

        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            r#"[{"company": {"name": "Acme", "website": "https://acme.test"}}]"#,
        );

        let dataset = Dataset::load(&path).unwrap();
        let mut policy = policy();
        policy.task_timeout = Duration::from_millis(20);
        let scheduler = Scheduler::new(dataset, policy);
        let sessions: Vec<Box<dyn PageFetcher>> = vec![Box::new(StuckFetcher)];

        let stats = scheduler.run(sessions).await;
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.enriched, 0);
        assert_eq!(stats.empty, 1);
    }
}
