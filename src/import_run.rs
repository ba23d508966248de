//! Single-source import run execution.
//!
//! One run covers one source URL: fetch the document, parse it, upsert the
//! candidates in batches, and write exactly one import log row describing the
//! outcome. A run that fails before parsing still produces a log, so the
//! history is complete even for dead feeds.

use crate::config::Config;
use crate::db::{Database, NewImportLog};
use crate::error::Result;
use crate::fetch::Fetch;
use crate::parser;
use crate::retry::fetch_with_retry;
use crate::types::{FailedItem, ImportLog, ImportStatus};
use crate::upsert::{BatchOutcome, Upserter};
use std::sync::Arc;
use std::time::Instant;

/// Per-run accumulator for the counters that end up in the import log
#[derive(Debug, Default)]
struct RunCounters {
    total_fetched: u32,
    new_jobs: u32,
    updated_jobs: u32,
    failed: Vec<FailedItem>,
}

impl RunCounters {
    fn absorb(&mut self, batch: BatchOutcome) {
        self.new_jobs += batch.new_jobs;
        self.updated_jobs += batch.updated_jobs;
        self.failed.extend(batch.failed);
    }

    /// Derive the run status from the final counters
    ///
    /// No failures is a success (an empty feed included). All items failing is
    /// a failed run; a mix is partial.
    fn status(&self) -> ImportStatus {
        if self.failed.is_empty() {
            ImportStatus::Success
        } else if self.new_jobs == 0 && self.updated_jobs == 0 {
            ImportStatus::Failed
        } else {
            ImportStatus::Partial
        }
    }
}

/// Executes import runs and records their outcomes
#[derive(Clone)]
pub struct ImportRunner {
    fetcher: Arc<dyn Fetch>,
    db: Database,
    upserter: Upserter,
    config: Arc<Config>,
}

impl ImportRunner {
    /// Create a runner over the given fetcher and database
    pub fn new(fetcher: Arc<dyn Fetch>, db: Database, config: Arc<Config>) -> Self {
        let upserter = Upserter::new(db.clone());
        Self {
            fetcher,
            db,
            upserter,
            config,
        }
    }

    /// Execute one import run for a source URL
    ///
    /// Always writes an import log, whether the run succeeds, partially
    /// succeeds, or fails outright. Returns an error only when the log itself
    /// cannot be written.
    pub async fn run(&self, source_url: &str) -> Result<ImportLog> {
        let started = Instant::now();
        tracing::info!(source = source_url, "Starting import run");

        let content = {
            let fetcher = Arc::clone(&self.fetcher);
            let url = source_url.to_string();
            fetch_with_retry(&self.config.fetch.retry, move || {
                let fetcher = Arc::clone(&fetcher);
                let url = url.clone();
                async move { fetcher.fetch(&url).await }
            })
            .await
        };

        let content = match content {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(source = source_url, error = %e, "Import run failed to fetch");
                return self
                    .record_whole_run_failure(source_url, &e.to_string(), started)
                    .await;
            }
        };

        let dialect = self.config.source(source_url).and_then(|s| s.dialect);
        let outcome = match parser::parse(&content, dialect) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(source = source_url, error = %e, "Import run failed to parse");
                return self
                    .record_whole_run_failure(source_url, &e.to_string(), started)
                    .await;
            }
        };

        let mut counters = RunCounters {
            total_fetched: (outcome.jobs.len() + outcome.failed.len()) as u32,
            failed: outcome.failed,
            ..RunCounters::default()
        };

        let batch_size = self
            .config
            .source(source_url)
            .and_then(|s| s.batch_size)
            .unwrap_or(self.config.worker.batch_size);

        for chunk in outcome.jobs.chunks(batch_size.max(1)) {
            let batch = self.upserter.upsert_batch(chunk, source_url).await;
            counters.absorb(batch);
        }

        let log = self.write_log(source_url, counters, started).await?;
        tracing::info!(
            source = source_url,
            status = ?log.status,
            total = log.total_fetched,
            new = log.new_jobs,
            updated = log.updated_jobs,
            failed = log.failed_jobs,
            elapsed_ms = log.processing_time_ms,
            "Import run finished"
        );
        Ok(log)
    }

    /// Record a run that failed before any item could be processed
    ///
    /// Also used by the worker pool for runs killed by the watchdog timeout,
    /// so even aborted runs leave a log row.
    pub(crate) async fn record_whole_run_failure(
        &self,
        source_url: &str,
        reason: &str,
        started: Instant,
    ) -> Result<ImportLog> {
        let counters = RunCounters {
            failed: vec![FailedItem {
                item: "document".to_string(),
                reason: reason.to_string(),
            }],
            ..RunCounters::default()
        };
        self.write_log(source_url, counters, started).await
    }

    async fn write_log(
        &self,
        source_url: &str,
        counters: RunCounters,
        started: Instant,
    ) -> Result<ImportLog> {
        let timestamp = chrono::Utc::now();
        let processing_time_ms = started.elapsed().as_millis() as u64;
        let status = counters.status();

        let new_log = NewImportLog {
            timestamp: timestamp.timestamp(),
            source_url: source_url.to_string(),
            status,
            total_fetched: counters.total_fetched,
            new_jobs: counters.new_jobs,
            updated_jobs: counters.updated_jobs,
            failed_jobs: counters.failed.len() as u32,
            failed_reasons: counters.failed.clone(),
            processing_time_ms,
        };
        let id = self.db.insert_import_log(&new_log).await?;

        Ok(ImportLog {
            id,
            timestamp,
            source_url: source_url.to_string(),
            status,
            total_fetched: counters.total_fetched,
            new_jobs: counters.new_jobs,
            updated_jobs: counters.updated_jobs,
            failed_jobs: counters.failed.len() as u32,
            failed_reasons: counters.failed,
            processing_time_ms,
        })
    }
}
