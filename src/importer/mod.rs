//! Top-level import pipeline facade.
//!
//! [`JobImporter`] wires the whole pipeline together: database, broker,
//! fetcher, worker pool, and the optional scheduler. Embedders construct one
//! importer, trigger or schedule imports, and read queue statistics, logs, and
//! aggregate statistics from it.

use crate::broker::TaskBroker;
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetch::HttpFetcher;
use crate::import_run::ImportRunner;
use crate::scheduler::spawn_interval_trigger;
use crate::stats::StatsAggregator;
use crate::types::{ImportStats, LogPage, Priority, QueueStats, TaskId};
use crate::worker::WorkerPool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Maximum page size accepted by [`JobImporter::import_logs`]
const MAX_LOG_PAGE_SIZE: u32 = 100;

/// The assembled import pipeline
pub struct JobImporter {
    db: Database,
    broker: TaskBroker,
    stats: StatsAggregator,
    cancel: CancellationToken,
    workers: Mutex<Option<WorkerPool>>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl JobImporter {
    /// Create and start the import pipeline
    ///
    /// Validates the configuration, opens the database (running migrations),
    /// restores tasks interrupted by a previous unclean shutdown, and starts
    /// the worker pool and, when configured, the interval scheduler.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let db = Database::new(&config.database_path).await?;
        let broker = TaskBroker::new(db.clone(), config.broker.clone());

        // Tasks left active by a crash go back to the queue before any
        // worker starts dequeuing
        broker.restore().await?;

        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        let runner = ImportRunner::new(fetcher, db.clone(), Arc::clone(&config));
        let stats = StatsAggregator::new(db.clone(), config.stats.clone());

        let cancel = CancellationToken::new();
        let workers = WorkerPool::start(
            broker.clone(),
            runner,
            Arc::clone(&config),
            cancel.clone(),
        );
        let scheduler = spawn_interval_trigger(broker.clone(), Arc::clone(&config), cancel.clone());

        tracing::info!(
            workers = config.worker.concurrency,
            sources = config.sources.len(),
            scheduled = scheduler.is_some(),
            "Job importer started"
        );

        Ok(Self {
            db,
            broker,
            stats,
            cancel,
            workers: Mutex::new(Some(workers)),
            scheduler: Mutex::new(scheduler),
        })
    }

    /// Enqueue an import task for the given source URLs
    ///
    /// Returns the task id for later correlation with queue statistics.
    pub async fn trigger_import(
        &self,
        source_urls: Vec<String>,
        priority: Priority,
    ) -> Result<TaskId> {
        if self.cancel.is_cancelled() {
            return Err(Error::ShuttingDown);
        }
        self.broker.enqueue(source_urls, priority).await
    }

    /// Aggregate queue counts by task state
    pub async fn queue_stats(&self) -> Result<QueueStats> {
        self.broker.stats().await
    }

    /// Read a page of import logs, most recent first
    ///
    /// `page` is 1-based; `limit` is clamped to 1..=100.
    pub async fn import_logs(&self, page: u32, limit: u32) -> Result<LogPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_LOG_PAGE_SIZE);
        let offset = (page as usize - 1) * limit as usize;

        let logs = self.db.query_import_logs(limit as usize, offset).await?;
        let total = self.db.count_import_logs().await?.max(0) as u64;
        let total_pages = (total.div_ceil(limit as u64)) as u32;

        Ok(LogPage {
            logs,
            page,
            limit,
            total,
            total_pages,
        })
    }

    /// The full statistics bundle: overview, trends, and per-source rollups
    pub async fn import_stats(&self) -> Result<ImportStats> {
        self.stats.import_stats().await
    }

    /// Stop the pipeline gracefully
    ///
    /// Signals the scheduler and workers to stop, waits for in-flight runs to
    /// finish, and closes the database. Queued tasks stay in the database and
    /// are picked up by the next startup. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Job importer shutting down");
        self.cancel.cancel();

        let scheduler = self.scheduler.lock().await.take();
        if let Some(handle) = scheduler
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }

        if let Some(workers) = self.workers.lock().await.take() {
            workers.shutdown().await;
        }

        self.db.close().await;
        tracing::info!("Job importer stopped");
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.database_path = dir.path().join("jobfeed.db");
        config.broker.poll_interval = std::time::Duration::from_millis(10);
        config
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.worker.concurrency = 0;

        assert!(JobImporter::new(config).await.is_err());
    }

    #[tokio::test]
    async fn trigger_import_enqueues_a_task() {
        let dir = TempDir::new().unwrap();
        let importer = JobImporter::new(config_in(&dir)).await.unwrap();

        let id = importer
            .trigger_import(
                vec!["https://jobs.example.invalid/feed".to_string()],
                Priority::High,
            )
            .await
            .unwrap();
        assert!(id.get() > 0);

        importer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn trigger_import_rejects_empty_source_list() {
        let dir = TempDir::new().unwrap();
        let importer = JobImporter::new(config_in(&dir)).await.unwrap();

        let err = importer
            .trigger_import(Vec::new(), Priority::Normal)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {err:?}");

        importer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn trigger_after_shutdown_is_refused() {
        let dir = TempDir::new().unwrap();
        let importer = JobImporter::new(config_in(&dir)).await.unwrap();
        importer.shutdown().await.unwrap();

        let err = importer
            .trigger_import(
                vec!["https://jobs.example.invalid/feed".to_string()],
                Priority::Normal,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ShuttingDown), "got {err:?}");
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let importer = JobImporter::new(config_in(&dir)).await.unwrap();

        importer.shutdown().await.unwrap();
        importer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn empty_log_page_has_sane_pagination() {
        let dir = TempDir::new().unwrap();
        let importer = JobImporter::new(config_in(&dir)).await.unwrap();

        let page = importer.import_logs(0, 0).await.unwrap();
        assert_eq!(page.page, 1, "page is clamped to 1-based");
        assert_eq!(page.limit, 1, "limit is clamped to at least 1");
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.logs.is_empty());

        importer.shutdown().await.unwrap();
    }
}
