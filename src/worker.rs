//! Worker pool driving the import queue.
//!
//! A fixed number of workers poll the broker for ready tasks. Each claimed
//! task's source URLs run sequentially inside that worker; parallelism comes
//! from the pool, not from fan-out within a task. Every run executes under a
//! watchdog timeout in its own spawned task, so a hung or panicking run takes
//! down neither the worker nor the pool.

use crate::broker::{TaskBroker, TaskOutcome};
use crate::config::Config;
use crate::import_run::ImportRunner;
use crate::types::{ImportStatus, ImportTask};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Supervised pool of import workers
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `config.worker.concurrency` workers polling the broker
    ///
    /// Workers run until `cancel` fires. In-flight runs finish before a worker
    /// exits; only queued work is left behind for the next startup's restore.
    pub fn start(
        broker: TaskBroker,
        runner: ImportRunner,
        config: Arc<Config>,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..config.worker.concurrency)
            .map(|worker_id| {
                let broker = broker.clone();
                let runner = runner.clone();
                let config = Arc::clone(&config);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, broker, runner, config, cancel).await;
                })
            })
            .collect();

        Self { handles }
    }

    /// Wait for every worker to finish
    ///
    /// Call after cancelling the token handed to [`WorkerPool::start`].
    pub async fn shutdown(self) {
        join_all(self.handles).await;
        tracing::info!("Worker pool stopped");
    }
}

/// One worker: dequeue, execute, acknowledge, repeat
async fn worker_loop(
    worker_id: usize,
    broker: TaskBroker,
    runner: ImportRunner,
    config: Arc<Config>,
    cancel: CancellationToken,
) {
    tracing::debug!(worker = worker_id, "Worker started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match broker.dequeue().await {
            Ok(Some(task)) => {
                tracing::debug!(worker = worker_id, task_id = %task.id, "Worker claimed task");
                let outcome = execute_task(&runner, &config, &task).await;
                if let Err(e) = broker.ack(&task, outcome).await {
                    tracing::error!(
                        worker = worker_id,
                        task_id = %task.id,
                        error = %e,
                        "Failed to acknowledge task"
                    );
                }
            }
            Ok(None) => {
                // Queue is idle; sleep until the next poll or shutdown
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(config.broker.poll_interval) => {}
                }
            }
            Err(e) => {
                tracing::error!(worker = worker_id, error = %e, "Dequeue failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(config.broker.poll_interval) => {}
                }
            }
        }
    }

    tracing::debug!(worker = worker_id, "Worker stopped");
}

/// Run every source URL on a task and fold the results into one outcome
///
/// The task fails if any source run fails outright; partial runs still count
/// as progress and do not fail the task.
async fn execute_task(runner: &ImportRunner, config: &Config, task: &ImportTask) -> TaskOutcome {
    let mut errors = Vec::new();

    for source_url in &task.source_urls {
        if let Some(error) = run_supervised(runner, config, source_url).await {
            errors.push(format!("{}: {}", source_url, error));
        }
    }

    if errors.is_empty() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failure {
            error: errors.join("; "),
        }
    }
}

/// Execute one run under the watchdog; returns the failure description, if any
///
/// The run is spawned so a panic is contained, and raced against the
/// configured timeout. Timed-out and panicked runs get a failed import log
/// written on their behalf, keeping the history complete.
async fn run_supervised(
    runner: &ImportRunner,
    config: &Config,
    source_url: &str,
) -> Option<String> {
    let started = Instant::now();

    let mut run = {
        let runner = runner.clone();
        let url = source_url.to_string();
        tokio::spawn(async move { runner.run(&url).await })
    };

    match tokio::time::timeout(config.worker.run_timeout, &mut run).await {
        Ok(Ok(Ok(log))) => {
            if log.status == ImportStatus::Failed {
                Some(format!("import run failed ({} items failed)", log.failed_jobs))
            } else {
                None
            }
        }
        Ok(Ok(Err(e))) => {
            tracing::error!(source = source_url, error = %e, "Import run errored");
            Some(e.to_string())
        }
        Ok(Err(join_err)) => {
            tracing::error!(source = source_url, error = %join_err, "Import run panicked");
            let reason = "import run panicked";
            if let Err(e) = runner
                .record_whole_run_failure(source_url, reason, started)
                .await
            {
                tracing::error!(source = source_url, error = %e, "Failed to log panicked run");
            }
            Some(reason.to_string())
        }
        Err(_) => {
            run.abort();
            tracing::error!(
                source = source_url,
                timeout_secs = config.worker.run_timeout.as_secs(),
                "Import run timed out"
            );
            let reason = "import run timed out";
            if let Err(e) = runner
                .record_whole_run_failure(source_url, reason, started)
                .await
            {
                tracing::error!(source = source_url, error = %e, "Failed to log timed-out run");
            }
            Some(reason.to_string())
        }
    }
}
