//! Durable task brokering.
//!
//! The broker owns the lifecycle of queued import tasks: enqueue, claim,
//! acknowledge, retry with backoff, and retention pruning. Task state lives in
//! the database, so queued work survives restarts; [`TaskBroker::restore`]
//! returns tasks orphaned by an unclean shutdown to the queue.

use crate::config::BrokerConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{ImportTask, Priority, QueueStats, TaskId};

/// How a claimed task's execution ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Every source run completed without whole-run failure
    Success,
    /// At least one source run failed outright
    Failure {
        /// Description of what went wrong, kept on the task for inspection
        error: String,
    },
}

/// Hands out queued import tasks and tracks their outcomes
#[derive(Clone)]
pub struct TaskBroker {
    db: Database,
    config: BrokerConfig,
}

impl TaskBroker {
    /// Create a broker over the given database
    pub fn new(db: Database, config: BrokerConfig) -> Self {
        Self { db, config }
    }

    /// Enqueue a new task covering one or more source URLs
    pub async fn enqueue(&self, source_urls: Vec<String>, priority: Priority) -> Result<TaskId> {
        if source_urls.is_empty() {
            return Err(Error::Validation(
                "task must cover at least one source URL".into(),
            ));
        }

        let now = chrono::Utc::now().timestamp();
        let id = self.db.insert_task(&source_urls, priority, now).await?;

        tracing::info!(
            task_id = %id,
            sources = source_urls.len(),
            priority = ?priority,
            "Task enqueued"
        );
        Ok(id)
    }

    /// Claim the next ready task, if any
    ///
    /// Highest priority first, FIFO within a priority. Delayed tasks become
    /// eligible once their backoff has elapsed. Returns `None` when the queue
    /// has nothing ready.
    pub async fn dequeue(&self) -> Result<Option<ImportTask>> {
        let now = chrono::Utc::now().timestamp();
        let row = self.db.claim_next_task(now).await?;
        Ok(row.map(ImportTask::from))
    }

    /// Acknowledge a claimed task's outcome
    ///
    /// Success completes the task. Failure either parks it for a delayed retry
    /// with exponential backoff, or moves it to the terminal failed set once
    /// its attempts are exhausted. Finished tasks beyond the retention limits
    /// are pruned on the way out.
    pub async fn ack(&self, task: &ImportTask, outcome: TaskOutcome) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        match outcome {
            TaskOutcome::Success => {
                self.db.mark_task_completed(task.id, now).await?;
                tracing::info!(task_id = %task.id, "Task completed");
            }
            TaskOutcome::Failure { error } => {
                let executions = task.attempt + 1;
                if executions >= self.config.max_attempts {
                    self.db.mark_task_failed(task.id, now, &error).await?;
                    tracing::warn!(
                        task_id = %task.id,
                        attempts = executions,
                        error = %error,
                        "Task failed terminally, attempts exhausted"
                    );
                } else {
                    // Backoff doubles with each failed execution
                    let delay = self.config.backoff_base
                        * 2u32.saturating_pow(task.attempt.clamp(0, 16) as u32);
                    let available_at = now + delay.as_secs() as i64;
                    self.db
                        .mark_task_delayed(task.id, task.attempt + 1, available_at, &error)
                        .await?;
                    tracing::warn!(
                        task_id = %task.id,
                        attempt = task.attempt + 1,
                        retry_in_secs = delay.as_secs(),
                        error = %error,
                        "Task failed, retry scheduled"
                    );
                }
            }
        }

        let removed = self
            .db
            .prune_finished_tasks(self.config.completed_retention, self.config.failed_retention)
            .await?;
        if removed > 0 {
            tracing::debug!(removed = removed, "Pruned finished tasks beyond retention");
        }

        Ok(())
    }

    /// Aggregate queue counts by state
    pub async fn stats(&self) -> Result<QueueStats> {
        self.db.count_tasks_by_state().await
    }

    /// Return tasks orphaned by an unclean shutdown to the waiting queue
    ///
    /// Call once on startup, before any worker dequeues.
    pub async fn restore(&self) -> Result<u64> {
        let restored = self.db.restore_interrupted_tasks().await?;
        if restored > 0 {
            tracing::info!(restored = restored, "Restored interrupted tasks to queue");
        }
        Ok(restored)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
