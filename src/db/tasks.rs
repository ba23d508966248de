//! Durable task queue storage.
//!
//! Tasks live in the `import_tasks` table so queued work survives restarts.
//! Claiming uses a guarded UPDATE so concurrent workers never execute the same
//! task twice.

use crate::types::{Priority, QueueStats, TaskId, TaskState};
use crate::{Error, Result};

use super::{Database, TaskRow};

impl Database {
    /// Insert a new waiting task and return its id
    pub async fn insert_task(
        &self,
        source_urls: &[String],
        priority: Priority,
        now: i64,
    ) -> Result<TaskId> {
        let urls = serde_json::to_string(source_urls)?;

        let result = sqlx::query(
            r#"
            INSERT INTO import_tasks (source_urls, priority, attempt, state, available_at, enqueued_at)
            VALUES (?, ?, 0, ?, 0, ?)
            "#,
        )
        .bind(&urls)
        .bind(priority.to_i32())
        .bind(TaskState::Waiting.to_i32())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(TaskId(result.last_insert_rowid()))
    }

    /// Claim the next ready task, marking it active
    ///
    /// Ready means waiting, or delayed with its backoff elapsed. Candidates are
    /// ordered by priority descending, then enqueue time (FIFO within a
    /// priority). The claim is a guarded UPDATE: if another worker wins the
    /// race, the loser picks the next candidate.
    pub async fn claim_next_task(&self, now: i64) -> Result<Option<TaskRow>> {
        loop {
            let candidate: Option<i64> = sqlx::query_scalar(
                r#"
                SELECT id FROM import_tasks
                WHERE state = ? OR (state = ? AND available_at <= ?)
                ORDER BY priority DESC, enqueued_at ASC, id ASC
                LIMIT 1
                "#,
            )
            .bind(TaskState::Waiting.to_i32())
            .bind(TaskState::Delayed.to_i32())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

            let Some(id) = candidate else {
                return Ok(None);
            };

            let claimed = sqlx::query(
                "UPDATE import_tasks SET state = ? WHERE id = ? AND state IN (?, ?)",
            )
            .bind(TaskState::Active.to_i32())
            .bind(id)
            .bind(TaskState::Waiting.to_i32())
            .bind(TaskState::Delayed.to_i32())
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

            if claimed.rows_affected() == 1 {
                return self.get_task(TaskId(id)).await;
            }
            // Lost the race; try the next candidate
        }
    }

    /// Fetch a task by id
    pub async fn get_task(&self, id: TaskId) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, source_urls, priority, attempt, state, available_at,
                   enqueued_at, finished_at, last_error
            FROM import_tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row)
    }

    /// Mark a task completed
    pub async fn mark_task_completed(&self, id: TaskId, now: i64) -> Result<()> {
        sqlx::query(
            "UPDATE import_tasks SET state = ?, finished_at = ?, last_error = NULL WHERE id = ?",
        )
        .bind(TaskState::Completed.to_i32())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Park a failed task for a delayed retry
    ///
    /// `attempt` is the new attempt counter and `available_at` the unix
    /// timestamp before which the task must not be claimed again.
    pub async fn mark_task_delayed(
        &self,
        id: TaskId,
        attempt: i32,
        available_at: i64,
        error: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE import_tasks
            SET state = ?, attempt = ?, available_at = ?, last_error = ?
            WHERE id = ?
            "#,
        )
        .bind(TaskState::Delayed.to_i32())
        .bind(attempt)
        .bind(available_at)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Move a task to the terminal failed set
    pub async fn mark_task_failed(&self, id: TaskId, now: i64, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE import_tasks SET state = ?, finished_at = ?, last_error = ? WHERE id = ?",
        )
        .bind(TaskState::Failed.to_i32())
        .bind(now)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Return tasks left active by an unclean shutdown to the waiting queue
    ///
    /// Called once on startup, before workers begin dequeuing. Returns the
    /// number of tasks restored.
    pub async fn restore_interrupted_tasks(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE import_tasks SET state = ? WHERE state = ?")
            .bind(TaskState::Waiting.to_i32())
            .bind(TaskState::Active.to_i32())
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }

    /// Count tasks grouped by state
    pub async fn count_tasks_by_state(&self) -> Result<QueueStats> {
        let rows: Vec<(i32, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM import_tasks GROUP BY state")
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Sqlx)?;

        let mut stats = QueueStats::default();
        for (state, count) in rows {
            let count = count.max(0) as u64;
            match TaskState::from_i32(state) {
                TaskState::Waiting => stats.waiting = count,
                TaskState::Delayed => stats.delayed = count,
                TaskState::Active => stats.active = count,
                TaskState::Completed => stats.completed = count,
                TaskState::Failed => stats.failed = count,
            }
        }

        Ok(stats)
    }

    /// Prune finished tasks beyond the retention limits
    ///
    /// Keeps the newest `completed_keep` completed tasks and `failed_keep`
    /// terminally failed tasks; older ones are deleted. Returns the number of
    /// records removed.
    pub async fn prune_finished_tasks(
        &self,
        completed_keep: u64,
        failed_keep: u64,
    ) -> Result<u64> {
        let mut removed = 0;
        for (state, keep) in [
            (TaskState::Completed, completed_keep),
            (TaskState::Failed, failed_keep),
        ] {
            let result = sqlx::query(
                r#"
                DELETE FROM import_tasks
                WHERE state = ? AND id NOT IN (
                    SELECT id FROM import_tasks
                    WHERE state = ?
                    ORDER BY finished_at DESC, id DESC
                    LIMIT ?
                )
                "#,
            )
            .bind(state.to_i32())
            .bind(state.to_i32())
            .bind(keep as i64)
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

            removed += result.rows_affected();
        }

        Ok(removed)
    }
}
