//! Database layer for jobfeed
//!
//! Handles SQLite persistence for job listings, import logs, and the durable
//! task queue.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`jobs`] — Job listing CRUD and upsert support
//! - [`logs`] — Import log inserts, pagination, and aggregation
//! - [`tasks`] — Durable task queue storage

use crate::types::{FailedItem, ImportLog, ImportStatus, ImportTask, Priority, TaskId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod jobs;
mod logs;
mod migrations;
mod tasks;

pub use logs::{OverviewRow, SourceRow, TrendRow};

/// SQLite-backed persistence for the import pipeline
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// New job listing to be inserted or applied as an update
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Stable identifier from the feed (or derived)
    pub external_id: String,
    /// Feed this listing came from
    pub source_url: String,
    /// Listing title
    pub title: String,
    /// Hiring company
    pub company: String,
    /// Work location
    pub location: Option<String>,
    /// Employment type
    pub job_type: Option<String>,
    /// Listing category
    pub category: Option<String>,
    /// Lower salary bound
    pub salary_min: Option<f64>,
    /// Upper salary bound
    pub salary_max: Option<f64>,
    /// Salary currency code
    pub salary_currency: Option<String>,
    /// Requirements, stored as a JSON array
    pub requirements: Vec<String>,
    /// Benefits, stored as a JSON array
    pub benefits: Vec<String>,
    /// Application link
    pub application_url: Option<String>,
    /// Publication date as a unix timestamp
    pub published_date: Option<i64>,
}

/// Job listing record from database
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    /// Unique database ID
    pub id: i64,
    /// Stable identifier from the feed (or derived)
    pub external_id: String,
    /// Feed this listing came from
    pub source_url: String,
    /// Listing title
    pub title: String,
    /// Hiring company
    pub company: String,
    /// Work location
    pub location: Option<String>,
    /// Employment type
    pub job_type: Option<String>,
    /// Listing category
    pub category: Option<String>,
    /// Lower salary bound
    pub salary_min: Option<f64>,
    /// Upper salary bound
    pub salary_max: Option<f64>,
    /// Salary currency code
    pub salary_currency: Option<String>,
    /// Requirements as a JSON array
    pub requirements: String,
    /// Benefits as a JSON array
    pub benefits: String,
    /// Application link
    pub application_url: Option<String>,
    /// Publication date as a unix timestamp
    pub published_date: Option<i64>,
    /// Unix timestamp when the listing was first imported
    pub first_seen_at: i64,
    /// Unix timestamp when the listing was last refreshed
    pub last_seen_at: i64,
}

/// New import log to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewImportLog {
    /// Unix timestamp when the run finished
    pub timestamp: i64,
    /// The source feed URL this run covered
    pub source_url: String,
    /// Outcome status code
    pub status: ImportStatus,
    /// Number of items the feed yielded
    pub total_fetched: u32,
    /// Listings inserted for the first time
    pub new_jobs: u32,
    /// Listings refreshed
    pub updated_jobs: u32,
    /// Items that failed parsing or validation
    pub failed_jobs: u32,
    /// Per-item failure reasons
    pub failed_reasons: Vec<FailedItem>,
    /// Run duration in milliseconds
    pub processing_time_ms: u64,
}

/// Import log record from database
#[derive(Debug, Clone, FromRow)]
pub struct ImportLogRow {
    /// Unique database ID
    pub id: i64,
    /// Unix timestamp when the run finished
    pub timestamp: i64,
    /// The source feed URL this run covered
    pub source_url: String,
    /// Outcome status code
    pub status: i32,
    /// Number of items the feed yielded
    pub total_fetched: i64,
    /// Listings inserted for the first time
    pub new_jobs: i64,
    /// Listings refreshed
    pub updated_jobs: i64,
    /// Items that failed
    pub failed_jobs: i64,
    /// Per-item failure reasons as a JSON array
    pub failed_reasons: String,
    /// Run duration in milliseconds
    pub processing_time_ms: i64,
}

impl From<ImportLogRow> for ImportLog {
    fn from(row: ImportLogRow) -> Self {
        ImportLog {
            id: row.id,
            timestamp: timestamp_to_datetime(row.timestamp),
            source_url: row.source_url,
            status: ImportStatus::from_i32(row.status),
            total_fetched: row.total_fetched.max(0) as u32,
            new_jobs: row.new_jobs.max(0) as u32,
            updated_jobs: row.updated_jobs.max(0) as u32,
            failed_jobs: row.failed_jobs.max(0) as u32,
            failed_reasons: serde_json::from_str(&row.failed_reasons).unwrap_or_default(),
            processing_time_ms: row.processing_time_ms.max(0) as u64,
        }
    }
}

/// Queued task record from database
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    /// Unique database ID
    pub id: i64,
    /// Source URLs as a JSON array
    pub source_urls: String,
    /// Dequeue priority code
    pub priority: i32,
    /// Retry attempt counter (0 on first execution)
    pub attempt: i32,
    /// Task state code
    pub state: i32,
    /// Unix timestamp before which a delayed task must not be claimed
    pub available_at: i64,
    /// Unix timestamp when the task was enqueued
    pub enqueued_at: i64,
    /// Unix timestamp when the task reached a terminal state
    pub finished_at: Option<i64>,
    /// Error message from the most recent failed execution
    pub last_error: Option<String>,
}

impl From<TaskRow> for ImportTask {
    fn from(row: TaskRow) -> Self {
        ImportTask {
            id: TaskId(row.id),
            source_urls: serde_json::from_str(&row.source_urls).unwrap_or_default(),
            priority: Priority::from_i32(row.priority),
            attempt: row.attempt,
            enqueued_at: timestamp_to_datetime(row.enqueued_at),
        }
    }
}

/// Convert a unix timestamp to a UTC datetime, clamping out-of-range values to the epoch
fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
