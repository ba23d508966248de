//! Core types for jobfeed

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a queued import task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for i64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for TaskId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Import task priority
///
/// Higher-priority tasks dequeue first; equal priority is FIFO by enqueue time.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority (-1)
    Low = -1,
    /// Normal priority (0)
    #[default]
    Normal = 0,
    /// High priority (1)
    High = 1,
}

impl Priority {
    /// Convert integer priority code to Priority enum
    pub fn from_i32(priority: i32) -> Self {
        match priority {
            -1 => Priority::Low,
            0 => Priority::Normal,
            1 => Priority::High,
            p if p > 1 => Priority::High,
            _ => Priority::Low,
        }
    }

    /// Convert Priority enum to integer priority code
    pub fn to_i32(&self) -> i32 {
        *self as i32
    }
}

/// State of a queued import task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Waiting in queue for a worker
    Waiting,
    /// Parked until its backoff delay elapses
    Delayed,
    /// Claimed by a worker and executing
    Active,
    /// Finished successfully
    Completed,
    /// Exhausted its retry attempts; held for manual inspection
    Failed,
}

impl TaskState {
    /// Convert integer state code to TaskState enum
    pub fn from_i32(state: i32) -> Self {
        match state {
            0 => TaskState::Waiting,
            1 => TaskState::Delayed,
            2 => TaskState::Active,
            3 => TaskState::Completed,
            4 => TaskState::Failed,
            _ => TaskState::Failed, // Default to Failed for unknown state
        }
    }

    /// Convert TaskState enum to integer state code
    pub fn to_i32(&self) -> i32 {
        match self {
            TaskState::Waiting => 0,
            TaskState::Delayed => 1,
            TaskState::Active => 2,
            TaskState::Completed => 3,
            TaskState::Failed => 4,
        }
    }
}

/// Outcome status of one import run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// Every fetched item was imported
    Success,
    /// Some items were imported, some failed
    Partial,
    /// The whole run failed, or every item failed
    Failed,
}

impl ImportStatus {
    /// Convert integer status code to ImportStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => ImportStatus::Success,
            1 => ImportStatus::Partial,
            _ => ImportStatus::Failed,
        }
    }

    /// Convert ImportStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            ImportStatus::Success => 0,
            ImportStatus::Partial => 1,
            ImportStatus::Failed => 2,
        }
    }
}

/// Feed dialect recognized by the parser
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// RSS 2.0 channel with `<item>` elements
    Rss2,
    /// Atom feed with `<entry>` elements
    Atom,
    /// Bespoke job XML (`<jobs><job>…</job></jobs>` and variants)
    JobXml,
    /// Best-effort extraction over conventionally-named elements
    Generic,
}

/// A queued unit of work: one or more source URLs to import
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportTask {
    /// Task ID
    pub id: TaskId,
    /// Source feed URLs covered by this task
    pub source_urls: Vec<String>,
    /// Dequeue priority
    pub priority: Priority,
    /// Number of times this task has been retried (0 on first execution)
    pub attempt: i32,
    /// When the task was enqueued
    pub enqueued_at: DateTime<Utc>,
}

/// A single item that failed during a run, with the reason it failed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Identifies the failed item (title or external id; `"document"` for whole-run failures)
    pub item: String,
    /// Why the item failed
    pub reason: String,
}

/// Immutable record of one source-run outcome
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportLog {
    /// Log ID
    pub id: i64,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    /// The source feed URL this run covered
    pub source_url: String,
    /// Outcome status
    pub status: ImportStatus,
    /// Number of items the feed yielded (parsed plus rejected)
    pub total_fetched: u32,
    /// Listings inserted for the first time
    pub new_jobs: u32,
    /// Listings already present that were refreshed
    pub updated_jobs: u32,
    /// Items that failed parsing or validation
    pub failed_jobs: u32,
    /// Per-item failure reasons
    pub failed_reasons: Vec<FailedItem>,
    /// Wall-clock duration of the run in milliseconds
    pub processing_time_ms: u64,
}

/// Aggregate queue counts, one per task state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks waiting for a worker
    pub waiting: u64,
    /// Tasks currently executing
    pub active: u64,
    /// Tasks finished successfully
    pub completed: u64,
    /// Tasks that exhausted their retries
    pub failed: u64,
    /// Tasks parked under backoff
    pub delayed: u64,
}

/// One page of import logs with pagination metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogPage {
    /// Logs on this page, most recent first
    pub logs: Vec<ImportLog>,
    /// 1-based page number
    pub page: u32,
    /// Page size requested
    pub limit: u32,
    /// Total log count across all pages
    pub total: u64,
    /// Total number of pages
    pub total_pages: u32,
}

/// Rolled-up import counters across all logs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsOverview {
    /// Total import runs recorded
    pub total_imports: u64,
    /// Runs with status success
    pub successful_imports: u64,
    /// Runs with status failed
    pub failed_imports: u64,
    /// Runs within the configured recent window
    pub recent_imports: u64,
    /// successful / total, in [0, 1]; 0 when no runs exist
    pub success_rate: f64,
}

/// Per-day import trend bucket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// The day this bucket covers (UTC)
    pub date: NaiveDate,
    /// Import runs that finished this day
    pub total_imports: u64,
    /// Items fetched across those runs
    pub total_jobs: u64,
    /// New listings inserted
    pub new_jobs: u64,
    /// Existing listings refreshed
    pub updated_jobs: u64,
    /// Items that failed
    pub failed_jobs: u64,
}

/// Per-source rollup across all of that source's logs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    /// The source feed URL
    pub source_url: String,
    /// Import runs recorded for this source
    pub total_imports: u64,
    /// Runs with status success
    pub successful_imports: u64,
    /// Runs with status failed
    pub failed_imports: u64,
    /// successful / total, in [0, 1]
    pub success_rate: f64,
    /// Items fetched across all runs
    pub total_jobs: u64,
    /// New listings inserted across all runs
    pub new_jobs: u64,
    /// Existing listings refreshed across all runs
    pub updated_jobs: u64,
    /// Mean run duration in milliseconds
    pub avg_processing_ms: f64,
    /// When this source was last imported
    pub last_import: Option<DateTime<Utc>>,
}

/// Full statistics bundle exposed to the reporting layer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportStats {
    /// Rolled-up counters
    pub overview: StatsOverview,
    /// Daily trend buckets, oldest first
    pub trends: Vec<TrendPoint>,
    /// Per-source rollups
    pub source_stats: Vec<SourceStats>,
}
