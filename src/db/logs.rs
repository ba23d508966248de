//! Import log inserts, pagination, and aggregation queries.

use crate::types::ImportLog;
use crate::{Error, Result};
use sqlx::FromRow;

use super::{Database, ImportLogRow, NewImportLog};

/// Rolled-up counters across all logs, straight from SQL
#[derive(Debug, Clone, Copy, FromRow)]
pub struct OverviewRow {
    /// Total import runs recorded
    pub total: i64,
    /// Runs with status success
    pub successful: i64,
    /// Runs with status failed
    pub failed: i64,
    /// Runs at or after the recent cutoff
    pub recent: i64,
}

/// Per-day aggregation bucket, straight from SQL
#[derive(Debug, Clone, FromRow)]
pub struct TrendRow {
    /// Day in `YYYY-MM-DD` form (UTC)
    pub day: String,
    /// Import runs that finished this day
    pub total_imports: i64,
    /// Items fetched across those runs
    pub total_jobs: i64,
    /// New listings inserted
    pub new_jobs: i64,
    /// Existing listings refreshed
    pub updated_jobs: i64,
    /// Items that failed
    pub failed_jobs: i64,
}

/// Per-source aggregation, straight from SQL
#[derive(Debug, Clone, FromRow)]
pub struct SourceRow {
    /// The source feed URL
    pub source_url: String,
    /// Import runs recorded for this source
    pub total: i64,
    /// Runs with status success
    pub successful: i64,
    /// Runs with status failed
    pub failed: i64,
    /// Items fetched across all runs
    pub total_jobs: i64,
    /// New listings inserted across all runs
    pub new_jobs: i64,
    /// Existing listings refreshed across all runs
    pub updated_jobs: i64,
    /// Mean run duration in milliseconds
    pub avg_processing_ms: f64,
    /// Unix timestamp of the most recent run
    pub last_import: Option<i64>,
}

impl Database {
    /// Insert an import log record
    pub async fn insert_import_log(&self, log: &NewImportLog) -> Result<i64> {
        let failed_reasons = serde_json::to_string(&log.failed_reasons)?;

        let result = sqlx::query(
            r#"
            INSERT INTO import_logs (
                timestamp, source_url, status, total_fetched, new_jobs,
                updated_jobs, failed_jobs, failed_reasons, processing_time_ms
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.timestamp)
        .bind(&log.source_url)
        .bind(log.status.to_i32())
        .bind(log.total_fetched as i64)
        .bind(log.new_jobs as i64)
        .bind(log.updated_jobs as i64)
        .bind(log.failed_jobs as i64)
        .bind(&failed_reasons)
        .bind(log.processing_time_ms as i64)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(result.last_insert_rowid())
    }

    /// Query import logs with pagination, most recent first
    pub async fn query_import_logs(&self, limit: usize, offset: usize) -> Result<Vec<ImportLog>> {
        let rows = sqlx::query_as::<_, ImportLogRow>(
            r#"
            SELECT id, timestamp, source_url, status, total_fetched, new_jobs,
                   updated_jobs, failed_jobs, failed_reasons, processing_time_ms
            FROM import_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(ImportLog::from).collect())
    }

    /// Count all import log records
    pub async fn count_import_logs(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM import_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(count)
    }

    /// Aggregate overview counters across all logs
    ///
    /// `recent_cutoff` is the unix timestamp at the start of the recent window.
    pub async fn overview_counts(&self, recent_cutoff: i64) -> Result<OverviewRow> {
        let row = sqlx::query_as::<_, OverviewRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 0 THEN 1 ELSE 0 END), 0) AS successful,
                COALESCE(SUM(CASE WHEN status = 2 THEN 1 ELSE 0 END), 0) AS failed,
                COALESCE(SUM(CASE WHEN timestamp >= ? THEN 1 ELSE 0 END), 0) AS recent
            FROM import_logs
            "#,
        )
        .bind(recent_cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row)
    }

    /// Aggregate per-day trend buckets for logs at or after `since`, oldest first
    pub async fn trend_rows(&self, since: i64) -> Result<Vec<TrendRow>> {
        let rows = sqlx::query_as::<_, TrendRow>(
            r#"
            SELECT
                date(timestamp, 'unixepoch') AS day,
                COUNT(*) AS total_imports,
                COALESCE(SUM(total_fetched), 0) AS total_jobs,
                COALESCE(SUM(new_jobs), 0) AS new_jobs,
                COALESCE(SUM(updated_jobs), 0) AS updated_jobs,
                COALESCE(SUM(failed_jobs), 0) AS failed_jobs
            FROM import_logs
            WHERE timestamp >= ?
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows)
    }

    /// Aggregate per-source rollups across all logs, busiest sources first
    pub async fn source_rows(&self) -> Result<Vec<SourceRow>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT
                source_url,
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 0 THEN 1 ELSE 0 END), 0) AS successful,
                COALESCE(SUM(CASE WHEN status = 2 THEN 1 ELSE 0 END), 0) AS failed,
                COALESCE(SUM(total_fetched), 0) AS total_jobs,
                COALESCE(SUM(new_jobs), 0) AS new_jobs,
                COALESCE(SUM(updated_jobs), 0) AS updated_jobs,
                COALESCE(AVG(processing_time_ms), 0.0) AS avg_processing_ms,
                MAX(timestamp) AS last_import
            FROM import_logs
            GROUP BY source_url
            ORDER BY total DESC, source_url ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows)
    }
}
