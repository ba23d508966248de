//! Statistics aggregation over the import log history.
//!
//! All rollups are computed by SQL aggregation at call time; nothing is cached
//! or stored, so statistics are always consistent with the logs.

use crate::config::StatsConfig;
use crate::db::Database;
use crate::error::Result;
use crate::types::{ImportStats, SourceStats, StatsOverview, TrendPoint};
use chrono::NaiveDate;

/// Read-only reporting facade over the import logs
#[derive(Clone)]
pub struct StatsAggregator {
    db: Database,
    config: StatsConfig,
}

impl StatsAggregator {
    /// Create an aggregator over the given database
    pub fn new(db: Database, config: StatsConfig) -> Self {
        Self { db, config }
    }

    /// Rolled-up counters across all logs
    ///
    /// The "recent" counter covers the configured window ending now. With no
    /// logs at all, every counter is zero and the success rate is 0.
    pub async fn overview(&self) -> Result<StatsOverview> {
        let cutoff = chrono::Utc::now().timestamp() - self.config.recent_window.as_secs() as i64;
        let row = self.db.overview_counts(cutoff).await?;

        let success_rate = if row.total > 0 {
            row.successful as f64 / row.total as f64
        } else {
            0.0
        };

        Ok(StatsOverview {
            total_imports: row.total.max(0) as u64,
            successful_imports: row.successful.max(0) as u64,
            failed_imports: row.failed.max(0) as u64,
            recent_imports: row.recent.max(0) as u64,
            success_rate,
        })
    }

    /// Per-day trend buckets over the configured number of days, oldest first
    ///
    /// Days with no imports produce no bucket.
    pub async fn trends(&self) -> Result<Vec<TrendPoint>> {
        let since =
            chrono::Utc::now().timestamp() - (self.config.trend_days as i64) * 86_400;
        let rows = self.db.trend_rows(since).await?;

        let points = rows
            .into_iter()
            .filter_map(|row| {
                let date = NaiveDate::parse_from_str(&row.day, "%Y-%m-%d").ok()?;
                Some(TrendPoint {
                    date,
                    total_imports: row.total_imports.max(0) as u64,
                    total_jobs: row.total_jobs.max(0) as u64,
                    new_jobs: row.new_jobs.max(0) as u64,
                    updated_jobs: row.updated_jobs.max(0) as u64,
                    failed_jobs: row.failed_jobs.max(0) as u64,
                })
            })
            .collect();

        Ok(points)
    }

    /// Per-source rollups across all logs, busiest sources first
    pub async fn per_source(&self) -> Result<Vec<SourceStats>> {
        let rows = self.db.source_rows().await?;

        let stats = rows
            .into_iter()
            .map(|row| {
                let success_rate = if row.total > 0 {
                    row.successful as f64 / row.total as f64
                } else {
                    0.0
                };
                SourceStats {
                    source_url: row.source_url,
                    total_imports: row.total.max(0) as u64,
                    successful_imports: row.successful.max(0) as u64,
                    failed_imports: row.failed.max(0) as u64,
                    success_rate,
                    total_jobs: row.total_jobs.max(0) as u64,
                    new_jobs: row.new_jobs.max(0) as u64,
                    updated_jobs: row.updated_jobs.max(0) as u64,
                    avg_processing_ms: row.avg_processing_ms,
                    last_import: row
                        .last_import
                        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
                }
            })
            .collect();

        Ok(stats)
    }

    /// The full statistics bundle: overview, trends, and per-source rollups
    pub async fn import_stats(&self) -> Result<ImportStats> {
        Ok(ImportStats {
            overview: self.overview().await?,
            trends: self.trends().await?,
            source_stats: self.per_source().await?,
        })
    }
}
