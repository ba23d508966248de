//! Job listing CRUD and upsert support.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, JobRow, NewJob};

impl Database {
    /// Find a job listing by its dedup key (external_id, source_url)
    pub async fn find_job(&self, external_id: &str, source_url: &str) -> Result<Option<JobRow>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, external_id, source_url, title, company, location, job_type,
                   category, salary_min, salary_max, salary_currency, requirements,
                   benefits, application_url, published_date, first_seen_at, last_seen_at
            FROM jobs
            WHERE external_id = ? AND source_url = ?
            "#,
        )
        .bind(external_id)
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row)
    }

    /// Insert a new job listing
    ///
    /// A collision on the (external_id, source_url) unique index is reported as
    /// [`DatabaseError::ConstraintViolation`] so the caller can fall back to an
    /// update when a concurrent run inserted the same listing first.
    pub async fn insert_job(&self, job: &NewJob, now: i64) -> Result<i64> {
        let requirements = serde_json::to_string(&job.requirements)?;
        let benefits = serde_json::to_string(&job.benefits)?;

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (
                external_id, source_url, title, company, location, job_type,
                category, salary_min, salary_max, salary_currency, requirements,
                benefits, application_url, published_date, first_seen_at, last_seen_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.external_id)
        .bind(&job.source_url)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.job_type)
        .bind(&job.category)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .bind(&job.salary_currency)
        .bind(&requirements)
        .bind(&benefits)
        .bind(&job.application_url)
        .bind(job.published_date)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                Error::Database(DatabaseError::ConstraintViolation(format!(
                    "job ({}, {}) already exists",
                    job.external_id, job.source_url
                )))
            } else {
                Error::Sqlx(e)
            }
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Refresh an existing job listing with newly imported fields
    ///
    /// `first_seen_at` is preserved; only `last_seen_at` and the listing fields
    /// move forward.
    pub async fn update_job(&self, id: i64, job: &NewJob, now: i64) -> Result<()> {
        let requirements = serde_json::to_string(&job.requirements)?;
        let benefits = serde_json::to_string(&job.benefits)?;

        sqlx::query(
            r#"
            UPDATE jobs
            SET title = ?, company = ?, location = ?, job_type = ?, category = ?,
                salary_min = ?, salary_max = ?, salary_currency = ?, requirements = ?,
                benefits = ?, application_url = ?, published_date = ?, last_seen_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.job_type)
        .bind(&job.category)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .bind(&job.salary_currency)
        .bind(&requirements)
        .bind(&benefits)
        .bind(&job.application_url)
        .bind(job.published_date)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Count all stored job listings
    pub async fn count_jobs(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(count)
    }
}
