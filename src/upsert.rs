//! Idempotent job persistence.
//!
//! The upserter writes parsed candidates into the jobs table, deciding per
//! item between insert and update on the (external_id, source_url) dedup key.
//! One bad item never aborts a batch; failures are collected with reasons and
//! reported in the import log.

use crate::db::{Database, NewJob};
use crate::error::{DatabaseError, Error, Result};
use crate::parser::CandidateJob;
use crate::types::FailedItem;

/// Counters from one upsert batch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Listings inserted for the first time
    pub new_jobs: u32,
    /// Listings already present that were refreshed
    pub updated_jobs: u32,
    /// Items that failed validation or storage, with reasons
    pub failed: Vec<FailedItem>,
}

impl BatchOutcome {
    /// Fold another batch's counters into this one
    pub fn merge(&mut self, other: BatchOutcome) {
        self.new_jobs += other.new_jobs;
        self.updated_jobs += other.updated_jobs;
        self.failed.extend(other.failed);
    }
}

/// Deduplicating writer for parsed job candidates
#[derive(Clone)]
pub struct Upserter {
    db: Database,
}

impl Upserter {
    /// Create an upserter over the given database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Upsert one batch of candidates from a source feed
    ///
    /// Each item is validated, then inserted or updated. Transient storage
    /// errors get one retry; a second failure records the item as failed and
    /// the batch moves on. This never returns an error: per-item failures are
    /// data, not control flow.
    pub async fn upsert_batch(&self, jobs: &[CandidateJob], source_url: &str) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let now = chrono::Utc::now().timestamp();

        for candidate in jobs {
            let label = item_label(candidate);

            if let Err(reason) = validate(candidate) {
                tracing::debug!(item = %label, reason = %reason, "Rejected candidate");
                outcome.failed.push(FailedItem {
                    item: label,
                    reason,
                });
                continue;
            }

            let job = to_new_job(candidate, source_url);
            match self.apply_with_retry(&job, now).await {
                Ok(true) => outcome.new_jobs += 1,
                Ok(false) => outcome.updated_jobs += 1,
                Err(e) => {
                    tracing::warn!(item = %label, error = %e, "Upsert failed");
                    outcome.failed.push(FailedItem {
                        item: label,
                        reason: format!("storage error: {}", e),
                    });
                }
            }
        }

        outcome
    }

    /// Apply one candidate, retrying once on storage errors
    async fn apply_with_retry(&self, job: &NewJob, now: i64) -> Result<bool> {
        match self.apply(job, now).await {
            Ok(inserted) => Ok(inserted),
            Err(first) => {
                tracing::debug!(error = %first, "Retrying upsert once");
                self.apply(job, now).await
            }
        }
    }

    /// Insert or update one candidate; returns true when a new row was inserted
    ///
    /// A unique-key collision between the find and the insert means a
    /// concurrent run inserted the same listing first; the loser re-finds the
    /// row and applies its fields as an update instead.
    async fn apply(&self, job: &NewJob, now: i64) -> Result<bool> {
        if let Some(existing) = self.db.find_job(&job.external_id, &job.source_url).await? {
            self.db.update_job(existing.id, job, now).await?;
            return Ok(false);
        }

        match self.db.insert_job(job, now).await {
            Ok(_) => Ok(true),
            Err(Error::Database(DatabaseError::ConstraintViolation(_))) => {
                match self.db.find_job(&job.external_id, &job.source_url).await? {
                    Some(existing) => {
                        self.db.update_job(existing.id, job, now).await?;
                        Ok(false)
                    }
                    None => Err(Error::Database(DatabaseError::QueryFailed(format!(
                        "job ({}, {}) vanished after duplicate-key collision",
                        job.external_id, job.source_url
                    )))),
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// Human-readable label for a candidate in failure reports
fn item_label(candidate: &CandidateJob) -> String {
    if candidate.title.is_empty() {
        candidate.external_id.clone()
    } else {
        candidate.title.clone()
    }
}

/// Business-rule validation applied before any write
fn validate(candidate: &CandidateJob) -> std::result::Result<(), String> {
    if candidate.title.trim().is_empty() {
        return Err("missing title".into());
    }
    if candidate.company.trim().is_empty() {
        return Err("missing company".into());
    }
    for salary in [candidate.salary_min, candidate.salary_max].into_iter().flatten() {
        if salary < 0.0 {
            return Err("negative salary".into());
        }
    }
    if let (Some(min), Some(max)) = (candidate.salary_min, candidate.salary_max)
        && min > max
    {
        return Err("salary range inverted".into());
    }
    Ok(())
}

fn to_new_job(candidate: &CandidateJob, source_url: &str) -> NewJob {
    NewJob {
        external_id: candidate.external_id.clone(),
        source_url: source_url.to_string(),
        title: candidate.title.clone(),
        company: candidate.company.clone(),
        location: candidate.location.clone(),
        job_type: candidate.job_type.clone(),
        category: candidate.category.clone(),
        salary_min: candidate.salary_min,
        salary_max: candidate.salary_max,
        salary_currency: candidate.salary_currency.clone(),
        requirements: candidate.requirements.clone(),
        benefits: candidate.benefits.clone(),
        application_url: candidate.application_url.clone(),
        published_date: candidate.published_date.map(|d| d.timestamp()),
    }
}
