//! Error types for jobfeed
//!
//! This module provides the error taxonomy for the import pipeline:
//! - Whole-run errors (fetch failures, unparseable documents) that abort a run
//! - Per-item validation errors that are recorded but never abort a run
//! - Database and configuration errors with context

use thiserror::Error;

/// Result type alias for jobfeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for jobfeed
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker.concurrency")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Feed fetch error (network, timeout, HTTP status)
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Whole-document parse error (feed unparseable in any known dialect)
    #[error("parse error: {0}")]
    Parse(String),

    /// Per-item validation error
    ///
    /// Never aborts a run; collected into the run's failed-item reasons.
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested entity not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new imports
    #[error("shutdown in progress: not accepting new imports")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Unique constraint violation on `(external_id, source_url)`
    ///
    /// Raised when a concurrent run inserted the same listing first; callers
    /// fall back to the update path rather than surfacing this.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Feed fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request itself failed (DNS, connect, protocol)
    #[error("request for {url} failed: {source}")]
    Request {
        /// The feed URL that was being fetched
        url: String,
        /// The underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        /// The feed URL that was being fetched
        url: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// The fetch exceeded the configured timeout
    #[error("timed out fetching {url}")]
    Timeout {
        /// The feed URL that was being fetched
        url: String,
    },

    /// The response body could not be read
    #[error("failed to read body from {url}: {reason}")]
    Body {
        /// The feed URL that was being fetched
        url: String,
        /// Why the body read failed
        reason: String,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_status_error_displays_status_and_url() {
        let err = Error::Fetch(FetchError::Status {
            url: "https://jobs.example.com/feed".into(),
            status: 503,
        });
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("https://jobs.example.com/feed"));
    }

    #[test]
    fn constraint_violation_displays_context() {
        let err = Error::Database(DatabaseError::ConstraintViolation(
            "jobs.external_id, jobs.source_url".into(),
        ));
        assert!(err.to_string().contains("constraint violation"));
    }

    #[test]
    fn validation_error_wraps_reason() {
        let err = Error::Validation("missing required fields".into());
        assert_eq!(err.to_string(), "validation error: missing required fields");
    }

    #[test]
    fn parse_error_wraps_reason() {
        let err = Error::Parse("document is not RSS, Atom, or job XML".into());
        assert!(err.to_string().starts_with("parse error:"));
    }
}
