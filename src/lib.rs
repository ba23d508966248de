//! # jobfeed
//!
//! Backend library for importing job listings from external feeds.
//!
//! ## Design Philosophy
//!
//! jobfeed is designed to be:
//! - **Durable** - Queued imports live in SQLite and survive restarts
//! - **Idempotent** - Re-importing a feed updates listings instead of duplicating them
//! - **Fault-isolated** - One bad item, or one dead feed, never stops the rest
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use jobfeed::{Config, JobImporter, Priority, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         sources: vec![SourceConfig::new("https://jobs.example.com/feed.xml")],
//!         schedule_interval: Some(std::time::Duration::from_secs(900)),
//!         ..Default::default()
//!     };
//!
//!     let importer = JobImporter::new(config).await?;
//!
//!     // Imports also run on the schedule; trigger one immediately
//!     importer
//!         .trigger_import(
//!             vec!["https://jobs.example.com/feed.xml".to_string()],
//!             Priority::High,
//!         )
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Task brokering: enqueue, claim, retry, retention
pub mod broker;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Feed fetching over HTTP
pub mod fetch;
/// Single-source import run execution
pub mod import_run;
/// Top-level pipeline facade
pub mod importer;
/// Multi-dialect feed parsing
pub mod parser;
/// Retry logic with exponential backoff
pub mod retry;
/// Interval scheduling of imports
pub mod scheduler;
/// Statistics aggregation
pub mod stats;
/// Core types
pub mod types;
/// Idempotent job persistence
pub mod upsert;
/// Worker pool driving the import queue
pub mod worker;

// Re-export commonly used types
pub use broker::{TaskBroker, TaskOutcome};
pub use config::{Config, SourceConfig};
pub use db::Database;
pub use error::{DatabaseError, Error, FetchError, Result};
pub use importer::JobImporter;
pub use parser::{CandidateJob, ParseOutcome};
pub use types::{
    Dialect, FailedItem, ImportLog, ImportStats, ImportStatus, ImportTask, LogPage, Priority,
    QueueStats, SourceStats, StatsOverview, TaskId, TaskState, TrendPoint,
};

/// Helper function to run the importer with graceful signal handling.
///
/// Waits for a termination signal and then calls the importer's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use jobfeed::{Config, JobImporter, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let importer = JobImporter::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(importer).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(importer: JobImporter) -> Result<()> {
    wait_for_signal().await;
    importer.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
