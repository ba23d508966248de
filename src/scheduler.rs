//! Interval scheduling of imports.
//!
//! When a schedule interval is configured, a background task periodically
//! enqueues one normal-priority task covering every configured source. The
//! scheduler only enqueues; execution, retries, and backoff stay with the
//! broker and worker pool.

use crate::broker::TaskBroker;
use crate::config::Config;
use crate::types::Priority;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Spawn the interval trigger, if scheduling is configured
///
/// Returns `None` when there is no interval or no sources to import. The
/// first scheduled import happens one full interval after startup.
pub fn spawn_interval_trigger(
    broker: TaskBroker,
    config: Arc<Config>,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let interval = config.schedule_interval?;
    if config.sources.is_empty() {
        tracing::warn!("Schedule interval configured but no sources; scheduler not started");
        return None;
    }

    Some(tokio::spawn(async move {
        run_scheduler(broker, config, interval, cancel).await;
    }))
}

async fn run_scheduler(
    broker: TaskBroker,
    config: Arc<Config>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        sources = config.sources.len(),
        "Scheduler started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; consume it so imports start one
    // interval after startup
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let source_urls: Vec<String> =
                    config.sources.iter().map(|s| s.url.clone()).collect();
                match broker.enqueue(source_urls, Priority::Normal).await {
                    Ok(task_id) => {
                        tracing::debug!(task_id = %task_id, "Scheduled import enqueued");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to enqueue scheduled import");
                    }
                }
            }
        }
    }

    tracing::info!("Scheduler stopped");
}
