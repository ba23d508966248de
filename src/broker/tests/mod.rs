use super::*;
use crate::types::TaskState;
use std::time::Duration;
use tempfile::NamedTempFile;

fn fast_config() -> BrokerConfig {
    BrokerConfig {
        max_attempts: 3,
        backoff_base: Duration::from_secs(10),
        completed_retention: 1000,
        failed_retention: 200,
        poll_interval: Duration::from_millis(10),
    }
}

async fn test_broker(config: BrokerConfig) -> (TaskBroker, Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (TaskBroker::new(db.clone(), config), db, temp_file)
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn enqueue_then_dequeue_round_trips() {
    let (broker, _db, _guard) = test_broker(fast_config()).await;

    let id = broker
        .enqueue(urls(&["https://a.example.com"]), Priority::Normal)
        .await
        .unwrap();

    let task = broker.dequeue().await.unwrap().unwrap();
    assert_eq!(task.id, id);
    assert_eq!(task.source_urls, urls(&["https://a.example.com"]));
    assert_eq!(task.attempt, 0);
}

#[tokio::test]
async fn empty_source_list_is_rejected() {
    let (broker, _db, _guard) = test_broker(fast_config()).await;

    let err = broker.enqueue(Vec::new(), Priority::Normal).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn high_priority_jumps_the_queue() {
    let (broker, _db, _guard) = test_broker(fast_config()).await;

    broker
        .enqueue(urls(&["https://normal.example.com"]), Priority::Normal)
        .await
        .unwrap();
    let high = broker
        .enqueue(urls(&["https://high.example.com"]), Priority::High)
        .await
        .unwrap();

    let first = broker.dequeue().await.unwrap().unwrap();
    assert_eq!(first.id, high);
}

#[tokio::test]
async fn success_ack_completes_the_task() {
    let (broker, db, _guard) = test_broker(fast_config()).await;

    broker
        .enqueue(urls(&["https://a.example.com"]), Priority::Normal)
        .await
        .unwrap();
    let task = broker.dequeue().await.unwrap().unwrap();
    broker.ack(&task, TaskOutcome::Success).await.unwrap();

    let row = db.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(row.state, TaskState::Completed.to_i32());
    assert!(row.finished_at.is_some());

    let stats = broker.stats().await.unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.waiting, 0);
}

#[tokio::test]
async fn failure_ack_parks_the_task_with_backoff() {
    let (broker, db, _guard) = test_broker(fast_config()).await;

    broker
        .enqueue(urls(&["https://a.example.com"]), Priority::Normal)
        .await
        .unwrap();
    let task = broker.dequeue().await.unwrap().unwrap();
    let before = chrono::Utc::now().timestamp();
    broker
        .ack(
            &task,
            TaskOutcome::Failure {
                error: "fetch failed".into(),
            },
        )
        .await
        .unwrap();

    let row = db.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(row.state, TaskState::Delayed.to_i32());
    assert_eq!(row.attempt, 1);
    assert_eq!(row.last_error.as_deref(), Some("fetch failed"));

    // First failed execution waits one base delay (10s)
    assert!(row.available_at >= before + 10);
    assert!(row.available_at <= before + 12);

    // Not claimable until the backoff elapses
    assert!(broker.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn backoff_doubles_per_failed_execution() {
    let (broker, db, _guard) = test_broker(fast_config()).await;

    broker
        .enqueue(urls(&["https://a.example.com"]), Priority::Normal)
        .await
        .unwrap();
    let task = broker.dequeue().await.unwrap().unwrap();
    broker
        .ack(
            &task,
            TaskOutcome::Failure {
                error: "fetch failed".into(),
            },
        )
        .await
        .unwrap();

    // Re-claim by bypassing the wall clock, then fail again
    let row = db.claim_next_task(i64::MAX).await.unwrap().unwrap();
    let task: ImportTask = row.into();
    assert_eq!(task.attempt, 1);

    let before = chrono::Utc::now().timestamp();
    broker
        .ack(
            &task,
            TaskOutcome::Failure {
                error: "fetch failed again".into(),
            },
        )
        .await
        .unwrap();

    // Second failed execution waits twice the base delay (20s)
    let row = db.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(row.attempt, 2);
    assert!(row.available_at >= before + 20);
    assert!(row.available_at <= before + 22);
}

#[tokio::test]
async fn exhausted_attempts_fail_terminally() {
    let (broker, db, _guard) = test_broker(fast_config()).await;

    broker
        .enqueue(urls(&["https://a.example.com"]), Priority::Normal)
        .await
        .unwrap();

    // max_attempts = 3: two delayed retries, then terminal failure
    for expected_attempt in 1..=2 {
        let row = db.claim_next_task(i64::MAX).await.unwrap().unwrap();
        let task: ImportTask = row.into();
        broker
            .ack(
                &task,
                TaskOutcome::Failure {
                    error: "still broken".into(),
                },
            )
            .await
            .unwrap();
        let row = db.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(row.attempt, expected_attempt);
        assert_eq!(row.state, TaskState::Delayed.to_i32());
    }

    let row = db.claim_next_task(i64::MAX).await.unwrap().unwrap();
    let task: ImportTask = row.into();
    broker
        .ack(
            &task,
            TaskOutcome::Failure {
                error: "still broken".into(),
            },
        )
        .await
        .unwrap();

    let row = db.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(row.state, TaskState::Failed.to_i32());
    assert_eq!(row.last_error.as_deref(), Some("still broken"));

    let stats = broker.stats().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert!(broker.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn completed_tasks_beyond_retention_are_pruned() {
    let config = BrokerConfig {
        completed_retention: 2,
        ..fast_config()
    };
    let (broker, _db, _guard) = test_broker(config).await;

    for i in 0..5 {
        broker
            .enqueue(urls(&[&format!("https://s{i}.example.com")]), Priority::Normal)
            .await
            .unwrap();
        let task = broker.dequeue().await.unwrap().unwrap();
        broker.ack(&task, TaskOutcome::Success).await.unwrap();
    }

    let stats = broker.stats().await.unwrap();
    assert_eq!(stats.completed, 2);
}

#[tokio::test]
async fn restore_requeues_orphaned_active_tasks() {
    let (broker, _db, _guard) = test_broker(fast_config()).await;

    broker
        .enqueue(urls(&["https://a.example.com"]), Priority::Normal)
        .await
        .unwrap();
    broker.dequeue().await.unwrap().unwrap();

    // Simulates a crash: the active task is stranded until restore
    assert!(broker.dequeue().await.unwrap().is_none());
    assert_eq!(broker.restore().await.unwrap(), 1);
    assert!(broker.dequeue().await.unwrap().is_some());
}

#[tokio::test]
async fn stats_reflect_queue_transitions() {
    let (broker, _db, _guard) = test_broker(fast_config()).await;

    broker
        .enqueue(urls(&["https://a.example.com"]), Priority::Normal)
        .await
        .unwrap();
    broker
        .enqueue(urls(&["https://b.example.com"]), Priority::Normal)
        .await
        .unwrap();

    let stats = broker.stats().await.unwrap();
    assert_eq!(stats.waiting, 2);

    let task = broker.dequeue().await.unwrap().unwrap();
    let stats = broker.stats().await.unwrap();
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.active, 1);

    broker
        .ack(
            &task,
            TaskOutcome::Failure {
                error: "oops".into(),
            },
        )
        .await
        .unwrap();
    let stats = broker.stats().await.unwrap();
    assert_eq!(stats.delayed, 1);
}
