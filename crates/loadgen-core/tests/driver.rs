//! Driver behaviour against the in-memory store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use loadgen_core::{
    Backoff, BatchOutcome, CivilZone, Clock, Driver, DriverConfig, DriverError, LocalClock,
    MemoryStore, StatementErrorPolicy, StopReason, StoreError, ID_COLUMN,
};
use tokio_util::sync::CancellationToken;

fn config() -> DriverConfig {
    DriverConfig {
        progress_interval: 100,
        ..DriverConfig::default()
    }
}

fn new_driver(store: MemoryStore, config: DriverConfig) -> Driver<MemoryStore> {
    Driver::new(store, config, LocalClock::new(CivilZone::default()))
}

/// Advances one second every time it is read.
struct SteppingClock {
    start: DateTime<Utc>,
    reads: AtomicI64,
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let step = self.reads.fetch_add(1, Ordering::SeqCst);
        self.start + chrono::Duration::seconds(step)
    }
}

#[tokio::test]
async fn test_committed_records_are_unique_and_well_formed() {
    let store = MemoryStore::new();
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            max_records: Some(500),
            ..config()
        },
    );

    let summary = driver.run_each().await.unwrap();
    assert_eq!(summary.committed, 500);
    assert_eq!(summary.failed_attempts, 0);
    assert_eq!(summary.stop_reason, StopReason::RecordLimitReached);

    let rows = store.rows("test");
    let ids: HashSet<&str> = rows.iter().map(|row| row[ID_COLUMN].as_str()).collect();
    assert_eq!(ids.len(), 500);

    for row in &rows {
        assert_eq!(row["name"], row[ID_COLUMN]);
        let time = DateTime::parse_from_rfc3339(&row["time"]).unwrap();
        assert_eq!(time.offset().local_minus_utc(), 9 * 3600);
    }
}

#[tokio::test]
async fn test_failed_commits_are_retried_until_success() {
    for failures in [0u64, 1, 5] {
        let store = MemoryStore::new().fail_first_commits(failures);
        let mut driver = new_driver(
            store.clone(),
            DriverConfig {
                max_records: Some(1),
                ..config()
            },
        );

        let summary = driver.run_each().await.unwrap();
        assert_eq!(summary.committed, 1, "failures={failures}");
        assert_eq!(summary.failed_attempts, failures);
        assert_eq!(store.row_count("test"), 1);
        assert_eq!(store.transaction_calls(), failures + 1);
    }
}

#[tokio::test]
async fn test_retries_use_fresh_ids_without_advancing_counter() {
    let store = MemoryStore::new().fail_first_commits(2);
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            max_records: Some(3),
            ..config()
        },
    );

    let summary = driver.run_each().await.unwrap();
    assert_eq!(summary.committed, 3);
    assert_eq!(summary.failed_attempts, 2);

    let attempted = store.attempted_keys();
    assert_eq!(attempted.len(), 5);
    let distinct: HashSet<&String> = attempted.iter().collect();
    assert_eq!(distinct.len(), 5);

    // The two discarded attempts belong to the first record.
    let committed: HashSet<String> = store
        .rows("test")
        .into_iter()
        .map(|row| row[ID_COLUMN].clone())
        .collect();
    assert!(!committed.contains(&attempted[0]));
    assert!(!committed.contains(&attempted[1]));
    assert!(committed.contains(&attempted[2]));
}

#[tokio::test]
async fn test_retries_use_time_of_committing_attempt() {
    let store = MemoryStore::new().fail_first_commits(2);
    let clock = SteppingClock {
        start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        reads: AtomicI64::new(0),
    };
    let mut driver = Driver::new(
        store.clone(),
        DriverConfig {
            max_records: Some(1),
            ..config()
        },
        LocalClock::with_clock(CivilZone::default(), Arc::new(clock)),
    );

    let summary = driver.run_each().await.unwrap();
    assert_eq!(summary.committed, 1);
    assert_eq!(store.attempted_keys().len(), 3);

    let rows = store.rows("test");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["time"], "2024-01-01T09:00:02+09:00");
}

#[tokio::test]
async fn test_unrepresentable_deadline_means_no_deadline() {
    let store = MemoryStore::new();
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            max_records: Some(1),
            deadline: Some(Duration::from_secs(u64::MAX)),
            ..config()
        },
    );

    let summary = driver.run_each().await.unwrap();
    assert_eq!(summary.committed, 1);
    assert_eq!(summary.stop_reason, StopReason::RecordLimitReached);

    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            batch_limit: 3,
            deadline: Some(Duration::MAX),
            ..config()
        },
    );
    assert!(driver.run_once().await.committed());
    assert_eq!(store.row_count("test"), 4);
}

#[tokio::test]
async fn test_bounded_policy_gives_up() {
    let store = MemoryStore::new().fail_first_commits(10);
    let mut driver = new_driver(store.clone(), config()).with_retry_policy(Box::new(
        Backoff::new(Duration::ZERO, Duration::ZERO).with_max_attempts(3),
    ));

    let err = driver.run_each().await.unwrap_err();
    match err {
        DriverError::RetriesExhausted {
            position,
            attempts,
            source,
        } => {
            assert_eq!(position, 1);
            assert_eq!(attempts, 3);
            assert!(matches!(source, StoreError::Commit { .. }));
        }
    }
    assert_eq!(store.row_count("test"), 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let store = MemoryStore::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut driver = new_driver(store.clone(), config()).with_cancellation(cancel);
    let summary = driver.run_each().await.unwrap();

    assert_eq!(summary.committed, 0);
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(store.transaction_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_backoff_loop() {
    let store = MemoryStore::new().fail_first_commits(u64::MAX);
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            deadline: Some(Duration::from_secs(10)),
            ..config()
        },
    )
    .with_retry_policy(Box::new(Backoff::new(
        Duration::from_secs(1),
        Duration::from_secs(1),
    )));

    let summary = driver.run_each().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::DeadlineElapsed);
    assert_eq!(summary.committed, 0);
    assert!(summary.failed_attempts >= 1);
    assert_eq!(store.row_count("test"), 0);
}

#[tokio::test]
async fn test_batch_runs_exactly_limit_inserts_in_one_transaction() {
    let store = MemoryStore::new();
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            batch_limit: 25,
            progress_interval: 10,
            ..config()
        },
    );

    let summary = driver.run_once().await;
    assert!(summary.committed());
    assert_eq!(summary.attempted, 25);
    assert_eq!(summary.succeeded, 25);
    assert_eq!(summary.rows_affected, 25);
    assert_eq!(store.transaction_calls(), 1);
    assert_eq!(store.statements_seen(), 25);
    assert_eq!(store.row_count("test"), 25);
}

#[tokio::test]
async fn test_batch_swallows_statement_errors() {
    let store = MemoryStore::new().fail_every_statement(5);
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            batch_limit: 25,
            ..config()
        },
    );

    let summary = driver.run_once().await;
    assert!(summary.committed());
    assert_eq!(summary.attempted, 25);
    assert_eq!(summary.failed_statements, 5);
    assert_eq!(summary.succeeded, 20);
    assert_eq!(store.row_count("test"), 20);
}

#[tokio::test]
async fn test_batch_abort_policy_fails_transaction() {
    let store = MemoryStore::new().fail_every_statement(5);
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            batch_limit: 25,
            statement_errors: StatementErrorPolicy::Abort,
            ..config()
        },
    );

    let summary = driver.run_once().await;
    assert!(matches!(
        summary.outcome,
        BatchOutcome::Failed(StoreError::Statement { .. })
    ));
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(store.row_count("test"), 0);
}

#[tokio::test]
async fn test_batch_transaction_abort_is_not_swallowed() {
    let store = MemoryStore::new().fail_statement_retryable(4);
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            batch_limit: 10,
            ..config()
        },
    );

    let summary = driver.run_once().await;
    assert!(matches!(
        summary.outcome,
        BatchOutcome::Failed(StoreError::Statement {
            retryable: true,
            ..
        })
    ));
    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed_statements, 1);
    assert_eq!(store.statements_seen(), 4);
    assert_eq!(store.row_count("test"), 0);
}

#[tokio::test]
async fn test_batch_rerun_by_store_counts_last_run_only() {
    let store = MemoryStore::new()
        .fail_statement_retryable(4)
        .with_internal_retries(1);
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            batch_limit: 10,
            ..config()
        },
    );

    let summary = driver.run_once().await;
    assert!(summary.committed());
    assert_eq!(summary.attempted, 10);
    assert_eq!(summary.succeeded, 10);
    assert_eq!(summary.failed_statements, 0);
    assert_eq!(summary.rows_affected, 10);

    // One driver call, two body runs: 4 statements then 10.
    assert_eq!(store.transaction_calls(), 1);
    assert_eq!(store.statements_seen(), 14);
    assert_eq!(store.row_count("test"), 10);
}

#[tokio::test]
async fn test_batch_commit_failure_is_not_retried() {
    let store = MemoryStore::new().fail_first_commits(1);
    let mut driver = new_driver(
        store.clone(),
        DriverConfig {
            batch_limit: 25,
            ..config()
        },
    );

    let summary = driver.run_once().await;
    assert!(matches!(
        summary.outcome,
        BatchOutcome::Failed(StoreError::Commit { .. })
    ));
    assert_eq!(summary.attempted, 25);
    assert_eq!(store.transaction_calls(), 1);
    assert_eq!(store.row_count("test"), 0);
}

#[tokio::test]
async fn test_fixed_offset_zone() {
    let store = MemoryStore::new();
    let mut driver = Driver::new(
        store.clone(),
        DriverConfig {
            max_records: Some(3),
            ..config()
        },
        LocalClock::new("-03:00".parse().unwrap()),
    );

    driver.run_each().await.unwrap();
    for row in store.rows("test") {
        assert!(row["time"].ends_with("-03:00"), "{}", row["time"]);
    }
}
