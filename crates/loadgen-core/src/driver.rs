//! The workload driver.
//!
//! Two load shapes are supported:
//!
//! - [`Mode::Each`]: an unbounded sequence of transactions, one record each.
//!   A failed attempt is retried at the same position until it commits.
//! - [`Mode::Once`]: a single transaction that inserts up to
//!   [`DriverConfig::batch_limit`] records.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::LocalClock;
use crate::error::{ConfigError, DriverError, StoreError};
use crate::identity::{IdGenerator, RandomUuid};
use crate::record::{InsertStatement, Record, DEFAULT_TABLE};
use crate::retry::{RetryForever, RetryPolicy};
use crate::store::{Transaction, TransactionBody, TransactionalStore};

/// Progress is logged every this many records.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

/// Inserts attempted by a batched run.
pub const DEFAULT_BATCH_LIMIT: u64 = 10_000_000;

/// Load shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// One transaction per record.
    #[default]
    Each,
    /// One transaction holding every record.
    Once,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "each" => Ok(Mode::Each),
            "once" => Ok(Mode::Once),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Each => f.write_str("each"),
            Mode::Once => f.write_str("once"),
        }
    }
}

/// What a batched run does when one insert fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementErrorPolicy {
    /// Log the error and move on to the next insert. Retryable errors still
    /// fail the transaction, since the server has already rolled it back.
    #[default]
    Continue,
    /// Fail the whole transaction.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub table: String,
    /// 0 disables progress lines.
    pub progress_interval: u64,
    pub batch_limit: u64,
    /// Stop a per-record run after this many commits.
    pub max_records: Option<u64>,
    /// Stop a run after this much time.
    pub deadline: Option<Duration>,
    pub statement_errors: StatementErrorPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            batch_limit: DEFAULT_BATCH_LIMIT,
            max_records: None,
            deadline: None,
            statement_errors: StatementErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    DeadlineElapsed,
    RecordLimitReached,
}

/// Result of a per-record run that stopped without giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub committed: u64,
    pub failed_attempts: u64,
    pub stop_reason: StopReason,
}

#[derive(Debug)]
pub enum BatchOutcome {
    Committed,
    /// The enclosing transaction failed. Not retried.
    Failed(StoreError),
    Cancelled,
    DeadlineElapsed,
}

/// Result of a batched run.
///
/// The statement counters describe the last run of the transaction body and
/// are reported even when the transaction did not commit.
#[derive(Debug)]
pub struct BatchSummary {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed_statements: u64,
    pub rows_affected: u64,
    pub outcome: BatchOutcome,
}

impl BatchSummary {
    pub fn committed(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Committed)
    }
}

/// Drives insert transactions against a store.
pub struct Driver<S> {
    store: S,
    config: DriverConfig,
    clock: LocalClock,
    ids: Box<dyn IdGenerator>,
    retry: Box<dyn RetryPolicy>,
    cancel: CancellationToken,
}

impl<S: TransactionalStore> Driver<S> {
    /// Create a driver with random UUIDs and the retry-forever policy.
    pub fn new(store: S, config: DriverConfig, clock: LocalClock) -> Self {
        Self {
            store,
            config,
            clock,
            ids: Box::new(RandomUuid),
            retry: Box::new(RetryForever),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_retry_policy(mut self, retry: Box<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Insert one record per transaction until cancelled, the deadline
    /// elapses, `max_records` commits are reached, or the retry policy gives
    /// up.
    pub async fn run_each(&mut self) -> Result<RunSummary, DriverError> {
        let deadline = deadline_from_now(self.config.deadline);
        let interval = self.config.progress_interval;

        let mut n: u64 = 1;
        let mut failed_attempts: u64 = 0;
        let mut failures_here: u32 = 0;

        let summary = |n: u64, failed_attempts: u64, stop_reason| RunSummary {
            committed: n - 1,
            failed_attempts,
            stop_reason,
        };

        info!(
            "Inserting one record per transaction into '{}'",
            self.config.table
        );

        loop {
            if matches!(self.config.max_records, Some(limit) if n > limit) {
                return Ok(summary(n, failed_attempts, StopReason::RecordLimitReached));
            }
            if self.cancel.is_cancelled() {
                return Ok(summary(n, failed_attempts, StopReason::Cancelled));
            }

            let mut body = InsertOne {
                table: &self.config.table,
                ids: self.ids.as_mut(),
                clock: &self.clock,
            };
            let attempt = self.store.read_write_transaction(&mut body);

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Ok(summary(n, failed_attempts, StopReason::Cancelled));
                }
                _ = wait_until(deadline) => {
                    return Ok(summary(n, failed_attempts, StopReason::DeadlineElapsed));
                }
                result = attempt => result,
            };

            match result {
                Ok((record, count)) => {
                    if interval > 0 && n % interval == 0 {
                        info!("{} {} {}", n, record.id, count);
                    }
                    n += 1;
                    failures_here = 0;
                }
                Err(e) => {
                    error!("Transaction for record {} failed: {}", n, e);
                    failed_attempts += 1;
                    failures_here = failures_here.saturating_add(1);

                    let Some(delay) = self.retry.next_delay(failures_here) else {
                        return Err(DriverError::RetriesExhausted {
                            position: n,
                            attempts: failures_here,
                            source: e,
                        });
                    };

                    if delay.is_zero() {
                        tokio::task::yield_now().await;
                        continue;
                    }

                    debug!("Retrying record {} in {:?}", n, delay);
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            return Ok(summary(n, failed_attempts, StopReason::Cancelled));
                        }
                        _ = wait_until(deadline) => {
                            return Ok(summary(n, failed_attempts, StopReason::DeadlineElapsed));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Insert up to `batch_limit` records inside a single transaction.
    ///
    /// A failure of the enclosing transaction is reported in the summary and
    /// never retried.
    pub async fn run_once(&mut self) -> BatchSummary {
        let deadline = deadline_from_now(self.config.deadline);

        info!(
            "Inserting up to {} records into '{}' in one transaction",
            self.config.batch_limit, self.config.table
        );

        let mut body = InsertBatch {
            table: &self.config.table,
            ids: self.ids.as_mut(),
            clock: &self.clock,
            limit: self.config.batch_limit,
            progress_interval: self.config.progress_interval,
            policy: self.config.statement_errors,
            stats: BatchStats::default(),
        };

        let outcome = {
            let attempt = self.store.read_write_transaction(&mut body);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => BatchOutcome::Cancelled,
                _ = wait_until(deadline) => BatchOutcome::DeadlineElapsed,
                result = attempt => match result {
                    Ok(()) => BatchOutcome::Committed,
                    Err(e) => BatchOutcome::Failed(e),
                },
            }
        };

        let stats = body.stats;
        match &outcome {
            BatchOutcome::Committed => info!(
                "Batch committed: {} of {} inserts succeeded, {} rows affected",
                stats.succeeded, stats.attempted, stats.rows_affected
            ),
            BatchOutcome::Failed(e) => error!(
                "Batch failed after {} inserts ({} succeeded): {}",
                stats.attempted, stats.succeeded, e
            ),
            BatchOutcome::Cancelled => warn!(
                "Batch cancelled after {} inserts; nothing was committed",
                stats.attempted
            ),
            BatchOutcome::DeadlineElapsed => warn!(
                "Batch deadline elapsed after {} inserts; nothing was committed",
                stats.attempted
            ),
        }

        BatchSummary {
            attempted: stats.attempted,
            succeeded: stats.succeeded,
            failed_statements: stats.failed,
            rows_affected: stats.rows_affected,
            outcome,
        }
    }
}

/// A deadline too far out to represent is treated as no deadline.
fn deadline_from_now(after: Option<Duration>) -> Option<Instant> {
    after.and_then(|d| Instant::now().checked_add(d))
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Build a fresh record. Called inside the transaction body so every attempt
/// gets a new id and the time of that attempt.
fn next_record(ids: &mut dyn IdGenerator, clock: &LocalClock) -> Record {
    Record::new(ids.next_id(), clock.timestamp())
}

struct InsertOne<'a> {
    table: &'a str,
    ids: &'a mut dyn IdGenerator,
    clock: &'a LocalClock,
}

#[async_trait]
impl<'a> TransactionBody for InsertOne<'a> {
    type Output = (Record, u64);

    async fn run(&mut self, txn: &mut dyn Transaction) -> Result<Self::Output, StoreError> {
        let record = next_record(self.ids, self.clock);
        let count = txn
            .execute(&InsertStatement::for_record(self.table, &record))
            .await?;
        Ok((record, count))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct BatchStats {
    attempted: u64,
    succeeded: u64,
    failed: u64,
    rows_affected: u64,
}

struct InsertBatch<'a> {
    table: &'a str,
    ids: &'a mut dyn IdGenerator,
    clock: &'a LocalClock,
    limit: u64,
    progress_interval: u64,
    policy: StatementErrorPolicy,
    stats: BatchStats,
}

#[async_trait]
impl<'a> TransactionBody for InsertBatch<'a> {
    type Output = ();

    async fn run(&mut self, txn: &mut dyn Transaction) -> Result<(), StoreError> {
        self.stats = BatchStats::default();
        let mut last_count = 0;

        for i in 1..=self.limit {
            let record = next_record(self.ids, self.clock);
            self.stats.attempted += 1;

            match txn
                .execute(&InsertStatement::for_record(self.table, &record))
                .await
            {
                Ok(count) => {
                    self.stats.succeeded += 1;
                    self.stats.rows_affected += count;
                    last_count = count;
                }
                // A retryable error means the server rolled back the whole
                // transaction, so later inserts would no longer share it.
                Err(e) if e.is_retryable() => {
                    error!("Insert {} aborted the transaction: {}", i, e);
                    self.stats.failed += 1;
                    return Err(e);
                }
                Err(e) => match self.policy {
                    StatementErrorPolicy::Continue => {
                        error!("Insert {} failed, continuing: {}", i, e);
                        self.stats.failed += 1;
                    }
                    StatementErrorPolicy::Abort => {
                        error!("Insert {} failed, aborting batch: {}", i, e);
                        self.stats.failed += 1;
                        return Err(e);
                    }
                },
            }

            if self.progress_interval > 0 && i % self.progress_interval == 0 {
                info!("{} {} {}", i, record.id, last_count);
            }
        }
        Ok(())
    }

    fn isolate_statements(&self) -> bool {
        self.policy == StatementErrorPolicy::Continue
    }
}
