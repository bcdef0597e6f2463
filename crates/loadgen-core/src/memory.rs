//! In-process transactional store.
//!
//! Used by tests and by dry runs. Inserts are buffered per transaction and
//! applied at commit, so a failed attempt leaves no rows behind. Failures can
//! be injected at commit time or at statement granularity, and the store can
//! re-run a body after a retryable failure like the SQL stores do.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::identity::{IdGenerator, RandomUuid};
use crate::record::{InsertStatement, KeySet, Mutation, ID_COLUMN};
use crate::store::{Transaction, TransactionBody, TransactionalStore};

/// Column name to value.
pub type Row = BTreeMap<String, String>;

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, BTreeMap<String, Row>>,
    failing_commits: u64,
    statement_failure_every: Option<u64>,
    retryable_statement_failure: Option<u64>,
    internal_retries: u32,
    statements_seen: u64,
    transaction_calls: u64,
    attempted_keys: Vec<String>,
    closed: bool,
}

impl MemoryState {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn contains(&self, table: &str, key: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|rows| rows.contains_key(key))
    }
}

/// Cloneable handle; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` commits with a retryable error.
    pub fn fail_first_commits(self, count: u64) -> Self {
        self.lock().failing_commits = count;
        self
    }

    /// Fail every `every`-th statement executed inside a transaction.
    pub fn fail_every_statement(self, every: u64) -> Self {
        self.lock().statement_failure_every = (every > 0).then_some(every);
        self
    }

    /// Fail the `nth` statement executed against the store, counting from 1,
    /// with a retryable error. Fires once.
    pub fn fail_statement_retryable(self, nth: u64) -> Self {
        self.lock().retryable_statement_failure = Some(nth);
        self
    }

    /// Re-run a transaction body up to `retries` times after a retryable
    /// failure, the way the SQL stores do.
    pub fn with_internal_retries(self, retries: u32) -> Self {
        self.lock().internal_retries = retries;
        self
    }

    /// Insert `count` rows with random keys outside any transaction.
    pub fn seed_rows(&self, table: &str, count: usize) {
        let mut ids = RandomUuid;
        let mut state = self.lock();
        let rows = state.tables.entry(table.to_string()).or_default();
        for _ in 0..count {
            let id = ids.next_id();
            let row: Row = [
                (ID_COLUMN.to_string(), id.clone()),
                ("name".to_string(), id.clone()),
                ("time".to_string(), String::new()),
            ]
            .into_iter()
            .collect();
            rows.insert(id, row);
        }
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, BTreeMap::len)
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock()
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of `read_write_transaction` calls made against the store.
    pub fn transaction_calls(&self) -> u64 {
        self.lock().transaction_calls
    }

    /// Number of statements executed, including failed ones.
    pub fn statements_seen(&self) -> u64 {
        self.lock().statements_seen
    }

    /// Primary key of every statement executed, in order, including ones
    /// whose statement or transaction later failed.
    pub fn attempted_keys(&self) -> Vec<String> {
        self.lock().attempted_keys.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.ensure_open()?;
        state.transaction_calls += 1;
        Ok(())
    }

    fn commit(&self, pending: Vec<(String, String, Row)>) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.ensure_open()?;
        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(StoreError::Commit {
                message: "injected commit failure".to_string(),
                retryable: true,
            });
        }
        if let Some((table, key, _)) = pending
            .iter()
            .find(|(table, key, _)| state.contains(table, key))
        {
            return Err(StoreError::Commit {
                message: format!("duplicate key '{key}' in table '{table}'"),
                retryable: false,
            });
        }
        for (table, key, row) in pending {
            state.tables.entry(table).or_default().insert(key, row);
        }
        Ok(())
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    pending: Vec<(String, String, Row)>,
}

#[async_trait]
impl<'a> Transaction for MemoryTransaction<'a> {
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, StoreError> {
        let mut state = self.store.lock();
        state.ensure_open()?;

        let key = statement.key().unwrap_or_default().to_string();
        state.statements_seen += 1;
        state.attempted_keys.push(key.clone());

        if state.retryable_statement_failure == Some(state.statements_seen) {
            state.retryable_statement_failure = None;
            return Err(StoreError::Statement {
                message: format!(
                    "injected transaction abort at statement {}",
                    state.statements_seen
                ),
                retryable: true,
            });
        }

        if matches!(state.statement_failure_every, Some(every) if state.statements_seen % every == 0)
        {
            return Err(StoreError::Statement {
                message: format!("injected failure for statement {}", state.statements_seen),
                retryable: false,
            });
        }

        let duplicate = state.contains(&statement.table, &key)
            || self
                .pending
                .iter()
                .any(|(table, pending_key, _)| *table == statement.table && *pending_key == key);
        if duplicate {
            return Err(StoreError::Statement {
                message: format!("duplicate key '{key}' in table '{}'", statement.table),
                retryable: false,
            });
        }

        let row: Row = statement
            .values
            .iter()
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();
        self.pending.push((statement.table.clone(), key, row));
        Ok(1)
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    async fn read_write_transaction<B>(&self, body: &mut B) -> Result<B::Output, StoreError>
    where
        B: TransactionBody,
    {
        self.begin()?;
        let retries = self.lock().internal_retries;

        let mut attempt = 0;
        loop {
            let mut txn = MemoryTransaction {
                store: self,
                pending: Vec::new(),
            };
            let result = match body.run(&mut txn).await {
                Ok(output) => self.commit(txn.pending).map(|()| output),
                Err(e) => Err(e),
            };
            match result {
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() && attempt < retries => {
                    attempt += 1;
                    debug!("Re-running transaction body (attempt {}/{}): {}", attempt, retries, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.ensure_open()?;
        for mutation in mutations {
            match mutation {
                Mutation::Delete {
                    table,
                    keys: KeySet::All,
                } => {
                    if let Some(rows) = state.tables.get_mut(&table) {
                        rows.clear();
                    }
                }
                Mutation::Delete {
                    table,
                    keys: KeySet::Keys(keys),
                } => {
                    if let Some(rows) = state.tables.get_mut(&table) {
                        for key in &keys {
                            rows.remove(key);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn close(self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.ensure_open()?;
        state.closed = true;
        Ok(())
    }
}
