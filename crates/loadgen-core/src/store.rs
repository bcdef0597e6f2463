//! Transactional store traits.
//!
//! These traits abstract the database client so the driver works with:
//! - PostgreSQL-wire databases (`PostgreSqlStore` in loadgen-postgresql)
//! - MySQL-wire databases (`MySqlStore` in loadgen-mysql)
//! - the in-process [`MemoryStore`](crate::MemoryStore)

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{InsertStatement, Mutation};

/// Statements available inside a read-write transaction.
#[async_trait]
pub trait Transaction: Send {
    /// Execute one insert and return the affected-row count.
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, StoreError>;
}

/// Work performed inside one read-write transaction attempt.
///
/// A store may call [`run`](TransactionBody::run) more than once for a
/// single [`read_write_transaction`](TransactionalStore::read_write_transaction)
/// call when it retries a transiently aborted attempt internally, so bodies
/// must not carry state over from a previous run.
#[async_trait]
pub trait TransactionBody: Send {
    type Output: Send;

    async fn run(&mut self, txn: &mut dyn Transaction) -> Result<Self::Output, StoreError>;

    /// Whether a failed statement must leave the rest of the transaction
    /// usable. Stores that abort the whole transaction on any error wrap each
    /// statement in a savepoint when this is true.
    fn isolate_statements(&self) -> bool {
        false
    }
}

/// Handle to the backing database.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Run `body` inside a read-write transaction and commit it.
    async fn read_write_transaction<B>(&self, body: &mut B) -> Result<B::Output, StoreError>
    where
        B: TransactionBody;

    /// Apply mutations atomically outside any transaction body.
    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), StoreError>;

    /// Release the handle. Consumes it so nothing can use it afterwards.
    async fn close(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
