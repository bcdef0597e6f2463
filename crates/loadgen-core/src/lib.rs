//! Transactional workload driver for distributed SQL databases.
//!
//! This crate holds everything the load generator does that does not depend
//! on a particular database:
//!
//! - [`Record`] and the [`InsertStatement`]/[`Mutation`] shapes sent to a store
//! - [`IdGenerator`] - unique record identifiers
//! - [`LocalClock`] - timestamps in a configured civil zone
//! - [`TransactionalStore`] - the seam every database backend implements
//! - [`Driver`] - the per-record and batched transaction loops
//! - [`RetryPolicy`] - what the driver does after a failed attempt
//! - [`delete_all`] - the one-shot reset operation
//! - [`MemoryStore`] - an in-process store with failure injection
//!
//! # Architecture
//!
//! ```text
//! loadgen-core (this crate)
//!    │
//!    ├─── loadgen-postgresql  (implements TransactionalStore over tokio-postgres)
//!    └─── loadgen-mysql       (implements TransactionalStore over mysql_async)
//! ```

pub mod clock;
pub mod driver;
pub mod error;
pub mod identity;
pub mod memory;
pub mod progress;
pub mod record;
pub mod reset;
pub mod retry;
pub mod store;

pub use clock::{CivilZone, Clock, LocalClock, SystemClock};
pub use driver::{
    BatchOutcome, BatchSummary, Driver, DriverConfig, Mode, RunSummary, StatementErrorPolicy,
    StopReason, DEFAULT_BATCH_LIMIT, DEFAULT_PROGRESS_INTERVAL,
};
pub use error::{ConfigError, DriverError, StoreError};
pub use identity::{IdGenerator, RandomUuid, SeededUuid};
pub use memory::{MemoryStore, Row};
pub use record::{InsertStatement, KeySet, Mutation, Record, DEFAULT_TABLE, ID_COLUMN};
pub use reset::delete_all;
pub use retry::{Backoff, RetryForever, RetryPolicy};
pub use store::{Transaction, TransactionBody, TransactionalStore};
