//! PostgreSQL-wire transactional store.
//!
//! Works against any database speaking the PostgreSQL protocol with
//! standard transaction semantics (PostgreSQL, CockroachDB, YugabyteDB,
//! Spanner's PostgreSQL interface).

pub mod error;
pub mod sql;
pub mod store;

pub use error::PostgreSqlStoreError;
pub use store::PostgreSqlStore;
