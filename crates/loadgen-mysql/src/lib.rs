//! MySQL-wire transactional store (MySQL, TiDB).

pub mod error;
pub mod sql;
pub mod store;

pub use error::MySqlStoreError;
pub use store::MySqlStore;
