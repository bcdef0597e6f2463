//! Error types for the MySQL store.

use loadgen_core::StoreError;
use thiserror::Error;

/// Errors that can occur while connecting to MySQL.
#[derive(Error, Debug)]
pub enum MySqlStoreError {
    /// MySQL connection or query error.
    #[error("MySQL error: {0}")]
    MySQL(#[from] mysql_async::Error),

    /// Malformed connection URL.
    #[error("Invalid MySQL connection string: {0}")]
    Url(#[from] mysql_async::UrlError),
}

impl From<MySqlStoreError> for StoreError {
    fn from(err: MySqlStoreError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

/// Server error codes after which the transaction can be run again:
/// deadlock (1213), lock wait timeout (1205) and TiDB write conflicts
/// (8002, 9007).
pub fn is_retryable_code(code: u16) -> bool {
    matches!(code, 1205 | 1213 | 8002 | 9007)
}

fn is_retryable(err: &mysql_async::Error) -> bool {
    matches!(err, mysql_async::Error::Server(server) if is_retryable_code(server.code))
}

pub(crate) fn statement_error(err: mysql_async::Error) -> StoreError {
    StoreError::Statement {
        retryable: is_retryable(&err),
        message: err.to_string(),
    }
}

pub(crate) fn commit_error(err: mysql_async::Error) -> StoreError {
    StoreError::Commit {
        retryable: is_retryable(&err),
        message: err.to_string(),
    }
}

pub(crate) fn apply_error(err: mysql_async::Error) -> StoreError {
    StoreError::Apply(err.to_string())
}
