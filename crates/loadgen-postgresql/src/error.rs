//! Error types for the PostgreSQL store.

use loadgen_core::StoreError;
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Errors that can occur while connecting to PostgreSQL.
#[derive(Error, Debug)]
pub enum PostgreSqlStoreError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),
}

impl From<PostgreSqlStoreError> for StoreError {
    fn from(err: PostgreSqlStoreError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

/// Serialization failures and deadlocks abort the transaction but succeed
/// when the transaction is run again.
pub fn is_retryable_code(code: &SqlState) -> bool {
    *code == SqlState::T_R_SERIALIZATION_FAILURE || *code == SqlState::T_R_DEADLOCK_DETECTED
}

fn is_retryable(err: &tokio_postgres::Error) -> bool {
    err.code().is_some_and(is_retryable_code)
}

pub(crate) fn statement_error(err: tokio_postgres::Error) -> StoreError {
    StoreError::Statement {
        retryable: is_retryable(&err),
        message: err.to_string(),
    }
}

pub(crate) fn commit_error(err: tokio_postgres::Error) -> StoreError {
    StoreError::Commit {
        retryable: is_retryable(&err),
        message: err.to_string(),
    }
}

pub(crate) fn apply_error(err: tokio_postgres::Error) -> StoreError {
    StoreError::Apply(err.to_string())
}
