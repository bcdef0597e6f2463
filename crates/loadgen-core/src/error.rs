//! Error types for the workload driver and its stores.

use thiserror::Error;

/// Errors reported by a [`TransactionalStore`](crate::TransactionalStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// A statement failed inside a transaction.
    #[error("Statement failed: {message}")]
    Statement { message: String, retryable: bool },

    /// The transaction could not be started or committed.
    #[error("Commit failed: {message}")]
    Commit { message: String, retryable: bool },

    /// Applying mutations outside a transaction failed.
    #[error("Apply failed: {0}")]
    Apply(String),

    /// The connection to the database failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The handle was closed and can no longer be used.
    #[error("Store handle is closed")]
    Closed,
}

impl StoreError {
    /// Returns true when the database reported a transient conflict that a
    /// fresh attempt of the same transaction may resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Statement {
                retryable: true,
                ..
            } | StoreError::Commit {
                retryable: true,
                ..
            }
        )
    }
}

/// Errors that end a workload run.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The retry policy gave up on a record.
    #[error("Gave up on record {position} after {attempts} failed attempts: {source}")]
    RetriesExhausted {
        position: u64,
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

/// Invalid configuration values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither an IANA zone name nor a fixed UTC offset.
    #[error("Unknown timezone '{0}' (expected an IANA name such as Asia/Tokyo or an offset such as +09:00)")]
    InvalidTimezone(String),

    /// Unrecognized workload mode.
    #[error("Unknown mode '{0}' (expected 'each' or 'once')")]
    InvalidMode(String),
}
