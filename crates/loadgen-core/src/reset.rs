//! Bulk delete of the target table.

use tracing::info;

use crate::error::StoreError;
use crate::progress::{Spinner, SPINNER_TICK};
use crate::record::Mutation;
use crate::store::TransactionalStore;

/// Delete every row of `table`, then close the store.
///
/// The store is closed whether or not the delete succeeded. A delete error
/// takes precedence over a close error. Nothing is retried.
pub async fn delete_all<S: TransactionalStore>(store: S, table: &str) -> Result<(), StoreError> {
    info!("Deleting all rows from '{}'", table);

    let spinner = Spinner::start(SPINNER_TICK);
    let applied = store.apply(vec![Mutation::delete_all(table)]).await;
    spinner.stop().await;

    let closed = store.close().await;
    applied?;
    closed
}
