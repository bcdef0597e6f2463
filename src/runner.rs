//! Top-level orchestration: reset or run a workload, then release the store.

use loadgen_core::{delete_all, BatchSummary, Driver, Mode, RunSummary, TransactionalStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::LoadConfig;

/// What an invocation did.
#[derive(Debug)]
pub enum Outcome {
    /// Every row of the target table was deleted. No workload ran.
    Reset,
    PerRecord(RunSummary),
    Batched(BatchSummary),
}

/// Run the operation selected by `config` against `store`.
///
/// The store is always closed before returning. A reset excludes any
/// workload. Driver errors take precedence over close errors.
pub async fn run<S: TransactionalStore>(
    config: LoadConfig,
    store: S,
    cancel: CancellationToken,
) -> anyhow::Result<Outcome> {
    if config.delete_all {
        delete_all(store, &config.driver.table).await?;
        return Ok(Outcome::Reset);
    }

    let mut driver = Driver::new(store, config.driver.clone(), config.clock())
        .with_id_generator(config.id_generator())
        .with_retry_policy(config.retry_policy())
        .with_cancellation(cancel);

    info!("Mode: {}, timezone: {}", config.mode, config.zone);

    let result = match config.mode {
        Mode::Each => driver.run_each().await.map(Outcome::PerRecord),
        Mode::Once => Ok(Outcome::Batched(driver.run_once().await)),
    };

    let closed = driver.into_store().close().await;
    let outcome = result?;
    if let Err(e) = closed {
        warn!("Failed to close store: {}", e);
    }

    match &outcome {
        Outcome::PerRecord(summary) => info!(
            "Committed {} records ({} failed attempts), stopped: {:?}",
            summary.committed, summary.failed_attempts, summary.stop_reason
        ),
        Outcome::Batched(summary) if !summary.committed() => warn!(
            "Batch did not commit: {} of {} inserts had succeeded",
            summary.succeeded, summary.attempted
        ),
        _ => {}
    }

    Ok(outcome)
}
