//! Run configuration resolved from command-line options.

pub mod duration;

use std::time::Duration;

use anyhow::Context;
use loadgen_core::{
    Backoff, CivilZone, DriverConfig, IdGenerator, LocalClock, Mode, RandomUuid, RetryForever,
    RetryPolicy, SeededUuid, StatementErrorPolicy,
};
use tracing::warn;

use crate::LoadOpts;

pub use duration::parse_duration;

/// Validated settings for one invocation.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub connection_string: String,
    pub delete_all: bool,
    pub dry_run: bool,
    pub mode: Mode,
    pub zone: CivilZone,
    pub driver: DriverConfig,
    pub retry_backoff: Duration,
    pub retry_max_backoff: Duration,
    pub max_attempts: Option<u32>,
    pub retry_jitter: bool,
    pub seed: Option<u64>,
}

impl LoadConfig {
    pub fn from_opts(opts: &LoadOpts) -> anyhow::Result<Self> {
        let mode = match opts.mode.parse::<Mode>() {
            Ok(mode) => mode,
            Err(e) => {
                warn!("{e}; falling back to '{}'", Mode::Each);
                Mode::Each
            }
        };

        let zone: CivilZone = opts
            .timezone
            .parse()
            .with_context(|| format!("Failed to resolve timezone '{}'", opts.timezone))?;

        let deadline = opts
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
            .context("Failed to parse --timeout")?;

        if opts.table.trim().is_empty() {
            anyhow::bail!("Table name must not be empty");
        }

        let statement_errors = if opts.abort_on_statement_error {
            StatementErrorPolicy::Abort
        } else {
            StatementErrorPolicy::Continue
        };

        Ok(Self {
            connection_string: opts.connection_string.clone(),
            delete_all: opts.delete_all,
            dry_run: opts.dry_run,
            mode,
            zone,
            driver: DriverConfig {
                table: opts.table.clone(),
                progress_interval: opts.progress_interval,
                batch_limit: opts.batch_limit,
                max_records: opts.max_records,
                deadline,
                statement_errors,
            },
            retry_backoff: Duration::from_millis(opts.retry_backoff_ms),
            retry_max_backoff: Duration::from_millis(opts.retry_max_backoff_ms),
            max_attempts: opts.max_attempts,
            retry_jitter: opts.retry_jitter,
            seed: opts.seed,
        })
    }

    /// Immediate unbounded retries unless a backoff, cap or jitter was asked for.
    pub fn retry_policy(&self) -> Box<dyn RetryPolicy> {
        if self.retry_backoff.is_zero() && self.max_attempts.is_none() && !self.retry_jitter {
            return Box::new(RetryForever);
        }
        let mut backoff = Backoff::new(self.retry_backoff, self.retry_max_backoff)
            .with_jitter(self.retry_jitter);
        if let Some(max) = self.max_attempts {
            backoff = backoff.with_max_attempts(max);
        }
        Box::new(backoff)
    }

    pub fn id_generator(&self) -> Box<dyn IdGenerator> {
        match self.seed {
            Some(seed) => Box::new(SeededUuid::new(seed)),
            None => Box::new(RandomUuid),
        }
    }

    pub fn clock(&self) -> LocalClock {
        LocalClock::new(self.zone)
    }
}
