//! Retry policies for failed per-record transactions.

use std::time::Duration;

use rand::Rng;

/// Decides what happens after a failed attempt.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the next attempt, or `None` to give up.
    ///
    /// `failures` counts consecutive failed attempts at the current record
    /// and is at least 1.
    fn next_delay(&self, failures: u32) -> Option<Duration>;
}

/// Retry immediately, forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetryForever;

impl RetryPolicy for RetryForever {
    fn next_delay(&self, _failures: u32) -> Option<Duration> {
        Some(Duration::ZERO)
    }
}

/// Exponential backoff with an optional attempt cap and full jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub max_attempts: Option<u32>,
    pub jitter: bool,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            max_attempts: None,
            jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    fn ceiling(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base.saturating_mul(1u32 << exponent).min(self.max)
    }
}

impl RetryPolicy for Backoff {
    fn next_delay(&self, failures: u32) -> Option<Duration> {
        if matches!(self.max_attempts, Some(max) if failures >= max) {
            return None;
        }
        let ceiling = self.ceiling(failures);
        if !self.jitter || ceiling.is_zero() {
            return Some(ceiling);
        }
        let millis = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
        Some(Duration::from_millis(millis))
    }
}
