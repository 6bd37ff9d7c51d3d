//! Retry combinator for fallible external calls
//!
//! A [`RetryPolicy`] runs an async operation up to `max_attempts` times,
//! sleeping for the next entry of a fixed delay schedule between attempts.

use crate::crawler::scheduler::Cancelled;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Errors that can tell the retry loop to give up early
pub trait Retryable {
    /// Returns false if another attempt cannot succeed (e.g. cancellation)
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Bounded retry policy with a fixed delay schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first
    max_attempts: u32,

    /// Delay after attempt n is `delays[n - 1]`; the last entry is reused
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// Creates a new retry policy
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Attempts including the first; values below 1 are raised to 1
    /// * `delays` - Delay schedule between attempts
    pub fn new(max_attempts: u32, delays: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delays,
        }
    }

    /// Builds a policy from millisecond delays, as found in configuration
    pub fn from_millis(max_attempts: u32, delays_ms: &[u64]) -> Self {
        Self::new(
            max_attempts,
            delays_ms.iter().copied().map(Duration::from_millis).collect(),
        )
    }

    /// A policy that makes exactly one attempt
    pub fn none() -> Self {
        Self::new(1, Vec::new())
    }

    /// Returns the maximum number of attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay slept after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.delays.is_empty() {
            return Duration::ZERO;
        }
        let index = (attempt.saturating_sub(1) as usize).min(self.delays.len() - 1);
        self.delays[index]
    }

    /// Runs `op` until it succeeds, fails non-retryably, or attempts run out
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// when every attempt failed.
    ///
    /// # Arguments
    ///
    /// * `label` - Used in log lines to identify the call being retried
    /// * `op` - The operation to run
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.run_loop(label, op, |delay| async move {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }

    /// Like [`RetryPolicy::run`], but the delay between attempts ends early
    /// with a `Cancelled` error once `cancel` fires
    ///
    /// An attempt in flight is never interrupted; `op` observes the token
    /// itself so it can release what it holds before returning.
    pub async fn run_until_cancelled<T, E, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display + From<Cancelled>,
    {
        self.run_loop(label, op, |delay| async move {
            tokio::select! {
                _ = cancel.cancelled() => Err(E::from(Cancelled)),
                _ = tokio::time::sleep(delay) => Ok(()),
            }
        })
        .await
    }

    async fn run_loop<T, E, F, Fut, P, PFut>(
        &self,
        label: &str,
        mut op: F,
        mut pause: P,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
        P: FnMut(Duration) -> PFut,
        PFut: Future<Output = Result<(), E>>,
    {
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    tracing::debug!("{} failed with a non-retryable error: {}", label, e);
                    return Err(e);
                }
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        "{} failed on final attempt {}/{}: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        "{} failed on attempt {}/{}: {} (retrying in {:?})",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    pause(delay).await?;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(3, &[1000, 5000, 10_000])
    }
}
