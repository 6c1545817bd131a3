//! Time-budgeted exponential backoff
//!
//! The policy knows nothing about HTTP: an operation is re-run while its
//! error satisfies the retry predicate and the elapsed budget lasts. Any other
//! error ends the loop at once, as does cancelling the token.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::constants::{
    BACKOFF_MAX_ELAPSED_FACTOR, BACKOFF_MAX_INTERVAL_FACTOR, BACKOFF_MULTIPLIER,
    DEFAULT_ZONE_POLL_INTERVAL_SECS,
};

//==============================================================================
// Policy
//==============================================================================

/// Exponential backoff parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt
    pub initial_interval: Duration,
    /// Upper bound for any single delay
    pub max_interval: Duration,
    /// Total wall-clock budget, measured from the first attempt
    pub max_elapsed: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Derives the full policy from its initial interval: delays grow by 1.5x
    /// up to 10x the initial interval, within a budget of 100x.
    pub fn from_initial(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            max_interval: initial_interval * BACKOFF_MAX_INTERVAL_FACTOR,
            max_elapsed: initial_interval * BACKOFF_MAX_ELAPSED_FACTOR,
            multiplier: BACKOFF_MULTIPLIER,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// ```text
    /// attempt 1 -> 3s, 2 -> 4.5s, 3 -> 6.75s ... capped at 30s
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_interval.as_secs_f64()))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_initial(Duration::from_secs(DEFAULT_ZONE_POLL_INTERVAL_SECS))
    }
}

//==============================================================================
// Errors
//==============================================================================

/// Why a retry loop ended without a value
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The predicate rejected the error; no further attempts were made
    #[error("{0}")]
    Permanent(E),
    /// The budget ran out while the error was still retryable
    #[error("giving up after {attempts} attempts in {elapsed:?}: {last}")]
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        last: E,
    },
    /// The cancellation token fired
    #[error("retry cancelled")]
    Cancelled,
}

//==============================================================================
// Loop
//==============================================================================

/// Runs `operation` until it succeeds, fails permanently, exhausts the policy
/// budget, or `cancel` fires.
pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    is_retryable: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        attempts = attempts.saturating_add(1);
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !is_retryable(&err) {
            return Err(RetryError::Permanent(err));
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.max_elapsed {
            return Err(RetryError::Exhausted {
                attempts,
                elapsed,
                last: err,
            });
        }

        // Never sleep past the budget; the attempt at its edge still counts.
        let delay = policy.delay_for(attempts).min(policy.max_elapsed - elapsed);
        debug!("Attempt {} failed ({}); retrying in {:?}", attempts, err, delay);

        tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

//==============================================================================
// Tests
//==============================================================================
