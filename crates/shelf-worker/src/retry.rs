//! Bounded retry with binary-exponential backoff
//!
//! [`retry`] runs an async operation until it succeeds or the
//! [`RetryPolicy`] runs out of attempts. The wait after the n-th failed
//! attempt is `base_delay * 2^n`; there is no wait after the last one.

use backon::{ExponentialBuilder, Retryable};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default number of attempts for a retried operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default backoff base.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(10);

/// Attempt bound and backoff schedule for [`retry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Exponential backoff without jitter: `2 * base`, doubling, one wait
    /// between each pair of attempts
    fn backoff(&self) -> ExponentialBuilder {
        let retries = self.attempts() - 1;
        ExponentialBuilder::default()
            .with_min_delay(self.delay_after(1))
            .with_max_delay(self.delay_after(retries.max(1)))
            .with_factor(2.0)
            .with_max_times(retries as usize)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Run `op` until it returns `Ok` or `policy.max_attempts` attempts have failed
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.attempts();
    let attempt = AtomicU32::new(0);

    (|| op(attempt.fetch_add(1, Ordering::SeqCst) + 1))
        .retry(policy.backoff())
        .notify(|err, delay| {
            warn!(
                attempt = attempt.load(Ordering::SeqCst),
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying"
            );
        })
        .await
        .map_err(|last| RetryError::Exhausted {
            attempts: attempt.load(Ordering::SeqCst),
            last,
        })
}
