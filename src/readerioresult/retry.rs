//! Retrying effects under a policy.
//!
//! A [`RetryPolicy`] decides how many retries are allowed and how long to wait
//! before each one. [`retrying`] drives an action with it, handing the action
//! the current [`RetryStatus`].

use std::sync::Arc;
use std::time::Duration;

use super::ReaderIOResult;
use super::time::sleep_or_cancelled;
use crate::context::Context;
use crate::effect::Result;

/// Progress of a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryStatus {
    /// Number of retries performed so far; `0` on the first attempt.
    pub iteration: usize,
    /// Total time spent waiting between attempts.
    pub cumulative_delay: Duration,
    /// The wait before the current attempt, if it is a retry.
    pub previous_delay: Option<Duration>,
}

impl RetryStatus {
    /// The status of the first attempt.
    #[must_use]
    pub const fn start() -> Self {
        Self {
            iteration: 0,
            cumulative_delay: Duration::ZERO,
            previous_delay: None,
        }
    }

    const fn advance(self, delay: Duration) -> Self {
        Self {
            iteration: self.iteration + 1,
            cumulative_delay: self.cumulative_delay.saturating_add(delay),
            previous_delay: Some(delay),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    Immediate,
    Constant(Duration),
    Exponential(Duration),
}

/// How many times to retry and how long to wait in between.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use ctxio::readerioresult::{RetryPolicy, RetryStatus};
///
/// let policy = RetryPolicy::limit_retries(3)
///     .with_exponential_backoff(Duration::from_millis(100))
///     .capped(Duration::from_millis(250));
///
/// let first = RetryStatus::start();
/// assert_eq!(policy.next_delay(&first), Some(Duration::from_millis(100)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: Option<usize>,
    backoff: Backoff,
    cap: Option<Duration>,
}

impl RetryPolicy {
    /// Retries at most `retries` times, without waiting.
    #[must_use]
    pub const fn limit_retries(retries: usize) -> Self {
        Self {
            max_retries: Some(retries),
            backoff: Backoff::Immediate,
            cap: None,
        }
    }

    /// Retries until the action succeeds or the context fires.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_retries: None,
            backoff: Backoff::Immediate,
            cap: None,
        }
    }

    /// Waits `delay` before every retry.
    #[must_use]
    pub const fn with_constant_delay(self, delay: Duration) -> Self {
        Self {
            backoff: Backoff::Constant(delay),
            ..self
        }
    }

    /// Waits `base * 2^n` before retry `n` (counting from zero).
    #[must_use]
    pub const fn with_exponential_backoff(self, base: Duration) -> Self {
        Self {
            backoff: Backoff::Exponential(base),
            ..self
        }
    }

    /// Never waits longer than `cap` between attempts.
    #[must_use]
    pub const fn capped(self, cap: Duration) -> Self {
        Self {
            cap: Some(cap),
            ..self
        }
    }

    /// The wait before the next retry, or `None` if no retry is left.
    #[must_use]
    pub fn next_delay(&self, status: &RetryStatus) -> Option<Duration> {
        if self.max_retries.is_some_and(|max| status.iteration >= max) {
            return None;
        }
        let delay = match self.backoff {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Constant(delay) => delay,
            Backoff::Exponential(base) => {
                let exponent = u32::try_from(status.iteration).unwrap_or(u32::MAX);
                base.saturating_mul(2u32.saturating_pow(exponent))
            }
        };
        Some(self.cap.map_or(delay, |cap| delay.min(cap)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::limit_retries(5)
    }
}

/// Runs `action` and retries it while `should_retry` approves the outcome
/// and `policy` allows another attempt.
///
/// The last outcome is returned as-is. Waits between attempts stop early when
/// the context fires, and the context's cause is returned.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
/// use ctxio::readerioresult::{RetryPolicy, retrying};
///
/// let fetched = retrying(
///     RetryPolicy::limit_retries(3).with_constant_delay(Duration::from_millis(50)),
///     |_status| fetch_page(),
///     |outcome| outcome.is_err(),
/// );
/// ```
pub fn retrying<A, Action, Check>(
    policy: RetryPolicy,
    action: Action,
    should_retry: Check,
) -> ReaderIOResult<A>
where
    A: Send + 'static,
    Action: Fn(&RetryStatus) -> ReaderIOResult<A> + Send + Sync + 'static,
    Check: Fn(&Result<A>) -> bool + Send + Sync + 'static,
{
    let action = Arc::new(action);
    let should_retry = Arc::new(should_retry);

    ReaderIOResult::new(move |context: Context| {
        let action = Arc::clone(&action);
        let should_retry = Arc::clone(&should_retry);
        async move {
            let mut status = RetryStatus::start();
            loop {
                let outcome = action(&status).run(&context).await;
                if !should_retry(&outcome) {
                    return outcome;
                }
                let Some(delay) = policy.next_delay(&status) else {
                    return outcome;
                };
                if let Err(error) = &outcome {
                    tracing::debug!(
                        %error,
                        iteration = status.iteration,
                        ?delay,
                        "retrying effect"
                    );
                }
                sleep_or_cancelled(&context, delay).await?;
                status = status.advance(delay);
            }
        }
    })
}
