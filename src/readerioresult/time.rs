//! Delays, timers and deadlines.
//!
//! A timed-out effect is not aborted. It keeps running on its own task with a
//! fired context, and the caller stops waiting for it.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::ReaderIOResult;
use crate::context::{CancelHandle, Context};
use crate::effect::{Error, Result};

/// Sleeps for `duration` unless the context fires first.
pub(crate) async fn sleep_or_cancelled(context: &Context, duration: Duration) -> Result<()> {
    tokio::select! {
        biased;
        () = context.done() => Err(context.cause().unwrap_or(Error::Cancelled)),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

impl<A: Send + 'static> ReaderIOResult<A> {
    /// Waits for `duration`, then runs the effect.
    ///
    /// If the context fires during the wait, the effect does not run and the
    /// context's cause is returned.
    #[must_use]
    pub fn delay(self, duration: Duration) -> Self {
        Self::new(move |context: Context| {
            let effect = self.clone();
            async move {
                sleep_or_cancelled(&context, duration).await?;
                effect.run(&context).await
            }
        })
    }

    /// Fails with [`Error::DeadlineExceeded`] if the effect has not finished
    /// within `timeout`.
    ///
    /// The deadline is computed each time the effect runs. If the caller's
    /// context fires first, its cause is returned instead.
    ///
    /// # Panics
    ///
    /// When run, resumes the effect's panic if it panicked before the deadline.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use std::time::Duration;
    /// use ctxio::context::Context;
    /// use ctxio::effect::Error;
    /// use ctxio::readerioresult::ReaderIOResult;
    ///
    /// let slow = ReaderIOResult::of(1).delay(Duration::from_secs(10));
    /// let bounded = slow.with_timeout(Duration::from_millis(100));
    /// assert_eq!(bounded.run(&Context::background()).await, Err(Error::DeadlineExceeded));
    /// ```
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.bounded(move |context| context.with_timeout(timeout))
    }

    /// Fails with [`Error::DeadlineExceeded`] if the effect has not finished by
    /// `deadline`.
    ///
    /// # Panics
    ///
    /// When run, resumes the effect's panic if it panicked before the deadline.
    #[must_use]
    pub fn with_deadline(self, deadline: Instant) -> Self {
        self.bounded(move |context| context.with_deadline(deadline))
    }

    fn bounded<F>(self, derive: F) -> Self
    where
        F: Fn(&Context) -> (Context, CancelHandle) + Send + Sync + 'static,
    {
        let derive = Arc::new(derive);
        Self::new(move |context: Context| {
            let effect = self.clone();
            let derive = Arc::clone(&derive);
            async move {
                let (scoped, handle) = derive(&context);
                if let Some(cause) = scoped.cause() {
                    return Err(cause);
                }

                let mut task = tokio::spawn(effect.run(&scoped));
                let result = tokio::select! {
                    biased;
                    joined = &mut task => match joined {
                        Ok(result) => result,
                        Err(error) => match error.try_into_panic() {
                            Ok(payload) => std::panic::resume_unwind(payload),
                            Err(error) => Err(Error::new(error)),
                        },
                    },
                    () = scoped.done() => {
                        let cause = scoped.cause().unwrap_or(Error::DeadlineExceeded);
                        tracing::debug!(%cause, "stopped waiting for bounded effect");
                        Err(cause)
                    }
                };
                drop(handle);
                result
            }
        })
    }
}

impl ReaderIOResult<Instant> {
    /// Waits for `duration` and yields the current instant.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use std::time::Duration;
    /// use ctxio::readerioresult::ReaderIOResult;
    ///
    /// let tick = ReaderIOResult::timer(Duration::from_millis(10));
    /// ```
    pub fn timer(duration: Duration) -> Self {
        Self::new(|_| async { Ok(Instant::now()) }).delay(duration)
    }
}
