//! Cancellation guard and context-scoped execution.

use std::sync::Arc;

use super::ReaderIOResult;
use crate::context::{CancelHandle, Context};
use crate::effect::Error;

impl<A: Send + 'static> ReaderIOResult<A> {
    /// Short-circuits when the context has already fired.
    ///
    /// The check happens when the effect starts executing. If the context
    /// carries a cause, the effect fails with it and the wrapped effect is
    /// never invoked; otherwise the wrapped effect runs with the same context.
    ///
    /// A context that fires after the check is not observed here; effects
    /// doing long waits should select on [`Context::done`] themselves.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use ctxio::context::Context;
    /// use ctxio::effect::Error;
    /// use ctxio::readerioresult::ReaderIOResult;
    ///
    /// let (context, handle) = Context::background().with_cancel();
    /// handle.cancel_with(Error::msg("request aborted"));
    ///
    /// let guarded = ReaderIOResult::of(42).with_context();
    /// assert_eq!(guarded.run(&context).await, Err(Error::msg("request aborted")));
    /// ```
    #[must_use]
    pub fn with_context(self) -> Self {
        Self::new(move |context: Context| {
            let effect = self.clone();
            async move {
                if let Some(cause) = context.cause() {
                    tracing::trace!(%cause, "context already fired, skipping effect");
                    return Err(cause);
                }
                effect.run(&context).await
            }
        })
    }

    /// An effect that only completes when the context fires.
    ///
    /// It then fails with the context's cause.
    pub fn never() -> Self {
        Self::new(|context: Context| async move {
            context.done().await;
            Err(context.cause().unwrap_or(Error::Cancelled))
        })
    }

    /// Runs the effect with a context derived by `derive`.
    ///
    /// The derived context is detached as soon as the effect finishes.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use std::time::Duration;
    ///
    /// let bounded = slow_effect.local(|context| context.with_timeout(Duration::from_secs(1)));
    /// ```
    #[must_use]
    pub fn local<F>(self, derive: F) -> Self
    where
        F: Fn(&Context) -> (Context, CancelHandle) + Send + Sync + 'static,
    {
        let derive = Arc::new(derive);
        Self::new(move |context: Context| {
            let effect = self.clone();
            let derive = Arc::clone(&derive);
            async move {
                let (scoped, handle) = derive(&context);
                let result = effect.run(&scoped).await;
                drop(handle);
                result
            }
        })
    }
}
