//! Deferred construction and one-shot caching.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::OnceCell;

use super::ReaderIOResult;
use crate::context::Context;
use crate::effect::{Error, Result};

/// The single execution behind a memoized effect, awaited by every run.
type Execution<A> = Shared<BoxFuture<'static, Result<A>>>;

impl<A: Send + 'static> ReaderIOResult<A> {
    /// Builds a fresh effect with `generator` on every run.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use ctxio::readerioresult::ReaderIOResult;
    ///
    /// let fresh = ReaderIOResult::defer(|| ReaderIOResult::of(next_request_id()));
    /// ```
    pub fn defer<F>(generator: F) -> Self
    where
        F: Fn() -> Self + Send + Sync + 'static,
    {
        let generator = Arc::new(generator);
        Self::new(move |context: Context| {
            let generator = Arc::clone(&generator);
            async move { generator().run(&context).await }
        })
    }

    /// Runs the effect at most once and replays its outcome.
    ///
    /// The first run starts the effect on its own task with that run's
    /// context; concurrent runs wait for the same execution. Every run, the
    /// first included, returns a clone of the cached success or failure.
    ///
    /// The execution is owned by the memoized effect, not by the run that
    /// started it. Dropping that run's future (a timeout or `select!` losing
    /// the race) leaves the execution going, and the next run picks up its
    /// outcome. A panic in the effect is cached as [`Error::Panicked`].
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use ctxio::context::Context;
    /// use ctxio::readerioresult::ReaderIOResult;
    ///
    /// let config = load_config().memoize();
    /// let first = config.run(&Context::background()).await;
    /// let second = config.run(&Context::background()).await; // not loaded again
    /// assert_eq!(first, second);
    /// ```
    #[must_use]
    pub fn memoize(self) -> Self
    where
        A: Clone + Sync,
    {
        let cell: Arc<OnceCell<Execution<A>>> = Arc::new(OnceCell::new());
        Self::new(move |context: Context| {
            let effect = self.clone();
            let cell = Arc::clone(&cell);
            async move {
                // The initializer never awaits, so no run can be dropped halfway through it.
                let execution = cell
                    .get_or_init(|| async move { start(&effect, &context) })
                    .await
                    .clone();
                execution.await
            }
        })
    }
}

fn start<A>(effect: &ReaderIOResult<A>, context: &Context) -> Execution<A>
where
    A: Clone + Send + Sync + 'static,
{
    tracing::debug!("running memoized effect");
    let task = tokio::spawn(effect.run(context));
    async move {
        match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(match join_error.try_into_panic() {
                Ok(payload) => {
                    tracing::warn!("memoized effect panicked");
                    Error::from_panic(payload.as_ref())
                }
                Err(join_error) => Error::new(join_error),
            }),
        }
    }
    .boxed()
    .shared()
}
