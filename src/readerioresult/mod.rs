//! `ReaderIOResult` - cancellation-aware effects.
//!
//! A `ReaderIOResult<A>` describes an asynchronous computation that, given a
//! [`Context`], produces either an `A` or an [`Error`]. Nothing runs until
//! [`ReaderIOResult::run`] is awaited, and the same value can be run any
//! number of times.
//!
//! # Composition
//!
//! - Sequencing (`map`, `chain`, `ap`, `zip`, ...) never starts a later step
//!   before the earlier one succeeded. The first failure is returned unchanged.
//! - [`ReaderIOResult::with_context`] short-circuits when the context has
//!   already fired.
//! - [`ReaderIOResult::ap_par`] and friends run branches concurrently and
//!   cancel the siblings of a failed branch.
//! - [`bracket`] and [`with_resource`] release acquired resources on every
//!   exit path.
//! - [`ReaderIOResult::memoize`], [`ReaderIOResult::defer`], time combinators
//!   and [`retrying`] cover the remaining execution policies.
//!
//! # Examples
//!
//! ```rust,ignore
//! use ctxio::context::Context;
//! use ctxio::readerioresult::ReaderIOResult;
//!
//! #[tokio::main]
//! async fn main() {
//!     let effect = ReaderIOResult::of(20)
//!         .map(|x| x + 1)
//!         .chain(|x| ReaderIOResult::of(x * 2));
//!
//!     assert_eq!(effect.run(&Context::background()).await, Ok(42));
//! }
//! ```

mod cancel;
mod memoize;
mod parallel;
mod resource;
mod retry;
mod time;
mod traverse;

pub use parallel::{sequence_array_par, traverse_array_par};
pub use resource::{bracket, with_resource};
pub use retry::{RetryPolicy, RetryStatus, retrying};
pub use traverse::{sequence_array, traverse_array};

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::effect::{Error, IO, Reader, Result};

type RunFunction<A> = dyn Fn(Context) -> BoxFuture<'static, Result<A>> + Send + Sync;

/// A reusable, cancellation-aware asynchronous effect.
///
/// # Monad Laws
///
/// 1. **Left Identity**: `ReaderIOResult::of(a).chain(f) == f(a)`
/// 2. **Right Identity**: `m.chain(ReaderIOResult::of) == m`
/// 3. **Associativity**: `m.chain(f).chain(g) == m.chain(|x| f(x).chain(g))`
pub struct ReaderIOResult<A> {
    run_function: Arc<RunFunction<A>>,
}

static_assertions::assert_impl_all!(ReaderIOResult<i32>: Send, Sync, Clone);

// =============================================================================
// Constructors
// =============================================================================

impl<A: Send + 'static> ReaderIOResult<A> {
    /// Creates an effect from an async function of the context.
    ///
    /// The function is called on every run.
    ///
    /// ```rust
    /// use ctxio::readerioresult::ReaderIOResult;
    ///
    /// let effect = ReaderIOResult::new(|context| async move {
    ///     Ok(context.is_cancelled())
    /// });
    /// # let _ = effect;
    /// ```
    pub fn new<F, Fut>(function: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A>> + Send + 'static,
    {
        Self {
            run_function: Arc::new(move |context| function(context).boxed()),
        }
    }

    /// Runs the effect with `context`.
    pub fn run(&self, context: &Context) -> BoxFuture<'static, Result<A>> {
        (self.run_function)(context.clone())
    }

    /// An effect that succeeds with `value`.
    pub fn of(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::new(move |_| futures::future::ready(Ok(value.clone())))
    }

    /// An effect that fails with `error`.
    pub fn fail(error: impl Into<Error>) -> Self {
        let error = error.into();
        Self::new(move |_| futures::future::ready(Err(error.clone())))
    }

    /// Lifts a finished result.
    pub fn from_result(result: Result<A>) -> Self
    where
        A: Clone + Sync,
    {
        Self::new(move |_| futures::future::ready(result.clone()))
    }

    /// Lifts an option, failing with `on_none()` when it is empty.
    pub fn from_option<F>(option: Option<A>, on_none: F) -> Self
    where
        A: Clone + Sync,
        F: Fn() -> Error + Send + Sync + 'static,
    {
        Self::new(move |_| futures::future::ready(option.clone().ok_or_else(&on_none)))
    }

    /// Lifts a synchronous fallible function of the context.
    ///
    /// The function runs when the effect is polled, not when it is built.
    pub fn try_from_fn<F>(function: F) -> Self
    where
        F: Fn(&Context) -> Result<A> + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Self::new(move |context: Context| {
            let function = Arc::clone(&function);
            async move { function(&context) }
        })
    }

    /// Lifts an infallible [`IO`].
    pub fn from_io(io: IO<A>) -> Self {
        Self::new(move |_| {
            let io = io.clone();
            async move { Ok(io.run_unsafe()) }
        })
    }

    /// Lifts a fallible [`IO`].
    pub fn from_io_result(io: IO<Result<A>>) -> Self {
        Self::new(move |_| {
            let io = io.clone();
            async move { io.run_unsafe() }
        })
    }

    /// Lifts a [`Reader`] over the context.
    pub fn from_reader(reader: Reader<Context, A>) -> Self {
        Self::new(move |context: Context| {
            let reader = reader.clone();
            async move { Ok(reader.run(&context)) }
        })
    }
}

impl ReaderIOResult<Context> {
    /// An effect that yields the context it is run with.
    pub fn ask() -> Self {
        Self::new(|context| futures::future::ready(Ok(context)))
    }
}

// =============================================================================
// Functor Operations
// =============================================================================

impl<A: Send + 'static> ReaderIOResult<A> {
    /// Transforms the success value.
    pub fn map<B, F>(self, function: F) -> ReaderIOResult<B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        let function = Arc::new(function);
        ReaderIOResult::new(move |context: Context| {
            let effect = self.clone();
            let function = Arc::clone(&function);
            async move { effect.run(&context).await.map(|value| function(value)) }
        })
    }

    /// Transforms the failure cause.
    #[must_use]
    pub fn map_err<F>(self, function: F) -> Self
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Self::new(move |context: Context| {
            let effect = self.clone();
            let function = Arc::clone(&function);
            async move { effect.run(&context).await.map_err(|error| function(error)) }
        })
    }

    /// Transforms both the failure cause and the success value.
    pub fn bimap<B, E, F>(self, on_error: E, on_success: F) -> ReaderIOResult<B>
    where
        E: Fn(Error) -> Error + Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.map_err(on_error).map(on_success)
    }

    /// Collapses both outcomes into an always-successful effect.
    pub fn fold<B, E, F>(self, on_error: E, on_success: F) -> ReaderIOResult<B>
    where
        E: Fn(Error) -> B + Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        let on_error = Arc::new(on_error);
        let on_success = Arc::new(on_success);
        ReaderIOResult::new(move |context: Context| {
            let effect = self.clone();
            let on_error = Arc::clone(&on_error);
            let on_success = Arc::clone(&on_success);
            async move {
                Ok(match effect.run(&context).await {
                    Ok(value) => on_success(value),
                    Err(error) => on_error(error),
                })
            }
        })
    }

    /// Replaces a failure with a value computed from the cause.
    #[must_use]
    pub fn get_or_else<F>(self, on_error: F) -> Self
    where
        F: Fn(Error) -> A + Send + Sync + 'static,
    {
        self.fold(on_error, |value| value)
    }
}

// =============================================================================
// Monad Operations
// =============================================================================

impl<A: Send + 'static> ReaderIOResult<A> {
    /// Runs the effect produced from the success value.
    ///
    /// The continuation is not built until this effect has succeeded.
    pub fn chain<B, F>(self, function: F) -> ReaderIOResult<B>
    where
        F: Fn(A) -> ReaderIOResult<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        let function = Arc::new(function);
        ReaderIOResult::new(move |context: Context| {
            let effect = self.clone();
            let function = Arc::clone(&function);
            async move {
                let value = effect.run(&context).await?;
                function(value).run(&context).await
            }
        })
    }

    /// Alias for [`ReaderIOResult::chain`].
    pub fn and_then<B, F>(self, function: F) -> ReaderIOResult<B>
    where
        F: Fn(A) -> ReaderIOResult<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.chain(function)
    }

    /// Runs a follow-up effect for its outcome and keeps the original value.
    ///
    /// A failing follow-up fails the whole effect.
    #[must_use]
    pub fn chain_first<B, F>(self, function: F) -> Self
    where
        F: Fn(&A) -> ReaderIOResult<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        let function = Arc::new(function);
        Self::new(move |context: Context| {
            let effect = self.clone();
            let function = Arc::clone(&function);
            async move {
                let value = effect.run(&context).await?;
                function(&value).run(&context).await?;
                Ok(value)
            }
        })
    }

    /// Alias for [`ReaderIOResult::chain_first`].
    #[must_use]
    pub fn tap<B, F>(self, function: F) -> Self
    where
        F: Fn(&A) -> ReaderIOResult<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.chain_first(function)
    }

    /// Continues with a synchronous fallible step.
    pub fn chain_result<B, F>(self, function: F) -> ReaderIOResult<B>
    where
        F: Fn(A) -> Result<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        let function = Arc::new(function);
        ReaderIOResult::new(move |context: Context| {
            let effect = self.clone();
            let function = Arc::clone(&function);
            async move { effect.run(&context).await.and_then(|value| function(value)) }
        })
    }

    /// Continues with an infallible [`IO`].
    pub fn chain_io<B, F>(self, function: F) -> ReaderIOResult<B>
    where
        F: Fn(A) -> IO<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        self.chain(move |value| ReaderIOResult::from_io(function(value)))
    }

    /// Runs `self`, discards its value and runs `next`.
    pub fn then<B: Send + 'static>(self, next: ReaderIOResult<B>) -> ReaderIOResult<B> {
        self.chain(move |_| next.clone())
    }

    /// Recovers from a failure with an effect built from the cause.
    #[must_use]
    pub fn or_else<F>(self, function: F) -> Self
    where
        F: Fn(Error) -> Self + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Self::new(move |context: Context| {
            let effect = self.clone();
            let function = Arc::clone(&function);
            async move {
                match effect.run(&context).await {
                    Ok(value) => Ok(value),
                    Err(error) => function(error).run(&context).await,
                }
            }
        })
    }

    /// Falls back to `other` when `self` fails.
    #[must_use]
    pub fn alt(self, other: Self) -> Self {
        self.or_else(move |_| other.clone())
    }
}

// =============================================================================
// Applicative Operations
// =============================================================================

impl<A: Send + 'static> ReaderIOResult<A> {
    /// Applies the function produced by `function` to this effect's value.
    ///
    /// The function effect runs first, then this one. See
    /// [`ReaderIOResult::ap_par`] for the concurrent variant.
    pub fn ap<B, F>(self, function: ReaderIOResult<F>) -> ReaderIOResult<B>
    where
        F: FnOnce(A) -> B + Send + 'static,
        B: Send + 'static,
    {
        ReaderIOResult::new(move |context: Context| {
            let function = function.clone();
            let effect = self.clone();
            async move {
                let function = function.run(&context).await?;
                let value = effect.run(&context).await?;
                Ok(function(value))
            }
        })
    }

    /// Runs `self` then `other` and pairs their values.
    pub fn zip<B: Send + 'static>(self, other: ReaderIOResult<B>) -> ReaderIOResult<(A, B)> {
        ReaderIOResult::new(move |context: Context| {
            let first = self.clone();
            let second = other.clone();
            async move {
                let first = first.run(&context).await?;
                let second = second.run(&context).await?;
                Ok((first, second))
            }
        })
    }
}

impl<A> Clone for ReaderIOResult<A> {
    fn clone(&self) -> Self {
        Self {
            run_function: Arc::clone(&self.run_function),
        }
    }
}

impl<A> std::fmt::Display for ReaderIOResult<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "<ReaderIOResult>")
    }
}
