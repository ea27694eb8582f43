//! IO - deferred, repeatable side effects.
//!
//! `IO<A>` describes a synchronous computation that may perform side effects.
//! Nothing happens until [`IO::run_unsafe`] is called, and the same `IO` can be
//! run any number of times; each run re-executes the computation.
//!
//! `IO` is `Send + Sync` so it can be lifted into a
//! [`ReaderIOResult`](crate::readerioresult::ReaderIOResult) and executed on
//! any runtime thread.
//!
//! # Examples
//!
//! ```rust
//! use ctxio::effect::IO;
//!
//! let io = IO::pure(10)
//!     .fmap(|x| x * 2)
//!     .flat_map(|x| IO::pure(x + 1));
//! assert_eq!(io.run_unsafe(), 21);
//! ```
//!
//! # Side Effect Deferral
//!
//! ```rust
//! use ctxio::effect::IO;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let runs = Arc::new(AtomicUsize::new(0));
//! let counter = runs.clone();
//!
//! let io = IO::new(move || counter.fetch_add(1, Ordering::SeqCst));
//! assert_eq!(runs.load(Ordering::SeqCst), 0);
//!
//! io.run_unsafe();
//! io.run_unsafe();
//! assert_eq!(runs.load(Ordering::SeqCst), 2);
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// A deferred synchronous computation producing an `A`.
///
/// # Monad Laws
///
/// 1. **Left Identity**: `IO::pure(a).flat_map(f) == f(a)`
/// 2. **Right Identity**: `m.flat_map(IO::pure) == m`
/// 3. **Associativity**: `m.flat_map(f).flat_map(g) == m.flat_map(|x| f(x).flat_map(g))`
pub struct IO<A> {
    run_io: Arc<dyn Fn() -> A + Send + Sync>,
}

impl<A: 'static> IO<A> {
    /// Creates a new IO action from a closure.
    ///
    /// The closure runs on every call to [`IO::run_unsafe`].
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self {
            run_io: Arc::new(action),
        }
    }

    /// Wraps an already computed value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ctxio::effect::IO;
    ///
    /// let io = IO::pure("hello");
    /// assert_eq!(io.run_unsafe(), "hello");
    /// ```
    pub fn pure(value: A) -> Self
    where
        A: Clone + Send + Sync,
    {
        Self::new(move || value.clone())
    }

    /// Executes the computation.
    ///
    /// Call this at the edge of the program; it breaks referential transparency.
    pub fn run_unsafe(&self) -> A {
        (self.run_io)()
    }

    /// Transforms the produced value.
    pub fn fmap<B, F>(self, function: F) -> IO<B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: 'static,
    {
        IO::new(move || function(self.run_unsafe()))
    }

    /// Feeds the produced value into a function returning the next action.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ctxio::effect::IO;
    ///
    /// let io = IO::pure(10).flat_map(|x| IO::pure(x * 2));
    /// assert_eq!(io.run_unsafe(), 20);
    /// ```
    pub fn flat_map<B, F>(self, function: F) -> IO<B>
    where
        F: Fn(A) -> IO<B> + Send + Sync + 'static,
        B: 'static,
    {
        IO::new(move || function(self.run_unsafe()).run_unsafe())
    }

    /// Alias for [`IO::flat_map`].
    pub fn and_then<B, F>(self, function: F) -> IO<B>
    where
        F: Fn(A) -> IO<B> + Send + Sync + 'static,
        B: 'static,
    {
        self.flat_map(function)
    }

    /// Runs `self` for its effects, then `next`.
    #[must_use]
    pub fn then<B: 'static>(self, next: IO<B>) -> IO<B> {
        IO::new(move || {
            self.run_unsafe();
            next.run_unsafe()
        })
    }

    /// Runs both actions in order and combines their values.
    pub fn map2<B, C, F>(self, other: IO<B>, function: F) -> IO<C>
    where
        F: Fn(A, B) -> C + Send + Sync + 'static,
        B: 'static,
        C: 'static,
    {
        IO::new(move || {
            let first = self.run_unsafe();
            let second = other.run_unsafe();
            function(first, second)
        })
    }

    /// Runs both actions in order and pairs their values.
    #[must_use]
    pub fn product<B: 'static>(self, other: IO<B>) -> IO<(A, B)> {
        self.map2(other, |first, second| (first, second))
    }

    /// Recovers from a panic inside the action.
    ///
    /// The handler receives the panic message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ctxio::effect::IO;
    ///
    /// let io = IO::new(|| -> i32 { panic!("boom") }).catch(|message| {
    ///     assert_eq!(message, "boom");
    ///     -1
    /// });
    /// assert_eq!(io.run_unsafe(), -1);
    /// ```
    #[must_use]
    pub fn catch<F>(self, handler: F) -> Self
    where
        F: Fn(String) -> A + Send + Sync + 'static,
    {
        Self::new(move || {
            catch_unwind(AssertUnwindSafe(|| self.run_unsafe())).unwrap_or_else(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|message| (*message).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                handler(message)
            })
        })
    }
}

impl<A> Clone for IO<A> {
    fn clone(&self) -> Self {
        Self {
            run_io: Arc::clone(&self.run_io),
        }
    }
}

impl<A> std::fmt::Display for IO<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "<IO>")
    }
}
