//! Reader - computations over a read-only environment.
//!
//! A `Reader<R, A>` wraps a function `&R -> A`. Composing readers threads the
//! environment through every step without passing it by hand. The environment
//! is borrowed, so expensive environments (for example a
//! [`Context`](crate::context::Context)) are never cloned by the reader itself.
//!
//! # Laws
//!
//! - Left Identity: `Reader::pure(a).flat_map(f) == f(a)`
//! - Right Identity: `m.flat_map(Reader::pure) == m`
//! - Ask Local Identity: `Reader::local(|r| r.clone(), m) == m`
//!
//! # Examples
//!
//! ```rust
//! use ctxio::effect::Reader;
//!
//! #[derive(Clone)]
//! struct Config {
//!     host: String,
//!     port: u16,
//! }
//!
//! let address = Reader::asks(|config: &Config| config.host.clone())
//!     .map2(Reader::asks(|config: &Config| config.port), |host, port| {
//!         format!("{host}:{port}")
//!     });
//!
//! let config = Config { host: "localhost".to_string(), port: 8080 };
//! assert_eq!(address.run(&config), "localhost:8080");
//! ```

use std::sync::Arc;

/// A computation that reads an environment of type `R` and produces an `A`.
pub struct Reader<R, A> {
    run_function: Arc<dyn Fn(&R) -> A + Send + Sync>,
}

impl<R: 'static, A: 'static> Reader<R, A> {
    /// Creates a reader from a function of the environment.
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&R) -> A + Send + Sync + 'static,
    {
        Self {
            run_function: Arc::new(function),
        }
    }

    /// Runs the reader against an environment.
    pub fn run(&self, environment: &R) -> A {
        (self.run_function)(environment)
    }

    /// A reader that ignores the environment.
    pub fn pure(value: A) -> Self
    where
        A: Clone + Send + Sync,
    {
        Self::new(move |_| value.clone())
    }

    /// Projects a value out of the environment.
    pub fn asks<F>(projection: F) -> Self
    where
        F: Fn(&R) -> A + Send + Sync + 'static,
    {
        Self::new(projection)
    }

    /// Runs `computation` against a modified environment.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ctxio::effect::Reader;
    ///
    /// let doubled: Reader<i32, i32> = Reader::new(|environment| environment * 2);
    /// let shifted = Reader::local(|environment: &i32| environment + 10, doubled);
    /// assert_eq!(shifted.run(&5), 30);
    /// ```
    pub fn local<F>(modifier: F, computation: Self) -> Self
    where
        F: Fn(&R) -> R + Send + Sync + 'static,
    {
        Self::new(move |environment| computation.run(&modifier(environment)))
    }

    /// Transforms the produced value.
    pub fn fmap<B, F>(self, function: F) -> Reader<R, B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: 'static,
    {
        Reader::new(move |environment| function(self.run(environment)))
    }

    /// Chains a reader that depends on the produced value.
    pub fn flat_map<B, F>(self, function: F) -> Reader<R, B>
    where
        F: Fn(A) -> Reader<R, B> + Send + Sync + 'static,
        B: 'static,
    {
        Reader::new(move |environment| function(self.run(environment)).run(environment))
    }

    /// Alias for [`Reader::flat_map`].
    pub fn and_then<B, F>(self, function: F) -> Reader<R, B>
    where
        F: Fn(A) -> Reader<R, B> + Send + Sync + 'static,
        B: 'static,
    {
        self.flat_map(function)
    }

    /// Combines two readers over the same environment.
    pub fn map2<B, C, F>(self, other: Reader<R, B>, function: F) -> Reader<R, C>
    where
        F: Fn(A, B) -> C + Send + Sync + 'static,
        B: 'static,
        C: 'static,
    {
        Reader::new(move |environment| function(self.run(environment), other.run(environment)))
    }
}

impl<R: Clone + 'static> Reader<R, R> {
    /// A reader that yields the environment itself.
    pub fn ask() -> Self {
        Self::new(R::clone)
    }
}

impl<R, A> Clone for Reader<R, A> {
    fn clone(&self) -> Self {
        Self {
            run_function: Arc::clone(&self.run_function),
        }
    }
}

impl<R, A> std::fmt::Display for Reader<R, A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "<Reader>")
    }
}
