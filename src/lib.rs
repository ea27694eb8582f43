//! # ctxio
//!
//! Cancellation-aware asynchronous effects for Rust.
//!
//! ## Overview
//!
//! - **Effects**: reusable synchronous [`effect::IO`] and [`effect::Reader`]
//!   values and the shared [`effect::Error`] type.
//! - **Contexts**: a [`context::Context`] tree carrying a cancellation signal,
//!   its first cause and an optional deadline.
//! - **`ReaderIOResult`**: asynchronous computations that receive a context and
//!   produce a value or an error, with combinators for sequencing, parallel
//!   application with cross-cancellation, resource scoping, memoization,
//!   timeouts and retries.
//!
//! ## Feature Flags
//!
//! - `effect`: `IO`, `Reader` and `Error`
//! - `async`: `Context` and `ReaderIOResult` (Tokio based)
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use ctxio::prelude::*;
//!
//! let io = IO::new(|| 20).fmap(|x| x + 22);
//! assert_eq!(io.run_unsafe(), 42);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use ctxio::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "effect")]
    pub use crate::effect::*;

    #[cfg(feature = "async")]
    pub use crate::context::{CancelHandle, Context};

    #[cfg(feature = "async")]
    pub use crate::readerioresult::*;
}

#[cfg(feature = "effect")]
pub mod effect;

#[cfg(feature = "async")]
pub mod context;

#[cfg(feature = "async")]
pub mod readerioresult;
