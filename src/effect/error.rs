//! Failure causes for the effect system.
//!
//! Every effect in this crate fails with the same cause type, [`Error`]. A
//! cause has to be cloneable: the same failure is recorded in a
//! [`Context`](crate::context::Context) and handed back to every branch that
//! observes it, and memoized effects return the cached failure on every run.
//!
//! # Examples
//!
//! ```rust
//! use ctxio::effect::Error;
//!
//! let error = Error::msg("connection refused");
//! assert_eq!(error.to_string(), "connection refused");
//! assert!(!error.is_cancellation());
//! assert!(Error::Cancelled.is_cancellation());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// Result type used by every fallible effect.
pub type Result<A, E = Error> = std::result::Result<A, E>;

/// The cause of a failed effect.
///
/// # Equality
///
/// Unit and message variants compare structurally. [`Error::Other`] compares
/// by identity of the wrapped error, so two clones of the same cause are equal
/// while two separately constructed domain errors are not.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The context was cancelled without a more specific cause.
    #[error("context canceled")]
    Cancelled,
    /// A deadline or timeout fired before the effect finished.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// An ad-hoc failure described by a message.
    #[error("{0}")]
    Message(Arc<str>),
    /// A domain error raised by a wrapped computation.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync + 'static>),
    /// An effect panicked inside a resource scope.
    ///
    /// Release functions observe this outcome before the panic is resumed.
    #[error("effect panicked: {0}")]
    Panicked(Arc<str>),
}

impl Error {
    /// Creates a failure from a message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ctxio::effect::Error;
    ///
    /// assert_eq!(Error::msg("boom"), Error::msg("boom"));
    /// ```
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(Arc::from(message.into()))
    }

    /// Wraps a domain error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ctxio::effect::Error;
    ///
    /// let io_error = std::io::Error::other("disk full");
    /// let error = Error::new(io_error);
    /// assert!(error.downcast_ref::<std::io::Error>().is_some());
    /// ```
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(error))
    }

    /// Returns `true` if this cause came from a cancelled or expired context.
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Returns the wrapped domain error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Other(error) => error.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(Arc::from(message))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Cancelled, Self::Cancelled)
            | (Self::DeadlineExceeded, Self::DeadlineExceeded) => true,
            (Self::Message(left), Self::Message(right))
            | (Self::Panicked(left), Self::Panicked(right)) => left == right,
            (Self::Other(left), Self::Other(right)) => Arc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::new(error)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}
