//! Cancellation contexts.
//!
//! A [`Context`] is an explicit cancellation signal that carries an optional
//! cause. Effects receive it on every run and check it cooperatively.
//!
//! Contexts form a tree. A child derived with [`Context::with_cancel`],
//! [`Context::with_deadline`] or [`Context::with_timeout`] fires when its
//! parent fires (and then reports the parent's cause), or on its own when its
//! [`CancelHandle`] is used or its deadline passes. Firing a child never
//! affects the parent.
//!
//! Every derivation returns a [`CancelHandle`]. Dropping the handle detaches
//! the child by cancelling it, so a scope that derives a context releases it on
//! every exit path, unwinding included.
//!
//! # Examples
//!
//! ```rust
//! use ctxio::context::Context;
//! use ctxio::effect::Error;
//!
//! let root = Context::background();
//! let (child, handle) = root.with_cancel();
//!
//! assert!(!child.is_cancelled());
//! handle.cancel_with(Error::msg("shutting down"));
//!
//! assert_eq!(child.cause(), Some(Error::msg("shutting down")));
//! assert!(!root.is_cancelled());
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::effect::Error;

/// A cancellation signal with an optional cause.
///
/// Cloning is cheap; clones observe the same signal.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    token: CancellationToken,
    /// Set once, before `token` is cancelled.
    cause: Mutex<Option<Error>>,
    parent: Option<Context>,
    deadline: Option<Instant>,
}

static_assertions::assert_impl_all!(Context: Send, Sync, Clone);
static_assertions::assert_impl_all!(CancelHandle: Send, Sync);

impl Context {
    /// Creates a root context that never fires on its own.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                token: CancellationToken::new(),
                cause: Mutex::new(None),
                parent: None,
                deadline: None,
            }),
        }
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                token: self.inner.token.child_token(),
                cause: Mutex::new(None),
                parent: Some(self.clone()),
                deadline,
            }),
        }
    }

    /// Returns the cause this context fired with, if it has fired.
    ///
    /// A context cancelled directly reports its own cause; otherwise the
    /// nearest fired ancestor's cause is reported.
    pub fn cause(&self) -> Option<Error> {
        if let Some(cause) = self.inner.cause.lock().as_ref() {
            return Some(cause.clone());
        }
        self.inner.parent.as_ref().and_then(Self::cause)
    }

    /// Returns `true` once this context or any ancestor has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// The deadline after which this context fires, if any.
    ///
    /// Derived contexts inherit the earliest deadline of their ancestors.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Suspends until this context fires.
    ///
    /// Once this returns, [`Context::cause`] is `Some`.
    pub async fn done(&self) {
        self.inner.token.cancelled().await;
    }

    /// Derives a child that can be cancelled independently of `self`.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let child = self.derive(self.deadline());
        tracing::trace!("derived cancellable context");
        (child.clone(), CancelHandle { context: child })
    }

    /// Derives a child that fires with [`Error::DeadlineExceeded`] at `deadline`.
    ///
    /// A parent deadline that comes earlier still applies.
    ///
    /// # Panics
    ///
    /// Panics if a timer is needed and no Tokio runtime is running.
    pub fn with_deadline(&self, deadline: Instant) -> (Self, CancelHandle) {
        if let Some(inherited) = self.deadline().filter(|inherited| *inherited <= deadline) {
            // The parent's timer already covers this deadline.
            let child = self.derive(Some(inherited));
            return (child.clone(), CancelHandle { context: child });
        }

        let child = self.derive(Some(deadline));
        if Instant::now() >= deadline {
            child.cancel_with(Error::DeadlineExceeded);
        } else if !child.is_cancelled() {
            spawn_deadline_timer(&child, deadline);
        }
        (child.clone(), CancelHandle { context: child })
    }

    /// Derives a child that fires with [`Error::DeadlineExceeded`] after `timeout`.
    ///
    /// A timeout too large to represent behaves like [`Context::with_cancel`].
    ///
    /// # Panics
    ///
    /// Panics if no Tokio runtime is running.
    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancelHandle) {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Fires this context with `cause`.
    ///
    /// Returns `false` if the context had already fired, in which case the
    /// earlier cause is kept.
    pub(crate) fn cancel_with(&self, cause: Error) -> bool {
        {
            let mut slot = self.inner.cause.lock();
            if slot.is_some()
                || self
                    .inner
                    .parent
                    .as_ref()
                    .is_some_and(Self::is_cancelled)
            {
                return false;
            }
            tracing::trace!(%cause, "context cancelled");
            *slot = Some(cause);
        }
        self.inner.token.cancel();
        true
    }
}

fn spawn_deadline_timer(context: &Context, deadline: Instant) {
    let token = context.inner.token.clone();
    let target: Weak<ContextInner> = Arc::downgrade(&context.inner);
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            () = tokio::time::sleep_until(deadline) => {
                if let Some(inner) = target.upgrade() {
                    tracing::debug!("context deadline exceeded");
                    Context { inner }.cancel_with(Error::DeadlineExceeded);
                }
            }
        }
    });
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Context")
            .field("cause", &self.cause())
            .field("deadline", &self.deadline())
            .finish_non_exhaustive()
    }
}

/// Controls a derived [`Context`].
///
/// Dropping the handle cancels the context with [`Error::Cancelled`] unless it
/// has already fired.
#[must_use = "dropping a CancelHandle cancels its context immediately"]
pub struct CancelHandle {
    context: Context,
}

impl CancelHandle {
    /// Fires the context with [`Error::Cancelled`].
    ///
    /// Returns `false` if it had already fired.
    pub fn cancel(&self) -> bool {
        self.context.cancel_with(Error::Cancelled)
    }

    /// Fires the context with a specific cause.
    ///
    /// Returns `false` if it had already fired; the first cause is kept.
    pub fn cancel_with(&self, cause: Error) -> bool {
        self.context.cancel_with(cause)
    }

    /// The context this handle controls.
    pub const fn context(&self) -> &Context {
        &self.context
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.context.cancel_with(Error::Cancelled);
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CancelHandle")
            .field("context", &self.context)
            .finish()
    }
}
