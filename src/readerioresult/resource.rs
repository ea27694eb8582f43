//! Resource scoping: acquire, use, release.
//!
//! ```text
//! NotAcquired --acquire fails--> Failed (release never runs)
//!      |
//!   acquired
//!      v
//!   Acquired --body completes (Ok, Err or panic)--> Released
//! ```
//!
//! The outcome precedence is fixed: a body failure is returned even when the
//! release fails too; a release failure is only returned when the body
//! succeeded.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::ReaderIOResult;
use crate::context::Context;
use crate::effect::{Error, Result};

/// Acquires a resource, uses it, and releases it on every exit path.
///
/// - `acquire` is guarded by [`ReaderIOResult::with_context`]. If it fails,
///   neither `use_resource` nor `release` runs.
/// - `use_resource` runs once with the acquired resource.
/// - `release` runs once after `use_resource` completed, and receives the
///   body's outcome. If the body panicked, `release` sees
///   [`Error::Panicked`] and the panic is resumed after release finished.
///
/// `release` runs with the caller's context, which may already have fired,
/// for instance when the body stopped because of that cancellation. Build
/// release effects without [`ReaderIOResult::with_context`]: a guarded
/// release sees the fired context and skips its own cleanup.
///
/// # Examples
///
/// ```rust,ignore
/// use ctxio::context::Context;
/// use ctxio::readerioresult::{ReaderIOResult, bracket};
///
/// let effect = bracket(
///     ReaderIOResult::of(String::from("connection")),
///     |connection| ReaderIOResult::of(connection.len()),
///     |_connection, _outcome| ReaderIOResult::of(()),
/// );
/// assert_eq!(effect.run(&Context::background()).await, Ok(10));
/// ```
pub fn bracket<R, A, Any, Use, Release>(
    acquire: ReaderIOResult<R>,
    use_resource: Use,
    release: Release,
) -> ReaderIOResult<A>
where
    R: Clone + Send + 'static,
    A: Send + 'static,
    Any: Send + 'static,
    Use: Fn(R) -> ReaderIOResult<A> + Send + Sync + 'static,
    Release: Fn(R, &Result<A>) -> ReaderIOResult<Any> + Send + Sync + 'static,
{
    let acquire = acquire.with_context();
    let use_resource = Arc::new(use_resource);
    let release = Arc::new(release);

    ReaderIOResult::new(move |context: Context| {
        let acquire = acquire.clone();
        let use_resource = Arc::clone(&use_resource);
        let release = Arc::clone(&release);
        async move {
            let resource = acquire.run(&context).await?;

            let body = {
                let resource = resource.clone();
                let context = context.clone();
                async move { use_resource(resource).run(&context).await }
            };
            let (outcome, panic) = match AssertUnwindSafe(body).catch_unwind().await {
                Ok(outcome) => (outcome, None),
                Err(payload) => (Err(Error::from_panic(payload.as_ref())), Some(payload)),
            };

            let released = release(resource, &outcome).run(&context).await;

            if let Some(payload) = panic {
                std::panic::resume_unwind(payload);
            }

            match (outcome, released) {
                (Ok(value), Ok(_)) => Ok(value),
                (Ok(_), Err(release_error)) => Err(release_error),
                (Err(error), Ok(_)) => Err(error),
                (Err(error), Err(release_error)) => {
                    tracing::warn!(
                        %error,
                        %release_error,
                        "resource release failed after body failure; keeping body failure"
                    );
                    Err(error)
                }
            }
        }
    })
}

/// Runs `body` with a resource produced by `acquire`, releasing it with
/// `release` afterwards.
///
/// This is [`bracket`] with a release function that does not look at the
/// body's outcome.
///
/// # Examples
///
/// ```rust,ignore
/// use ctxio::readerioresult::{ReaderIOResult, with_resource};
///
/// let read = with_resource(
///     open_file("config.toml"),
///     |file| close_file(file),
///     |file| read_to_string(file),
/// );
/// ```
pub fn with_resource<R, A, Any, Release, Body>(
    acquire: ReaderIOResult<R>,
    release: Release,
    body: Body,
) -> ReaderIOResult<A>
where
    R: Clone + Send + 'static,
    A: Send + 'static,
    Any: Send + 'static,
    Release: Fn(R) -> ReaderIOResult<Any> + Send + Sync + 'static,
    Body: Fn(R) -> ReaderIOResult<A> + Send + Sync + 'static,
{
    bracket(acquire, body, move |resource, _| release(resource))
}
