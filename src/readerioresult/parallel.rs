//! Parallel application with cross-cancellation.
//!
//! Every combinator here follows the same protocol:
//!
//! 1. If the context has already fired, fail with its cause without deriving
//!    anything.
//! 2. Derive a child context from the caller's context.
//! 3. Run every branch concurrently against the child. A branch that fails
//!    fires the child with its failure, so the other branches observe that
//!    failure as their cancellation cause.
//! 4. Wait for all branches, read the recorded cause, then detach the child.
//! 5. Combine the values, or fail with exactly one cause (the first recorded).

use std::sync::Arc;

use futures::future::BoxFuture;

use super::ReaderIOResult;
use crate::context::{CancelHandle, Context};
use crate::effect::Result;

/// Awaits a branch and fires the shared child context if it fails.
async fn cancel_on_failure<A>(
    branch: BoxFuture<'static, Result<A>>,
    handle: &CancelHandle,
) -> Result<A> {
    let result = branch.await;
    if let Err(cause) = &result
        && handle.cancel_with(cause.clone())
    {
        tracing::debug!(%cause, "parallel branch failed, cancelling siblings");
    }
    result
}

impl<A: Send + 'static> ReaderIOResult<A> {
    /// Runs `self` and `other` concurrently and combines their values.
    ///
    /// If either branch fails, the other one sees the failure as the cause of
    /// its (child) context and can abort early. The result is the first
    /// recorded failure; when both branches fail nearly simultaneously either
    /// cause may win, but exactly one is returned.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use ctxio::context::Context;
    /// use ctxio::readerioresult::ReaderIOResult;
    ///
    /// let sum = ReaderIOResult::of(1).map2_par(ReaderIOResult::of(2), |a, b| a + b);
    /// assert_eq!(sum.run(&Context::background()).await, Ok(3));
    /// ```
    pub fn map2_par<B, C, F>(self, other: ReaderIOResult<B>, combine: F) -> ReaderIOResult<C>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        let left = self.with_context();
        let right = other.with_context();
        let combine = Arc::new(combine);

        ReaderIOResult::new(move |context: Context| {
            let left = left.clone();
            let right = right.clone();
            let combine = Arc::clone(&combine);
            async move {
                if let Some(cause) = context.cause() {
                    return Err(cause);
                }

                let (child, handle) = context.with_cancel();
                let (first, second) = tokio::join!(
                    cancel_on_failure(left.run(&child), &handle),
                    cancel_on_failure(right.run(&child), &handle),
                );
                let recorded = child.cause();
                drop(handle);

                match (first, second) {
                    (Ok(first), Ok(second)) => Ok(combine(first, second)),
                    (Err(error), _) | (_, Err(error)) => Err(recorded.unwrap_or(error)),
                }
            }
        })
    }

    /// Applies the function produced by `function` to this effect's value,
    /// running both effects concurrently.
    ///
    /// See [`ReaderIOResult::map2_par`] for the cancellation protocol.
    pub fn ap_par<B, F>(self, function: ReaderIOResult<F>) -> ReaderIOResult<B>
    where
        F: FnOnce(A) -> B + Send + 'static,
        B: Send + 'static,
    {
        function.map2_par(self, |function, value| function(value))
    }

    /// Runs `self` and `other` concurrently and pairs their values.
    pub fn zip_par<B: Send + 'static>(self, other: ReaderIOResult<B>) -> ReaderIOResult<(A, B)> {
        self.map2_par(other, |first, second| (first, second))
    }
}

/// Maps every item to an effect and runs them all concurrently.
///
/// Values are returned in input order. The first failure cancels the remaining
/// branches and becomes the result.
///
/// # Examples
///
/// ```rust,ignore
/// use ctxio::context::Context;
/// use ctxio::readerioresult::{ReaderIOResult, traverse_array_par};
///
/// let lengths = traverse_array_par(vec!["a", "bb"], |word| ReaderIOResult::of(word.len()));
/// assert_eq!(lengths.run(&Context::background()).await, Ok(vec![1, 2]));
/// ```
pub fn traverse_array_par<T, B, F>(items: Vec<T>, function: F) -> ReaderIOResult<Vec<B>>
where
    T: Clone + Send + Sync + 'static,
    B: Send + 'static,
    F: Fn(T) -> ReaderIOResult<B> + Send + Sync + 'static,
{
    let function = Arc::new(function);
    ReaderIOResult::new(move |context: Context| {
        let items = items.clone();
        let function = Arc::clone(&function);
        async move {
            if let Some(cause) = context.cause() {
                return Err(cause);
            }

            let branches: Vec<ReaderIOResult<B>> = items
                .into_iter()
                .map(|item| function(item).with_context())
                .collect();

            let (child, handle) = context.with_cancel();
            let results = futures::future::join_all(
                branches
                    .iter()
                    .map(|branch| cancel_on_failure(branch.run(&child), &handle)),
            )
            .await;
            let recorded = child.cause();
            drop(handle);

            let mut values = Vec::with_capacity(results.len());
            for result in results {
                match result {
                    Ok(value) => values.push(value),
                    Err(error) => return Err(recorded.unwrap_or(error)),
                }
            }
            Ok(values)
        }
    })
}

/// Runs every effect concurrently and collects their values in order.
pub fn sequence_array_par<A: Send + 'static>(
    effects: Vec<ReaderIOResult<A>>,
) -> ReaderIOResult<Vec<A>> {
    traverse_array_par(effects, std::convert::identity)
}
