//! Sequential traversal.

use std::sync::Arc;

use super::ReaderIOResult;
use crate::context::Context;

/// Maps every item to an effect and runs them one after another.
///
/// Stops at the first failure; later items are not mapped or run.
///
/// # Examples
///
/// ```rust,ignore
/// use ctxio::context::Context;
/// use ctxio::readerioresult::{ReaderIOResult, traverse_array};
///
/// let doubled = traverse_array(vec![1, 2, 3], |n| ReaderIOResult::of(n * 2));
/// assert_eq!(doubled.run(&Context::background()).await, Ok(vec![2, 4, 6]));
/// ```
pub fn traverse_array<T, B, F>(items: Vec<T>, function: F) -> ReaderIOResult<Vec<B>>
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
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(function(item).run(&context).await?);
            }
            Ok(values)
        }
    })
}

/// Runs every effect in order and collects their values.
pub fn sequence_array<A: Send + 'static>(
    effects: Vec<ReaderIOResult<A>>,
) -> ReaderIOResult<Vec<A>> {
    traverse_array(effects, std::convert::identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Error;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    #[tokio::test]
    async fn test_traverse_array_stops_at_first_failure() {
        let visited = Arc::new(AtomicUsize::new(0));
        let counter = visited.clone();
        let effect = traverse_array(vec![1, 2, 3, 4], move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            if n == 2 {
                ReaderIOResult::fail(Error::msg("two"))
            } else {
                ReaderIOResult::of(n)
            }
        });

        assert_eq!(effect.run(&Context::background()).await, Err(Error::msg("two")));
        assert_eq!(visited.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn test_sequence_array_empty() {
        let effect = sequence_array(Vec::<ReaderIOResult<i32>>::new());
        assert_eq!(effect.run(&Context::background()).await, Ok(vec![]));
    }
}
