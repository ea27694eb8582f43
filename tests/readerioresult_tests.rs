#![cfg(feature = "async")]
//! Unit tests for ReaderIOResult construction and sequencing.
//!
//! - construction from values, results, options, IO and Reader
//! - laziness and reusability
//! - sequencing short-circuits on the first failure
//! - recovery combinators
//! - the cancellation guard

use ctxio::context::Context;
use ctxio::effect::{Error, IO, Reader};
use ctxio::readerioresult::{ReaderIOResult, sequence_array, traverse_array};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counter_effect(calls: &Arc<AtomicUsize>) -> ReaderIOResult<usize> {
    let calls = calls.clone();
    ReaderIOResult::new(move |_| {
        let calls = calls.clone();
        async move { Ok(calls.fetch_add(1, Ordering::SeqCst)) }
    })
}

// =============================================================================
// Construction
// =============================================================================

#[rstest]
#[case(Some(5), Ok(5))]
#[case(None, Err(Error::msg("missing")))]
#[tokio::test]
async fn test_from_option(#[case] option: Option<i32>, #[case] expected: Result<i32, Error>) {
    let effect = ReaderIOResult::from_option(option, || Error::msg("missing"));
    assert_eq!(effect.run(&Context::background()).await, expected);
}

#[rstest]
#[tokio::test]
async fn test_from_result_replays_failure() {
    let effect = ReaderIOResult::<i32>::from_result(Err(Error::msg("bad")));
    let context = Context::background();

    assert_eq!(effect.run(&context).await, Err(Error::msg("bad")));
    assert_eq!(effect.run(&context).await, Err(Error::msg("bad")));
}

#[rstest]
#[tokio::test]
async fn test_try_from_fn_sees_context() {
    let effect = ReaderIOResult::try_from_fn(|context| {
        if context.is_cancelled() {
            Err(Error::msg("cancelled"))
        } else {
            Ok("running")
        }
    });

    let (context, handle) = Context::background().with_cancel();
    assert_eq!(effect.run(&context).await, Ok("running"));
    handle.cancel();
    assert_eq!(effect.run(&context).await, Err(Error::msg("cancelled")));
}

#[rstest]
#[tokio::test]
async fn test_from_io_runs_on_each_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let effect = ReaderIOResult::from_io(IO::new(move || counter.fetch_add(1, Ordering::SeqCst)));

    let _ = effect.run(&Context::background()).await;
    let _ = effect.run(&Context::background()).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[rstest]
#[tokio::test]
async fn test_from_io_result_keeps_failure() {
    let effect =
        ReaderIOResult::<i32>::from_io_result(IO::new(|| "x".parse::<i32>().map_err(Error::new)));
    let outcome = effect.run(&Context::background()).await;

    let error = outcome.unwrap_err();
    assert!(error.downcast_ref::<std::num::ParseIntError>().is_some());
}

#[rstest]
#[tokio::test]
async fn test_from_reader_reads_context() {
    let effect =
        ReaderIOResult::from_reader(Reader::asks(|context: &Context| context.is_cancelled()));
    let (context, handle) = Context::background().with_cancel();
    handle.cancel();

    assert_eq!(effect.run(&context).await, Ok(true));
}

#[rstest]
#[tokio::test]
async fn test_building_runs_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let _effect = counter_effect(&calls).map(|n| n + 1).chain(ReaderIOResult::of);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Sequencing
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_chain_passes_context() {
    let (context, _handle) = Context::background().with_cancel();
    let effect = ReaderIOResult::of(1).chain(|_| ReaderIOResult::ask());

    let seen = effect.run(&context).await.unwrap();
    assert_eq!(seen.cause(), None);
    assert_eq!(seen.deadline(), context.deadline());
}

#[rstest]
#[tokio::test]
async fn test_failure_short_circuits_sequence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let later = counter_effect(&calls);
    let effect = ReaderIOResult::<usize>::fail("early")
        .then(later.clone())
        .zip(later.clone())
        .chain_first(move |_| later.clone());

    assert_eq!(
        effect.run(&Context::background()).await,
        Err(Error::msg("early"))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn test_chain_first_keeps_value() {
    let calls = Arc::new(AtomicUsize::new(0));
    let side = calls.clone();
    let effect = ReaderIOResult::of(10).tap(move |value| {
        side.fetch_add(*value, Ordering::SeqCst);
        ReaderIOResult::of(())
    });

    assert_eq!(effect.run(&Context::background()).await, Ok(10));
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}

#[rstest]
#[tokio::test]
async fn test_chain_first_failure_fails_whole() {
    let effect = ReaderIOResult::of(1).chain_first(|_| ReaderIOResult::<()>::fail("side failed"));
    assert_eq!(
        effect.run(&Context::background()).await,
        Err(Error::msg("side failed"))
    );
}

#[rstest]
#[case("21", Ok(42))]
#[case("x", Err(()))]
#[tokio::test]
async fn test_chain_result(#[case] input: &'static str, #[case] expected: Result<i32, ()>) {
    let effect = ReaderIOResult::of(input)
        .chain_result(|text| text.parse::<i32>().map_err(Error::new))
        .map(|n| n * 2);

    let outcome = effect.run(&Context::background()).await.map_err(|_| ());
    assert_eq!(outcome, expected);
}

#[rstest]
#[tokio::test]
async fn test_chain_io() {
    let effect = ReaderIOResult::of(4).chain_io(|n| IO::new(move || n * n));
    assert_eq!(effect.run(&Context::background()).await, Ok(16));
}

#[rstest]
#[tokio::test]
async fn test_ap_applies_function() {
    let effect = ReaderIOResult::of(12).ap(ReaderIOResult::of(|n: i32| n.to_string()));

    assert_eq!(
        effect.run(&Context::background()).await,
        Ok(String::from("12"))
    );
}

#[rstest]
#[tokio::test]
async fn test_traverse_array_in_order() {
    let effect = traverse_array(vec![3, 1, 2], |n| ReaderIOResult::of(n * 10));
    assert_eq!(
        effect.run(&Context::background()).await,
        Ok(vec![30, 10, 20])
    );
}

#[rstest]
#[tokio::test]
async fn test_sequence_array_runs_one_at_a_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    let effects = vec![counter_effect(&calls), counter_effect(&calls), counter_effect(&calls)];

    assert_eq!(
        sequence_array(effects).run(&Context::background()).await,
        Ok(vec![0, 1, 2])
    );
}

// =============================================================================
// Recovery
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_or_else_sees_cause() {
    let effect = ReaderIOResult::<String>::fail("lookup failed")
        .or_else(|cause| ReaderIOResult::of(format!("recovered from {cause}")));

    assert_eq!(
        effect.run(&Context::background()).await,
        Ok(String::from("recovered from lookup failed"))
    );
}

#[rstest]
#[case(ReaderIOResult::of(1), Ok(1))]
#[case(ReaderIOResult::fail("primary"), Ok(2))]
#[tokio::test]
async fn test_alt(#[case] primary: ReaderIOResult<i32>, #[case] expected: Result<i32, Error>) {
    let effect = primary.alt(ReaderIOResult::of(2));
    assert_eq!(effect.run(&Context::background()).await, expected);
}

#[rstest]
#[tokio::test]
async fn test_fold_and_get_or_else() {
    let failed = ReaderIOResult::<i32>::fail("nope");
    let context = Context::background();

    let folded = failed.clone().fold(|error| error.to_string(), |n| n.to_string());
    assert_eq!(folded.run(&context).await, Ok(String::from("nope")));

    let defaulted = failed.get_or_else(|_| -1);
    assert_eq!(defaulted.run(&context).await, Ok(-1));
}

#[rstest]
#[tokio::test]
async fn test_bimap_and_map_err() {
    let context = Context::background();

    let failed = ReaderIOResult::<i32>::fail("inner")
        .map_err(|error| Error::msg(format!("outer: {error}")));
    assert_eq!(failed.run(&context).await, Err(Error::msg("outer: inner")));

    let succeeded = ReaderIOResult::of(2).bimap(|error| error, |n| n + 1);
    assert_eq!(succeeded.run(&context).await, Ok(3));
}

// =============================================================================
// Cancellation Guard
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_with_context_passes_through_live_context() {
    let effect = ReaderIOResult::of(5).with_context();
    assert_eq!(effect.run(&Context::background()).await, Ok(5));
}

#[rstest]
#[tokio::test]
async fn test_with_context_reports_parent_cause() {
    let calls = Arc::new(AtomicUsize::new(0));
    let effect = counter_effect(&calls).with_context();

    let (parent, handle) = Context::background().with_cancel();
    let (child, _child_handle) = parent.with_cancel();
    handle.cancel_with(Error::msg("request aborted"));

    assert_eq!(effect.run(&child).await, Err(Error::msg("request aborted")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn test_local_scopes_context() {
    let effect = ReaderIOResult::ask()
        .map(|context| context.is_cancelled())
        .local(|context| {
            let (scoped, handle) = context.with_cancel();
            handle.cancel_with(Error::msg("scoped"));
            (scoped, handle)
        });

    let parent = Context::background();
    assert_eq!(effect.run(&parent).await, Ok(true));
    assert!(!parent.is_cancelled());
}

#[rstest]
#[tokio::test]
async fn test_display() {
    assert_eq!(format!("{}", ReaderIOResult::of(1)), "<ReaderIOResult>");
}
