#![cfg(feature = "async")]
//! Tests for retrying effects under a policy.

use ctxio::context::Context;
use ctxio::effect::Error;
use ctxio::readerioresult::{ReaderIOResult, RetryPolicy, RetryStatus, retrying};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn flaky(calls: &Arc<AtomicUsize>, failures: usize) -> ReaderIOResult<usize> {
    let calls = calls.clone();
    ReaderIOResult::new(move |_| {
        let calls = calls.clone();
        async move {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            if attempt < failures {
                Err(Error::msg("transient"))
            } else {
                Ok(attempt)
            }
        }
    })
}

#[rstest]
#[case(0, 3, Ok(0), 1)]
#[case(2, 3, Ok(2), 3)]
#[case(5, 3, Err(Error::msg("transient")), 4)]
#[tokio::test]
async fn test_retry_counts(
    #[case] failures: usize,
    #[case] retries: usize,
    #[case] expected: Result<usize, Error>,
    #[case] attempts: usize,
) {
    let calls = Arc::new(AtomicUsize::new(0));
    let action_calls = calls.clone();
    let effect = retrying(
        RetryPolicy::limit_retries(retries),
        move |_| flaky(&action_calls, failures),
        |outcome| outcome.is_err(),
    );

    assert_eq!(effect.run(&Context::background()).await, expected);
    assert_eq!(calls.load(Ordering::SeqCst), attempts);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_waits() {
    let started = Instant::now();
    let calls = Arc::new(AtomicUsize::new(0));
    let action_calls = calls.clone();
    let effect = retrying(
        RetryPolicy::limit_retries(3).with_exponential_backoff(Duration::from_millis(100)),
        move |_| flaky(&action_calls, 3),
        |outcome| outcome.is_err(),
    );

    assert_eq!(effect.run(&Context::background()).await, Ok(3));
    // 100 + 200 + 400
    assert!(started.elapsed() >= Duration::from_millis(700));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_status_reports_cumulative_delay() {
    let statuses = Arc::new(parking_lot::Mutex::new(Vec::<RetryStatus>::new()));
    let sink = statuses.clone();
    let effect = retrying(
        RetryPolicy::limit_retries(2).with_constant_delay(Duration::from_millis(10)),
        move |status| {
            sink.lock().push(*status);
            ReaderIOResult::<()>::fail("again")
        },
        |outcome| outcome.is_err(),
    );

    let _ = effect.run(&Context::background()).await;

    let statuses = statuses.lock();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[2].iteration, 2);
    assert_eq!(statuses[2].cumulative_delay, Duration::from_millis(20));
    assert_eq!(statuses[2].previous_delay, Some(Duration::from_millis(10)));
}

#[rstest]
#[tokio::test]
async fn test_retry_on_success_value() {
    let calls = Arc::new(AtomicUsize::new(0));
    let action_calls = calls.clone();
    let effect = retrying(
        RetryPolicy::limit_retries(10),
        move |_| flaky(&action_calls, 0),
        |outcome| matches!(outcome, Ok(attempt) if *attempt < 4),
    );

    assert_eq!(effect.run(&Context::background()).await, Ok(4));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_cancel_during_wait_returns_cause() {
    let (context, handle) = Context::background().with_cancel();
    let calls = Arc::new(AtomicUsize::new(0));
    let action_calls = calls.clone();
    let effect = retrying(
        RetryPolicy::unlimited().with_constant_delay(Duration::from_secs(10)),
        move |_| flaky(&action_calls, usize::MAX),
        |outcome| outcome.is_err(),
    );
    let pending = tokio::spawn({
        let context = context.clone();
        async move { effect.run(&context).await }
    });

    tokio::time::sleep(Duration::from_secs(25)).await;
    handle.cancel_with(Error::msg("shutdown"));

    assert_eq!(pending.await.unwrap(), Err(Error::msg("shutdown")));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[rstest]
fn test_default_policy_is_bounded() {
    let policy = RetryPolicy::default();
    let mut status = RetryStatus::start();
    let mut retries = 0;
    while policy.next_delay(&status).is_some() {
        retries += 1;
        status = RetryStatus {
            iteration: status.iteration + 1,
            ..status
        };
    }
    assert_eq!(retries, 5);
}
