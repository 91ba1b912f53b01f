//! Integration tests for debounce on a Tokio runtime.

#![cfg(feature = "async")]

use dispatch_throttle::{DebounceDecision, ShardedDispatcher, TokioClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn dispatcher() -> ShardedDispatcher<&'static str> {
    ShardedDispatcher::builder()
        .with_clock(Arc::new(TokioClock::new()))
        .build()
        .expect("test runs inside a Tokio runtime")
}

fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
    let counter = Arc::clone(counter);
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_runs_first_call_only() {
    let dispatcher = dispatcher();
    let runs = Arc::new(AtomicUsize::new(0));
    let interval = Duration::from_secs(1);

    assert_eq!(
        dispatcher.debounce(interval, Some("x"), counting(&runs)),
        DebounceDecision::Execute
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        dispatcher.debounce(interval, Some("x"), counting(&runs)),
        DebounceDecision::Suppress
    );

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(
        dispatcher.debounce(interval, Some("x"), counting(&runs)),
        DebounceDecision::Execute
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let metrics = dispatcher.metrics();
    assert_eq!(metrics.debounce_executed(), 2);
    assert_eq!(metrics.debounce_suppressed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unkeyed_calls_share_a_timeline() {
    let dispatcher = dispatcher();
    let runs = Arc::new(AtomicUsize::new(0));
    let interval = Duration::from_secs(1);

    dispatcher.debounce(interval, None, counting(&runs));
    dispatcher.debounce(interval, None, counting(&runs));
    // A keyed call is not affected by the default timeline.
    dispatcher.debounce(interval, Some("x"), counting(&runs));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_keys_do_not_interfere() {
    let dispatcher = dispatcher();
    let runs = Arc::new(AtomicUsize::new(0));
    let interval = Duration::from_secs(1);

    for key in ["a", "b", "c"] {
        assert!(dispatcher.debounce(interval, Some(key), counting(&runs)).is_execute());
    }
    for key in ["a", "b", "c"] {
        assert!(dispatcher.debounce(interval, Some(key), counting(&runs)).is_suppress());
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timestamps_expire_after_interval() {
    let dispatcher = dispatcher();
    let interval = Duration::from_millis(200);

    dispatcher.debounce(interval, Some("a"), || {});
    dispatcher.debounce(interval, Some("b"), || {});
    assert_eq!(dispatcher.tracked_contexts(), 2);
    assert!(dispatcher.last_accepted(Some("a")).is_some());

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(dispatcher.tracked_contexts(), 0);
    assert!(dispatcher.last_accepted(Some("a")).is_none());
    // Expiry timers are not reported as pending throttles.
    assert_eq!(dispatcher.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_leaves_throttle_untouched() {
    let dispatcher = dispatcher();
    let runs = Arc::new(AtomicUsize::new(0));

    dispatcher.throttle_after(Duration::from_millis(500), None, counting(&runs));
    dispatcher.debounce(Duration::from_millis(100), None, || {});

    // The debounce timestamp expires well before the throttle fires.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(dispatcher.is_pending(None));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!dispatcher.is_pending(None));
}
