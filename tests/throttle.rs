//! Integration tests for throttle on a Tokio runtime.

#![cfg(feature = "async")]

use dispatch_throttle::{ShardedDispatcher, ThrottleOutcome, TokioClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type Log = Arc<Mutex<Vec<(&'static str, Duration)>>>;

fn dispatcher() -> ShardedDispatcher<&'static str> {
    ShardedDispatcher::builder()
        .with_clock(Arc::new(TokioClock::new()))
        .build()
        .expect("test runs inside a Tokio runtime")
}

fn record(log: &Log, start: Instant, label: &'static str) -> impl FnOnce() + Send + 'static {
    let log = Arc::clone(log);
    move || log.lock().unwrap().push((label, start.elapsed()))
}

/// Paused time fires timers on millisecond ticks.
fn assert_fired_at(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(2),
        "fired at {:?}, expected {:?}",
        actual,
        expected
    );
}

#[tokio::test(start_paused = true)]
async fn test_latest_call_wins() {
    let dispatcher = dispatcher();
    let log = Log::default();
    let start = Instant::now();
    let now = start.into_std();

    let first = dispatcher.throttle(now + Duration::from_secs(1), Some("y"), record(&log, start, "A"));
    let second = dispatcher.throttle(
        now + Duration::from_millis(200),
        Some("y"),
        record(&log, start, "B"),
    );

    assert_eq!(first, ThrottleOutcome::Scheduled);
    assert!(!first.is_replaced());
    assert!(second.is_replaced());

    tokio::time::sleep(Duration::from_secs(2)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, "B");
    assert_fired_at(log[0].1, Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_burst_fires_once_after_last_call() {
    let dispatcher = dispatcher();
    let log = Log::default();
    let start = Instant::now();

    for _ in 0..5 {
        dispatcher.throttle_after(Duration::from_millis(100), Some("search"), record(&log, start, "query"));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    // Last call at 200ms, deadline 100ms later.
    assert_fired_at(log[0].1, Duration::from_millis(300));
    assert_eq!(dispatcher.metrics().throttle_superseded(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_keys_are_independent() {
    let dispatcher = dispatcher();
    let log = Log::default();
    let start = Instant::now();

    dispatcher.throttle_after(Duration::from_millis(100), Some("a"), record(&log, start, "a"));
    dispatcher.throttle_after(Duration::from_millis(150), Some("b"), record(&log, start, "b"));
    dispatcher.throttle_after(Duration::from_millis(200), None, record(&log, start, "default"));

    tokio::time::sleep(Duration::from_millis(300)).await;

    let labels: Vec<_> = log.lock().unwrap().iter().map(|(label, _)| *label).collect();
    assert_eq!(labels, vec!["a", "b", "default"]);
    assert_eq!(dispatcher.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_execution() {
    let dispatcher = dispatcher();
    let log = Log::default();
    let start = Instant::now();

    dispatcher.throttle_after(Duration::from_millis(100), Some("y"), record(&log, start, "cancelled"));
    assert!(dispatcher.is_pending(Some("y")));
    assert!(dispatcher.cancel(Some("y")));

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(log.lock().unwrap().is_empty());
    assert!(!dispatcher.is_pending(Some("y")));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_dispatcher_cancels_pending() {
    let dispatcher = dispatcher();
    let log = Log::default();
    let start = Instant::now();

    dispatcher.throttle_after(Duration::from_millis(100), Some("y"), record(&log, start, "orphan"));
    drop(dispatcher);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reentrant_throttle_from_action() {
    let dispatcher = dispatcher();
    let log = Log::default();
    let start = Instant::now();

    let again = dispatcher.clone();
    let follow_up = record(&log, start, "follow-up");
    dispatcher.throttle_after(Duration::from_millis(100), Some("poll"), move || {
        again.throttle_after(Duration::from_millis(100), Some("poll"), follow_up);
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(dispatcher.is_pending(Some("poll")));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_fired_at(log[0].1, Duration::from_millis(200));
    assert!(!dispatcher.is_pending(Some("poll")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_throttle_on_one_key_runs_once() {
    let dispatcher = ShardedDispatcher::<&'static str>::builder()
        .build()
        .expect("test runs inside a Tokio runtime");
    let runs = Arc::new(AtomicUsize::new(0));

    let callers: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            let runs = Arc::clone(&runs);
            tokio::task::spawn_blocking(move || {
                for _ in 0..200 {
                    let runs = Arc::clone(&runs);
                    dispatcher.throttle_after(Duration::from_secs(1), Some("shared"), move || {
                        runs.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();

    for caller in callers {
        caller.await.unwrap();
    }
    assert_eq!(dispatcher.pending_count(), 1);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.pending_count(), 0);
    assert_eq!(dispatcher.metrics().throttle_superseded(), 8 * 200 - 1);
}
