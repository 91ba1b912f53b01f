//! Observability metrics for debounce and throttle.
//!
//! Provides counters about dispatch behavior for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking dispatch statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Debounce calls whose action was dispatched
    debounce_executed: AtomicU64,
    /// Debounce calls discarded inside an interval
    debounce_suppressed: AtomicU64,
    /// Throttled actions scheduled
    throttle_scheduled: AtomicU64,
    /// Pending throttled actions cancelled by a newer call
    throttle_superseded: AtomicU64,
    /// Throttled actions that ran
    throttle_executed: AtomicU64,
    /// Pending throttled actions cancelled explicitly
    throttle_cancelled: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_debounce_executed(&self) {
        self.inner.debounce_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_debounce_suppressed(&self) {
        self.inner
            .debounce_suppressed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_scheduled(&self) {
        self.inner.throttle_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_superseded(&self) {
        self.inner
            .throttle_superseded
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_executed(&self) {
        self.inner.throttle_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_cancelled(&self) {
        self.inner.throttle_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of debounce calls that dispatched their action.
    pub fn debounce_executed(&self) -> u64 {
        self.inner.debounce_executed.load(Ordering::Relaxed)
    }

    /// Get the number of debounce calls that were discarded.
    pub fn debounce_suppressed(&self) -> u64 {
        self.inner.debounce_suppressed.load(Ordering::Relaxed)
    }

    /// Get the number of throttled actions scheduled.
    pub fn throttle_scheduled(&self) -> u64 {
        self.inner.throttle_scheduled.load(Ordering::Relaxed)
    }

    /// Get the number of pending throttled actions replaced by a newer call.
    pub fn throttle_superseded(&self) -> u64 {
        self.inner.throttle_superseded.load(Ordering::Relaxed)
    }

    /// Get the number of throttled actions that ran.
    pub fn throttle_executed(&self) -> u64 {
        self.inner.throttle_executed.load(Ordering::Relaxed)
    }

    /// Get the number of throttled actions cancelled explicitly.
    pub fn throttle_cancelled(&self) -> u64 {
        self.inner.throttle_cancelled.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            debounce_executed: self.debounce_executed(),
            debounce_suppressed: self.debounce_suppressed(),
            throttle_scheduled: self.throttle_scheduled(),
            throttle_superseded: self.throttle_superseded(),
            throttle_executed: self.throttle_executed(),
            throttle_cancelled: self.throttle_cancelled(),
        }
    }

    /// Reset all metrics to zero.
    ///
    /// Useful for testing or when starting a new monitoring period.
    pub fn reset(&self) {
        self.inner.debounce_executed.store(0, Ordering::Relaxed);
        self.inner.debounce_suppressed.store(0, Ordering::Relaxed);
        self.inner.throttle_scheduled.store(0, Ordering::Relaxed);
        self.inner.throttle_superseded.store(0, Ordering::Relaxed);
        self.inner.throttle_executed.store(0, Ordering::Relaxed);
        self.inner.throttle_cancelled.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Debounce calls whose action was dispatched
    pub debounce_executed: u64,
    /// Debounce calls discarded inside an interval
    pub debounce_suppressed: u64,
    /// Throttled actions scheduled
    pub throttle_scheduled: u64,
    /// Pending throttled actions cancelled by a newer call
    pub throttle_superseded: u64,
    /// Throttled actions that ran
    pub throttle_executed: u64,
    /// Pending throttled actions cancelled explicitly
    pub throttle_cancelled: u64,
}

impl MetricsSnapshot {
    /// Fraction of debounce calls that were discarded (0.0 to 1.0).
    ///
    /// Returns 0.0 if no debounce calls have been made.
    pub fn debounce_suppression_rate(&self) -> f64 {
        let total = self.debounce_calls();
        if total == 0 {
            0.0
        } else {
            self.debounce_suppressed as f64 / total as f64
        }
    }

    /// Fraction of scheduled throttles that were replaced before firing (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been scheduled.
    pub fn throttle_supersede_rate(&self) -> f64 {
        if self.throttle_scheduled == 0 {
            0.0
        } else {
            self.throttle_superseded as f64 / self.throttle_scheduled as f64
        }
    }

    /// Get the total number of debounce calls (executed + suppressed).
    pub fn debounce_calls(&self) -> u64 {
        self.debounce_executed
            .saturating_add(self.debounce_suppressed)
    }
}
