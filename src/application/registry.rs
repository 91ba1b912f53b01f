//! Keyed timer registry.
//!
//! The registry owns the two keyed maps behind debounce and throttle:
//! last-accepted debounce timestamps per context, and the pending task per
//! timer slot. It is owned by a dispatcher and synchronized through the
//! Storage port rather than living in process-wide statics.

use crate::application::ports::Storage;
use crate::domain::context::{ContextKey, ContextValue, TimerSlot};
use crate::domain::decision::{DebounceDecision, DebounceWindow};
use crate::domain::task::{PendingTask, TaskId, TaskStatus};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Registry of debounce timestamps and pending tasks.
///
/// This type is generic over the storage implementations, allowing different
/// backends to be used. In production, use `ShardedStorage` for both.
///
/// Dropping the registry cancels every task still pending in it.
#[derive(Debug)]
pub struct TimerRegistry<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    timestamps: T,
    pending: P,
    next_id: AtomicU64,
    _key: PhantomData<fn() -> K>,
}

impl<K, T, P> TimerRegistry<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    /// Create a registry over timestamp and pending-task storage.
    pub fn new(timestamps: T, pending: P) -> Self {
        Self {
            timestamps,
            pending,
            next_id: AtomicU64::new(1),
            _key: PhantomData,
        }
    }

    /// Allocate a fresh task id.
    pub fn next_task_id(&self) -> TaskId {
        TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Decide a debounce call and record it if accepted.
    ///
    /// The check and the timestamp update happen under the same entry lock,
    /// so concurrent calls on one context cannot both be accepted.
    pub fn accept_debounce(
        &self,
        context: ContextKey<K>,
        now: Instant,
        interval: Duration,
    ) -> DebounceDecision {
        let window = DebounceWindow::new(interval);
        self.timestamps.upsert(context, |last| {
            let decision = window.evaluate(last.copied(), now);
            match decision {
                DebounceDecision::Execute => (Some(now), decision),
                DebounceDecision::Suppress => (None, decision),
            }
        })
    }

    /// Expire the debounce timestamp recorded at `accepted_at`.
    ///
    /// The stored timestamp is removed if it is the one recorded at
    /// `accepted_at`, or if it is at least `interval` old at `now`. Otherwise
    /// a newer acceptance is still live and its timestamp is returned, so the
    /// caller can schedule another expiry for it. Expiry timers for one
    /// context may be installed out of acceptance order, and the timer that
    /// survives is not always the one for the stored timestamp.
    pub fn expire_timestamp(
        &self,
        context: &ContextKey<K>,
        accepted_at: Instant,
        now: Instant,
        interval: Duration,
    ) -> Option<Instant> {
        let removed = self.timestamps.remove_if(context, |last| {
            *last == accepted_at || now.saturating_duration_since(*last) >= interval
        });
        if removed.is_some() {
            return None;
        }
        self.timestamps.inspect(context, |last| *last)
    }

    /// Get the last accepted debounce call for a context.
    pub fn last_accepted(&self, context: &ContextKey<K>) -> Option<Instant> {
        self.timestamps.inspect(context, |last| *last)
    }

    /// Get the number of contexts with a live debounce timestamp.
    pub fn tracked_contexts(&self) -> usize {
        self.timestamps.len()
    }

    /// Drop debounce timestamps older than `max_age`.
    ///
    /// Returns the number of timestamps removed.
    pub fn purge_timestamps(&self, now: Instant, max_age: Duration) -> usize {
        let mut removed = 0;
        self.timestamps.retain(|_, last| {
            let keep = now.saturating_duration_since(*last) < max_age;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Make `task` the pending task of `slot`, returning the task it displaced.
    ///
    /// The displaced task is returned uncancelled; the caller decides when to
    /// cancel it.
    pub fn install(&self, slot: TimerSlot<K>, task: PendingTask) -> Option<PendingTask> {
        self.pending.replace(slot, task)
    }

    /// Remove the entry for `slot` if it still holds task `id`.
    ///
    /// A task that fires after being superseded therefore never removes its
    /// successor.
    pub fn release(&self, slot: &TimerSlot<K>, id: TaskId) -> bool {
        self.pending
            .remove_if(slot, |task| task.id() == id)
            .is_some()
    }

    /// Release `slot` if task `id` already finished before it was installed.
    ///
    /// Closes the window where a job fires between being scheduled and being
    /// recorded in the registry.
    pub fn release_if_finished(&self, slot: &TimerSlot<K>, id: TaskId) -> bool {
        self.pending
            .remove_if(slot, |task| {
                task.id() == id && task.status() == TaskStatus::Completed
            })
            .is_some()
    }

    /// Cancel and remove the pending task for `slot`.
    ///
    /// Returns true if a task was prevented from running.
    pub fn cancel(&self, slot: &TimerSlot<K>) -> bool {
        self.pending
            .remove(slot)
            .map(|task| task.cancel())
            .unwrap_or(false)
    }

    /// Check whether `slot` has a task that has not finished.
    pub fn is_pending(&self, slot: &TimerSlot<K>) -> bool {
        self.pending
            .inspect(slot, |task| {
                matches!(task.status(), TaskStatus::Pending | TaskStatus::Running)
            })
            .unwrap_or(false)
    }

    /// Get the number of pending caller throttles.
    ///
    /// Internal timestamp-expiry tasks are not counted.
    pub fn pending_count(&self) -> usize {
        let mut count = 0;
        self.pending.for_each(|slot, _| {
            if slot.is_throttle() {
                count += 1;
            }
        });
        count
    }

    /// Cancel all pending tasks and forget all debounce timestamps.
    pub fn clear(&self) {
        self.cancel_all();
        self.timestamps.clear();
    }

    fn cancel_all(&self) {
        let mut slots = Vec::new();
        self.pending.for_each(|slot, _| slots.push(slot.clone()));

        // Cancel outside the map locks; aborting may drop arbitrary job state.
        for slot in slots {
            if let Some(task) = self.pending.remove(&slot) {
                task.cancel();
            }
        }
    }
}

impl<K, T, P> Drop for TimerRegistry<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    fn drop(&mut self) {
        self.cancel_all();
    }
}
