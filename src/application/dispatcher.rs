//! Debounce and throttle coordination.
//!
//! The dispatcher combines the timer registry, a clock and an executor into
//! the two keyed operations:
//!
//! - **debounce**: run the first call of a burst immediately, discard the rest
//!   until the interval has elapsed
//! - **throttle**: run only the most recently scheduled call for a context,
//!   cancelling whatever was pending before it

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Executor, Job, Storage};
use crate::application::registry::TimerRegistry;
use crate::domain::context::{ContextKey, ContextValue, TimerSlot};
use crate::domain::decision::{deadline_after, DebounceDecision, ThrottleOutcome};
use crate::domain::task::{PendingTask, TaskId, TaskState};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Runtime toggles read by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Schedule removal of each debounce timestamp once its interval elapses.
    ///
    /// When disabled, timestamps live until [`Dispatcher::purge_timestamps`]
    /// or [`Dispatcher::clear`] removes them.
    pub expire_timestamps: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            expire_timestamps: true,
        }
    }
}

/// Keyed debounce and throttle over an executor.
///
/// Cheap to clone; clones share the registry, clock, executor and metrics.
/// When the last clone is dropped, every pending throttled action is cancelled.
pub struct Dispatcher<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    inner: Arc<Inner<K, T, P>>,
}

#[derive(Debug)]
struct Inner<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    registry: TimerRegistry<K, T, P>,
    clock: Arc<dyn Clock>,
    executor: Arc<dyn Executor>,
    metrics: Metrics,
    config: DispatcherConfig,
}

impl<K, T, P> Dispatcher<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant> + 'static,
    P: Storage<TimerSlot<K>, PendingTask> + 'static,
{
    /// Create a dispatcher from its parts.
    ///
    /// Most callers want `ShardedDispatcher::builder()` instead.
    pub fn new(
        registry: TimerRegistry<K, T, P>,
        clock: Arc<dyn Clock>,
        executor: Arc<dyn Executor>,
        metrics: Metrics,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                clock,
                executor,
                metrics,
                config,
            }),
        }
    }

    /// Run `action` now unless an accepted call for the same context happened
    /// less than `interval` ago.
    ///
    /// Discarded calls are dropped silently; there is no trailing execution.
    /// Calls with `context: None` share one timeline.
    pub fn debounce<F>(&self, interval: Duration, context: Option<K>, action: F) -> DebounceDecision
    where
        F: FnOnce() + Send + 'static,
    {
        let inner = &self.inner;
        let context = ContextKey::from_option(context);
        let now = inner.clock.now();
        let decision = inner.registry.accept_debounce(context.clone(), now, interval);

        match decision {
            DebounceDecision::Suppress => {
                inner.metrics.record_debounce_suppressed();
                trace!(?context, ?interval, "debounced call suppressed");
            }
            DebounceDecision::Execute => {
                inner.metrics.record_debounce_executed();
                trace!(?context, ?interval, "debounced call accepted");
                inner.executor.execute(Box::new(action));

                if inner.config.expire_timestamps {
                    schedule_expiry(inner, context, now, interval);
                }
            }
        }

        decision
    }

    /// Run `action` at `deadline`, replacing any action still pending for the
    /// same context.
    ///
    /// The new action is scheduled before the previous one is cancelled.
    pub fn throttle<F>(&self, deadline: Instant, context: Option<K>, action: F) -> ThrottleOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        let slot = TimerSlot::Throttle(ContextKey::from_option(context));
        schedule(&self.inner, slot, deadline, Box::new(action))
    }

    /// Like [`throttle`](Self::throttle) with a deadline `delay` from now.
    pub fn throttle_after<F>(&self, delay: Duration, context: Option<K>, action: F) -> ThrottleOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = deadline_after(self.inner.clock.now(), delay);
        self.throttle(deadline, context, action)
    }

    /// Drop the pending throttled action for a context without running it.
    ///
    /// Returns true if an action was prevented from running.
    pub fn cancel(&self, context: Option<K>) -> bool {
        let context = ContextKey::from_option(context);
        let cancelled = self
            .inner
            .registry
            .cancel(&TimerSlot::Throttle(context.clone()));

        if cancelled {
            self.inner.metrics.record_throttle_cancelled();
            debug!(?context, "pending throttled action cancelled");
        }
        cancelled
    }

    /// Check whether a throttled action is pending for a context.
    pub fn is_pending(&self, context: Option<K>) -> bool {
        let slot = TimerSlot::Throttle(ContextKey::from_option(context));
        self.inner.registry.is_pending(&slot)
    }

    /// Get the number of contexts with a pending throttled action.
    pub fn pending_count(&self) -> usize {
        self.inner.registry.pending_count()
    }

    /// Get the time of the last accepted debounce call for a context.
    pub fn last_accepted(&self, context: Option<K>) -> Option<Instant> {
        self.inner
            .registry
            .last_accepted(&ContextKey::from_option(context))
    }

    /// Get the number of contexts with a live debounce timestamp.
    pub fn tracked_contexts(&self) -> usize {
        self.inner.registry.tracked_contexts()
    }

    /// Forget debounce timestamps older than `max_age`.
    ///
    /// Returns the number of timestamps removed.
    pub fn purge_timestamps(&self, max_age: Duration) -> usize {
        let removed = self
            .inner
            .registry
            .purge_timestamps(self.inner.clock.now(), max_age);
        if removed > 0 {
            debug!(removed, ?max_age, "purged debounce timestamps");
        }
        removed
    }

    /// Cancel every pending action and forget every debounce timestamp.
    pub fn clear(&self) {
        self.inner.registry.clear();
    }

    /// Get the metrics tracker.
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Get the clock deadlines are measured against.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }
}

impl<K, T, P> Clone for Dispatcher<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T, P> fmt::Debug for Dispatcher<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.inner.registry)
            .field("executor", &self.inner.executor)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Schedule `action` into `slot`, superseding whatever was pending there.
fn schedule<K, T, P>(
    inner: &Arc<Inner<K, T, P>>,
    slot: TimerSlot<K>,
    deadline: Instant,
    action: Job,
) -> ThrottleOutcome
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant> + 'static,
    P: Storage<TimerSlot<K>, PendingTask> + 'static,
{
    let registry = &inner.registry;
    let id = registry.next_task_id();
    let state = Arc::new(TaskState::new());
    let tracked = slot.is_throttle();

    let job = pending_job(
        Arc::downgrade(inner),
        slot.clone(),
        id,
        Arc::clone(&state),
        tracked.then(|| inner.metrics.clone()),
        action,
    );

    // Schedule first, then cancel the predecessor.
    let handle = inner.executor.execute_at(deadline, job);
    let displaced = registry.install(slot.clone(), PendingTask::new(id, deadline, state, handle));
    registry.release_if_finished(&slot, id);

    let replaced = displaced.map(|previous| previous.cancel()).unwrap_or(false);

    if tracked {
        inner.metrics.record_throttle_scheduled();
        if replaced {
            inner.metrics.record_throttle_superseded();
            debug!(context = ?slot.context(), task = %id, "pending throttled action superseded");
        } else {
            trace!(context = ?slot.context(), task = %id, "throttled action scheduled");
        }
    }

    if replaced {
        ThrottleOutcome::Replaced
    } else {
        ThrottleOutcome::Scheduled
    }
}

/// Schedule removal of the debounce timestamp accepted at `accepted_at`.
///
/// If a newer acceptance is still live when the timer fires, the timer
/// reschedules itself for that timestamp.
fn schedule_expiry<K, T, P>(
    inner: &Arc<Inner<K, T, P>>,
    context: ContextKey<K>,
    accepted_at: Instant,
    interval: Duration,
) where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant> + 'static,
    P: Storage<TimerSlot<K>, PendingTask> + 'static,
{
    let weak = Arc::downgrade(inner);
    let expiring = context.clone();
    let cleanup: Job = Box::new(move || {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let now = inner.clock.now();
        if let Some(live) = inner
            .registry
            .expire_timestamp(&expiring, accepted_at, now, interval)
        {
            trace!(context = ?expiring, "debounce timestamp still live, expiry rescheduled");
            schedule_expiry(&inner, expiring, live, interval);
        }
    });

    schedule(
        inner,
        TimerSlot::Expiry(context),
        deadline_after(accepted_at, interval),
        cleanup,
    );
}

fn pending_job<K, T, P>(
    inner: Weak<Inner<K, T, P>>,
    slot: TimerSlot<K>,
    id: TaskId,
    state: Arc<TaskState>,
    metrics: Option<Metrics>,
    action: Job,
) -> Job
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant> + 'static,
    P: Storage<TimerSlot<K>, PendingTask> + 'static,
{
    Box::new(move || {
        if !state.begin() {
            return;
        }

        let _release = Release {
            inner,
            slot,
            id,
            state,
        };
        if let Some(metrics) = metrics {
            metrics.record_throttle_executed();
        }
        action();
    })
}

/// Completes a running task and frees its registry slot, even on panic.
struct Release<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    inner: Weak<Inner<K, T, P>>,
    slot: TimerSlot<K>,
    id: TaskId,
    state: Arc<TaskState>,
}

impl<K, T, P> Drop for Release<K, T, P>
where
    K: ContextValue,
    T: Storage<ContextKey<K>, Instant>,
    P: Storage<TimerSlot<K>, PendingTask>,
{
    fn drop(&mut self) {
        self.state.complete();

        if std::thread::panicking() {
            warn!(context = ?self.slot.context(), task = %self.id, "scheduled action panicked");
        }

        if let Some(inner) = self.inner.upgrade() {
            inner.registry.release(&self.slot, self.id);
        }
    }
}
