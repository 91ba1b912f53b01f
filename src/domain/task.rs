//! Cancellable deferred tasks.
//!
//! A pending task is an owned unit of deferred work. Its lifecycle is a small
//! atomic state machine:
//!
//! ```text
//! Pending ──begin──▶ Running ──complete──▶ Completed
//!    │
//!    └──cancel──▶ Cancelled
//! ```
//!
//! `begin` and `cancel` race through a compare-exchange, so exactly one of
//! them wins. A task that lost to `cancel` never runs; cancelling a task that
//! already started is a no-op.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Identity of a scheduled task, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Create a task id from a raw value.
    pub fn new(raw: u64) -> Self {
        TaskId(raw)
    }

    /// Get the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Scheduled, not yet started
    Pending,
    /// The action is executing
    Running,
    /// The action returned (or panicked)
    Completed,
    /// Cancelled before it started
    Cancelled,
}

impl TaskStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            PENDING => TaskStatus::Pending,
            RUNNING => TaskStatus::Running,
            COMPLETED => TaskStatus::Completed,
            _ => TaskStatus::Cancelled,
        }
    }
}

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETED: u8 = 2;
const CANCELLED: u8 = 3;

/// Shared lifecycle flag between a scheduled job and its registry entry.
#[derive(Debug)]
pub struct TaskState {
    status: AtomicU8,
}

impl TaskState {
    /// Create a state in `Pending`.
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(PENDING),
        }
    }

    /// Get the current status.
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Claim the task for execution.
    ///
    /// Returns false if the task was cancelled or already claimed.
    pub fn begin(&self) -> bool {
        self.transition(PENDING, RUNNING)
    }

    /// Mark a running task as finished.
    pub fn complete(&self) {
        self.transition(RUNNING, COMPLETED);
    }

    /// Cancel a task that has not started.
    ///
    /// Returns false if the task is already running, finished, or cancelled.
    pub fn cancel(&self) -> bool {
        self.transition(PENDING, CANCELLED)
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.status
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::new()
    }
}

type AbortFn = Box<dyn Fn() + Send + Sync>;

/// Executor-side handle to scheduled work.
///
/// Aborting releases whatever the executor holds for the job (a sleeping
/// runtime task, a queue slot). Cancellation correctness never depends on it:
/// the job itself checks [`TaskState`] before running.
pub struct ScheduleHandle {
    abort: Option<AbortFn>,
}

impl ScheduleHandle {
    /// A handle with nothing to release.
    pub fn detached() -> Self {
        Self { abort: None }
    }

    /// A handle that runs `abort` when the work is cancelled.
    pub fn from_abort<F>(abort: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            abort: Some(Box::new(abort)),
        }
    }

    /// Release the executor's resources for this job.
    pub fn abort(&self) {
        if let Some(abort) = &self.abort {
            abort();
        }
    }
}

impl fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleHandle")
            .field("abortable", &self.abort.is_some())
            .finish()
    }
}

/// A scheduled unit of work as held by the registry.
#[derive(Debug)]
pub struct PendingTask {
    id: TaskId,
    deadline: Instant,
    state: Arc<TaskState>,
    handle: ScheduleHandle,
}

impl PendingTask {
    /// Create a pending task record.
    pub fn new(id: TaskId, deadline: Instant, state: Arc<TaskState>, handle: ScheduleHandle) -> Self {
        Self {
            id,
            deadline,
            state,
            handle,
        }
    }

    /// Get the task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Get the instant at which the task becomes eligible to run.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Get the current lifecycle status.
    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    /// Cancel the task if it has not started.
    ///
    /// Returns true if this call prevented the task from running.
    pub fn cancel(&self) -> bool {
        if self.state.cancel() {
            self.handle.abort();
            true
        } else {
            false
        }
    }
}
