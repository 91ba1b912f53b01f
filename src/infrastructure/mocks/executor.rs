//! Manually driven executor for testing.

use super::clock::MockClock;
use crate::application::ports::{Clock, Executor, Job};
use crate::domain::task::ScheduleHandle;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Executor that queues jobs until a test runs them.
///
/// Immediate jobs are queued with the current mock time as their deadline.
/// Nothing runs until [`run_until_idle`](Self::run_until_idle) or
/// [`advance`](Self::advance) is called, and jobs always run on the calling
/// thread with the queue unlocked, so a job may schedule or cancel other jobs.
///
/// # Examples
///
/// ```
/// use dispatch_throttle::infrastructure::mocks::{ManualExecutor, MockClock};
/// use dispatch_throttle::application::ports::Executor;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let executor = ManualExecutor::new(MockClock::new(start));
/// let fired = Arc::new(AtomicBool::new(false));
///
/// let flag = Arc::clone(&fired);
/// executor.execute_at(
///     start + Duration::from_secs(1),
///     Box::new(move || flag.store(true, Ordering::SeqCst)),
/// );
///
/// executor.advance(Duration::from_millis(999));
/// assert!(!fired.load(Ordering::SeqCst));
///
/// executor.advance(Duration::from_millis(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[derive(Clone)]
pub struct ManualExecutor {
    clock: MockClock,
    queue: Arc<Mutex<JobQueue>>,
}

#[derive(Default)]
struct JobQueue {
    next_seq: u64,
    jobs: Vec<QueuedJob>,
}

struct QueuedJob {
    deadline: Instant,
    seq: u64,
    job: Job,
}

impl ManualExecutor {
    /// Create an executor driven by `clock`.
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            queue: Arc::new(Mutex::new(JobQueue::default())),
        }
    }

    /// Get the clock this executor advances.
    pub fn clock(&self) -> &MockClock {
        &self.clock
    }

    /// Get the number of queued jobs.
    pub fn queued(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Run every job due at the current mock time, including jobs queued by
    /// the jobs it runs.
    ///
    /// Returns the number of jobs run.
    pub fn run_until_idle(&self) -> usize {
        let now = self.clock.now();
        let mut ran = 0;
        while let Some(job) = self.pop_due(now) {
            job();
            ran += 1;
        }
        ran
    }

    /// Move the clock forward by `duration`, firing due jobs in deadline order.
    ///
    /// The clock is set to each job's deadline before it runs, so jobs observe
    /// the time they were scheduled for.
    ///
    /// Returns the number of jobs run.
    pub fn advance(&self, duration: Duration) -> usize {
        let target = self.clock.now() + duration;
        let mut ran = self.run_until_idle();

        while let Some(deadline) = self.next_deadline() {
            if deadline > target {
                break;
            }
            if deadline > self.clock.now() {
                self.clock.set(deadline);
            }
            ran += self.run_until_idle();
        }

        self.clock.set(target);
        ran + self.run_until_idle()
    }

    fn push(&self, deadline: Instant, job: Job) -> u64 {
        let mut queue = self.lock();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.jobs.push(QueuedJob { deadline, seq, job });
        seq
    }

    fn pop_due(&self, now: Instant) -> Option<Job> {
        let mut queue = self.lock();
        let index = queue
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, queued)| queued.deadline <= now)
            .min_by_key(|(_, queued)| (queued.deadline, queued.seq))
            .map(|(index, _)| index)?;
        Some(queue.jobs.remove(index).job)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.lock().jobs.iter().map(|queued| queued.deadline).min()
    }

    fn lock(&self) -> MutexGuard<'_, JobQueue> {
        lock_queue(&self.queue)
    }
}

fn lock_queue(queue: &Mutex<JobQueue>) -> MutexGuard<'_, JobQueue> {
    queue
        .lock()
        .expect("ManualExecutor mutex poisoned - a test thread panicked while holding the lock")
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        self.push(self.clock.now(), job);
    }

    fn execute_at(&self, deadline: Instant, job: Job) -> ScheduleHandle {
        let seq = self.push(deadline, job);
        let queue = Arc::clone(&self.queue);

        ScheduleHandle::from_abort(move || {
            let removed = {
                let mut queue = lock_queue(&queue);
                let index = queue.jobs.iter().position(|queued| queued.seq == seq);
                index.map(|index| queue.jobs.remove(index))
            };
            // Dropped with the queue unlocked; the job may own arbitrary state.
            drop(removed);
        })
    }
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("now", &self.clock.now())
            .field("queued", &self.queued())
            .finish()
    }
}
