//! Tokio-backed executor.
//!
//! Jobs run on the runtime the executor was created from. Delayed jobs sleep
//! until their deadline in a spawned task; cancelling one aborts that task so
//! superseded throttles do not hold timer entries until they would have fired.
//!
//! Jobs run inline on a runtime worker. Actions that block for long periods
//! should hand their work off (for example with `tokio::task::spawn_blocking`).

use crate::application::ports::{Executor, Job};
use crate::domain::task::ScheduleHandle;
use std::time::Instant;
use tokio::runtime::Handle;

/// Executor spawning jobs onto a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Create an executor for a specific runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create an executor for the runtime the caller is running on.
    ///
    /// Returns `None` outside of a Tokio runtime context.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Get the runtime handle.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }

    fn execute_at(&self, deadline: Instant, job: Job) -> ScheduleHandle {
        let task = self.handle.spawn(async move {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            job();
        });

        let abort = task.abort_handle();
        ScheduleHandle::from_abort(move || abort.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_job(count: &Arc<AtomicUsize>) -> Job {
        let count = Arc::clone(count);
        Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_try_current_outside_runtime() {
        assert!(TokioExecutor::try_current().is_none());
    }

    #[test]
    fn test_executor_for_explicit_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let executor = TokioExecutor::new(runtime.handle().clone());
        let spawned = executor.handle().spawn(async { 7 });
        assert_eq!(runtime.block_on(spawned).unwrap(), 7);

        let count = Arc::new(AtomicUsize::new(0));
        executor.execute(counting_job(&count));
        runtime.block_on(async { tokio::time::sleep(Duration::from_millis(10)).await });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_runs_job() {
        let executor = TokioExecutor::try_current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        executor.execute(counting_job(&count));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_at_waits_for_deadline() {
        let executor = TokioExecutor::try_current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let deadline = tokio::time::Instant::now().into_std() + Duration::from_millis(100);

        executor.execute_at(deadline, counting_job(&count));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_drops_scheduled_job() {
        let executor = TokioExecutor::try_current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let deadline = tokio::time::Instant::now().into_std() + Duration::from_millis(100);

        let handle = executor.execute_at(deadline, counting_job(&count));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
