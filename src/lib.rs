//! # dispatch-throttle
//!
//! Keyed debounce and throttle for actions dispatched onto an executor.
//!
//! Every call is scoped by an optional **context key**. Calls sharing a key
//! interact; calls on different keys are fully independent. Calls without a
//! key share a single default timeline.
//!
//! - **Debounce** runs the first call of a burst immediately and silently
//!   discards further calls on the same key until the interval has elapsed.
//!   There is no trailing execution.
//! - **Throttle** schedules an action for a deadline. A newer call on the same
//!   key cancels whatever was still pending, so only the latest action runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dispatch_throttle::ShardedDispatcher;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // Uses sharded storage, the system clock and the current Tokio runtime.
//! let dispatcher = ShardedDispatcher::<&'static str>::builder()
//!     .build()
//!     .expect("called inside a Tokio runtime");
//!
//! // Only the first tap within 500ms opens the detail view.
//! dispatcher.debounce(Duration::from_millis(500), Some("stop-detail"), || {
//!     println!("opening stop detail");
//! });
//!
//! // Only the last keystroke's query is sent, 300ms after typing stops.
//! for query in ["b", "br", "bro"] {
//!     dispatcher.throttle_after(Duration::from_millis(300), Some("search"), move || {
//!         println!("searching for {query}");
//!     });
//! }
//! # }
//! ```
//!
//! ## Context Keys
//!
//! Any `Hash + Eq + Clone + Send + Sync + Debug + 'static` type can key a
//! dispatcher. Passing `None` uses [`ContextKey::Default`], the shared timeline:
//!
//! ```rust,no_run
//! # use dispatch_throttle::ShardedDispatcher;
//! # use std::time::Duration;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! # let dispatcher = ShardedDispatcher::<u32>::builder().build().unwrap();
//! // These two interfere with each other...
//! dispatcher.debounce(Duration::from_secs(1), None, || println!("first"));
//! dispatcher.debounce(Duration::from_secs(1), None, || println!("suppressed"));
//!
//! // ...but not with keyed calls.
//! dispatcher.debounce(Duration::from_secs(1), Some(42), || println!("runs"));
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Cancellation is cooperative. Every scheduled action carries an atomic state
//! that is claimed before the action runs; superseding or cancelling a task
//! flips the same state, so an action either runs once or never. Cancelling a
//! task that already started is a no-op. Dropping the last dispatcher handle
//! cancels all pending throttled actions.
//!
//! ## Observability
//!
//! Dispatch counters are available through [`Metrics`]:
//!
//! ```rust,no_run
//! # use dispatch_throttle::ShardedDispatcher;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! # let dispatcher = ShardedDispatcher::<u32>::builder().build().unwrap();
//! let snapshot = dispatcher.metrics().snapshot();
//! println!("debounce suppression: {:.1}%", snapshot.debounce_suppression_rate() * 100.0);
//! println!("throttles superseded: {}", snapshot.throttle_superseded);
//! # }
//! ```
//!
//! The dispatcher also logs through `tracing`: suppressed and scheduled calls
//! at `TRACE`, superseded and cancelled throttles at `DEBUG`, and panicking
//! actions at `WARN`. Each event carries a `context` field.
//!
//! ## Testing
//!
//! With the `test-helpers` feature, `infrastructure::mocks` provides a
//! `MockClock` and a `ManualExecutor` that fires scheduled jobs only when the
//! test advances time. Under Tokio's paused test time, build the dispatcher
//! with [`TokioClock`] so debounce intervals follow the virtual clock.

// Domain layer - pure scheduling concepts
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    context::{ContextKey, ContextValue, TimerSlot},
    decision::{DebounceDecision, DebounceWindow, ThrottleOutcome},
    task::{PendingTask, ScheduleHandle, TaskId, TaskState, TaskStatus},
};

pub use application::{
    dispatcher::{Dispatcher, DispatcherConfig},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Executor, Job, Storage},
    registry::TimerRegistry,
};

pub use infrastructure::{
    builder::{BuildError, DispatcherBuilder, ShardedDispatcher},
    clock::SystemClock,
    storage::ShardedStorage,
};

#[cfg(feature = "async")]
pub use infrastructure::{clock::TokioClock, executor::TokioExecutor};
