//! Dispatcher construction.
//!
//! `ShardedDispatcher::builder()` wires the default adapters (sharded storage,
//! system clock, Tokio executor) and validates the configuration.

use crate::application::dispatcher::{Dispatcher, DispatcherConfig};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Executor};
use crate::application::registry::TimerRegistry;
use crate::domain::context::{ContextKey, ContextValue, TimerSlot};
use crate::domain::task::PendingTask;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::{valid_shard_amount, ShardedStorage};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// Dispatcher backed by sharded in-memory storage.
pub type ShardedDispatcher<K> =
    Dispatcher<K, ShardedStorage<ContextKey<K>, Instant>, ShardedStorage<TimerSlot<K>, PendingTask>>;

/// Error returned when building a dispatcher fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// No executor was configured and no Tokio runtime is available
    MissingExecutor,
    /// Shard amount must be a power of two greater than 1
    InvalidShardAmount(usize),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MissingExecutor => {
                write!(
                    f,
                    "no executor configured and no Tokio runtime is current"
                )
            }
            BuildError::InvalidShardAmount(amount) => {
                write!(
                    f,
                    "shard amount must be a power of two greater than 1, got {}",
                    amount
                )
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Builder for constructing a [`ShardedDispatcher`].
pub struct DispatcherBuilder<K> {
    clock: Option<Arc<dyn Clock>>,
    executor: Option<Arc<dyn Executor>>,
    metrics: Option<Metrics>,
    config: DispatcherConfig,
    shard_amount: Option<usize>,
    _key: PhantomData<fn() -> K>,
}

impl<K: ContextValue> DispatcherBuilder<K> {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            clock: None,
            executor: None,
            metrics: None,
            config: DispatcherConfig::default(),
            shard_amount: None,
            _key: PhantomData,
        }
    }

    /// Set a custom clock (mainly for testing).
    ///
    /// The clock must share a timeline with the executor's deadlines.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the executor actions run on.
    ///
    /// Defaults to a `TokioExecutor` on the current runtime.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Share an existing metrics tracker.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Enable or disable automatic expiry of debounce timestamps.
    ///
    /// Enabled by default.
    pub fn with_timestamp_expiry(mut self, enabled: bool) -> Self {
        self.config.expire_timestamps = enabled;
        self
    }

    /// Set the number of shards in each registry map.
    pub fn with_shard_amount(mut self, shard_amount: usize) -> Self {
        self.shard_amount = Some(shard_amount);
        self
    }

    /// Build the dispatcher.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid.
    pub fn build(self) -> Result<ShardedDispatcher<K>, BuildError> {
        let (timestamps, pending) = match self.shard_amount {
            Some(amount) if !valid_shard_amount(amount) => {
                return Err(BuildError::InvalidShardAmount(amount));
            }
            Some(amount) => (
                ShardedStorage::with_shard_amount(amount),
                ShardedStorage::with_shard_amount(amount),
            ),
            None => (ShardedStorage::new(), ShardedStorage::new()),
        };

        let executor = match self.executor {
            Some(executor) => executor,
            None => default_executor()?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let metrics = self.metrics.unwrap_or_default();

        Ok(Dispatcher::new(
            TimerRegistry::new(timestamps, pending),
            clock,
            executor,
            metrics,
            self.config,
        ))
    }
}

impl<K: ContextValue> Default for DispatcherBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "async")]
fn default_executor() -> Result<Arc<dyn Executor>, BuildError> {
    crate::infrastructure::executor::TokioExecutor::try_current()
        .map(|executor| Arc::new(executor) as Arc<dyn Executor>)
        .ok_or(BuildError::MissingExecutor)
}

#[cfg(not(feature = "async"))]
fn default_executor() -> Result<Arc<dyn Executor>, BuildError> {
    Err(BuildError::MissingExecutor)
}

impl<K: ContextValue> ShardedDispatcher<K> {
    /// Create a builder for a dispatcher keyed by `K`.
    ///
    /// # Example
    /// ```rust,no_run
    /// use dispatch_throttle::ShardedDispatcher;
    /// use std::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let dispatcher = ShardedDispatcher::<String>::builder()
    ///     .with_shard_amount(16)
    ///     .build()
    ///     .expect("valid config");
    ///
    /// dispatcher.throttle_after(Duration::from_millis(300), Some("search".to_string()), || {
    ///     println!("querying");
    /// });
    /// # }
    /// ```
    pub fn builder() -> DispatcherBuilder<K> {
        DispatcherBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::{ManualExecutor, MockClock};

    fn manual() -> Arc<dyn Executor> {
        Arc::new(ManualExecutor::new(MockClock::new(Instant::now())))
    }

    #[test]
    fn test_build_with_executor() {
        let dispatcher: ShardedDispatcher<u32> = ShardedDispatcher::builder()
            .with_executor(manual())
            .build()
            .unwrap();

        assert!(dispatcher.config().expire_timestamps);
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[test]
    fn test_missing_executor_outside_runtime() {
        let result: Result<ShardedDispatcher<u32>, _> = ShardedDispatcher::builder().build();
        assert!(matches!(result, Err(BuildError::MissingExecutor)));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_default_executor_inside_runtime() {
        let result: Result<ShardedDispatcher<u32>, _> = ShardedDispatcher::builder().build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_shard_amount() {
        let result: Result<ShardedDispatcher<u32>, _> = ShardedDispatcher::builder()
            .with_executor(manual())
            .with_shard_amount(3)
            .build();

        assert_eq!(result.unwrap_err(), BuildError::InvalidShardAmount(3));
    }

    #[test]
    fn test_valid_shard_amount() {
        let result: Result<ShardedDispatcher<u32>, _> = ShardedDispatcher::builder()
            .with_executor(manual())
            .with_shard_amount(8)
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_shared_metrics() {
        let metrics = Metrics::new();
        let dispatcher: ShardedDispatcher<u32> = ShardedDispatcher::builder()
            .with_executor(manual())
            .with_metrics(metrics.clone())
            .build()
            .unwrap();

        dispatcher.debounce(std::time::Duration::from_secs(1), Some(1), || {});
        assert_eq!(metrics.debounce_executed(), 1);
    }

    #[test]
    fn test_build_error_display() {
        assert_eq!(
            BuildError::InvalidShardAmount(6).to_string(),
            "shard amount must be a power of two greater than 1, got 6"
        );
        assert!(BuildError::MissingExecutor.to_string().contains("executor"));
    }
}
