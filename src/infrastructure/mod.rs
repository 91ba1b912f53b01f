//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time, Tokio time, mock)
//! - Storage implementations (sharded maps)
//! - Executors (Tokio runtime, manual test queue)
//! - Dispatcher construction and validation

pub mod builder;
pub mod clock;
pub mod storage;

#[cfg(feature = "async")]
pub mod executor;

pub use builder::ShardedDispatcher;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides a controllable clock, a manually driven
/// executor and a log-capturing tracing layer.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// dispatch-throttle = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
