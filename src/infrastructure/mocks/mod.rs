//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling deterministic testing of debounce and throttle behavior.

pub mod clock;
pub mod executor;
pub mod layer;

pub use clock::MockClock;
pub use executor::ManualExecutor;
pub use layer::MockCaptureLayer;
