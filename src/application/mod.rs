//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Timer registry (storage of debounce timestamps and pending tasks)
//! - Dispatcher (debounce and throttle operations)
//! - Metrics (dispatch counters)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod dispatcher;
pub mod metrics;
pub mod ports;
pub mod registry;
