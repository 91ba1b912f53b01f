//! Domain layer - pure scheduling concepts with no external dependencies.
//!
//! This layer contains the core concepts and invariants of keyed scheduling:
//! - Context keys and timer slots
//! - Debounce window rule and operation outcomes
//! - Cancellable task lifecycle
//!
//! All types in this layer are pure and easily testable.

pub mod context;
pub mod decision;
pub mod task;
