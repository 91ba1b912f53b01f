//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::task::ScheduleHandle;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, TokioClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for the execution queue actions run on.
///
/// Infrastructure provides concrete implementations (TokioExecutor, ManualExecutor).
/// Deadlines are expressed on the same timeline as the dispatcher's [`Clock`],
/// so an executor must be paired with a matching clock.
pub trait Executor: Send + Sync + Debug {
    /// Run a job as soon as possible without blocking the caller.
    fn execute(&self, job: Job);

    /// Run a job once `deadline` has been reached.
    ///
    /// The returned handle lets the caller release the executor's resources
    /// if the job is cancelled before it fires.
    fn execute_at(&self, deadline: Instant, job: Job) -> ScheduleHandle;
}

/// Port for concurrent key-value storage.
///
/// This abstraction allows the application layer to store and retrieve values
/// without depending on specific concurrent data structure implementations.
/// Infrastructure provides concrete implementations (ShardedStorage).
///
/// Every single-key operation is atomic with respect to other operations on
/// the same key. Callbacks run while that key is locked and must not call
/// back into the same storage.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Read-modify-write a single entry.
    ///
    /// The callback receives the current value, if any, and returns an
    /// optional replacement together with a result. A `None` replacement
    /// leaves the entry untouched.
    fn upsert<F, R>(&self, key: K, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> (Option<V>, R);

    /// Insert a value, returning the one it displaced.
    fn replace(&self, key: K, value: V) -> Option<V>;

    /// Remove an entry if the predicate holds for its current value.
    fn remove_if<F>(&self, key: &K, predicate: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool;

    /// Remove an entry unconditionally.
    fn remove(&self, key: &K) -> Option<V>;

    /// Read an entry through a callback.
    fn inspect<F, R>(&self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Iterate over all entries, providing access to both key and value.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}
