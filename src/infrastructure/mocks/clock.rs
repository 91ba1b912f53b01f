//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Mock clock for testing.
///
/// Time only moves when a test moves it, making debounce windows and throttle
/// deadlines deterministic. Pair it with
/// [`ManualExecutor`](super::ManualExecutor), which advances this clock as it
/// fires scheduled jobs.
///
/// # Examples
///
/// ```
/// use dispatch_throttle::infrastructure::mocks::MockClock;
/// use dispatch_throttle::application::ports::Clock;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
///
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.now(), start + Duration::from_millis(250));
/// assert_eq!(clock.elapsed(), Duration::from_millis(250));
/// ```
///
/// All clones share the same underlying time value.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: Instant) {
        *self.lock() = instant;
    }

    /// Get the instant the clock was created at.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Get the time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.start)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_and_set() {
        let origin = Instant::now();
        let clock = MockClock::new(origin);
        assert_eq!(clock.start(), origin);
        assert_eq!(clock.elapsed(), Duration::ZERO);

        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - origin, Duration::from_millis(500));

        clock.set(origin + Duration::from_secs(3));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));

        clock.set(origin);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_clones_share_time() {
        let clock = MockClock::new(Instant::now());
        let clone = clock.clone();

        clone.advance(Duration::from_secs(5));
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
    }
}
