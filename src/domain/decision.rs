//! Decisions made by the debounce and throttle operations.

use std::time::{Duration, Instant};

/// Decision made for a debounce call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
    /// The call was accepted and its action dispatched
    Execute,
    /// The call landed inside the interval of an earlier accepted call
    Suppress,
}

impl DebounceDecision {
    /// Check if the action was dispatched.
    pub fn is_execute(&self) -> bool {
        matches!(self, DebounceDecision::Execute)
    }

    /// Check if the call was discarded.
    pub fn is_suppress(&self) -> bool {
        matches!(self, DebounceDecision::Suppress)
    }
}

/// Result of scheduling a throttled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleOutcome {
    /// Nothing was pending for the context
    Scheduled,
    /// A pending action for the context was cancelled in favour of this one
    Replaced,
}

impl ThrottleOutcome {
    /// Check if an earlier pending action was dropped.
    pub fn is_replaced(&self) -> bool {
        matches!(self, ThrottleOutcome::Replaced)
    }
}

/// Leading-edge debounce rule.
///
/// A call is suppressed while less than `interval` has elapsed since the last
/// accepted call. The first call for a context always executes.
///
/// # Example
/// ```
/// use dispatch_throttle::{DebounceDecision, DebounceWindow};
/// use std::time::{Duration, Instant};
///
/// let window = DebounceWindow::new(Duration::from_secs(1));
/// let start = Instant::now();
///
/// assert_eq!(window.evaluate(None, start), DebounceDecision::Execute);
/// assert_eq!(
///     window.evaluate(Some(start), start + Duration::from_millis(500)),
///     DebounceDecision::Suppress
/// );
/// assert_eq!(
///     window.evaluate(Some(start), start + Duration::from_millis(1200)),
///     DebounceDecision::Execute
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceWindow {
    interval: Duration,
}

impl DebounceWindow {
    /// Create a window of the given length.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Get the window length.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Decide a call made at `now` given the last accepted call, if any.
    pub fn evaluate(&self, last_accepted: Option<Instant>, now: Instant) -> DebounceDecision {
        match last_accepted {
            // A clock reading earlier than `last` saturates to zero elapsed.
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                DebounceDecision::Suppress
            }
            _ => DebounceDecision::Execute,
        }
    }
}

/// Compute `now + delay`, clamping deadlines the platform cannot represent.
pub(crate) fn deadline_after(now: Instant, delay: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_executes() {
        let window = DebounceWindow::new(Duration::from_secs(10));
        assert_eq!(window.interval(), Duration::from_secs(10));
        assert!(window.evaluate(None, Instant::now()).is_execute());
    }

    #[test]
    fn test_call_at_exact_interval_executes() {
        let window = DebounceWindow::new(Duration::from_secs(1));
        let start = Instant::now();

        assert!(window
            .evaluate(Some(start), start + Duration::from_millis(999))
            .is_suppress());
        assert!(window
            .evaluate(Some(start), start + Duration::from_secs(1))
            .is_execute());
    }

    #[test]
    fn test_zero_interval_never_suppresses() {
        let window = DebounceWindow::new(Duration::ZERO);
        let start = Instant::now();

        assert!(window.evaluate(Some(start), start).is_execute());
    }

    #[test]
    fn test_clock_behind_last_call_suppresses() {
        let window = DebounceWindow::new(Duration::from_secs(1));
        let start = Instant::now();
        let later = start + Duration::from_secs(5);

        assert!(window.evaluate(Some(later), start).is_suppress());
    }

    #[test]
    fn test_deadline_after_clamps_overflow() {
        let now = Instant::now();

        assert_eq!(
            deadline_after(now, Duration::from_secs(3)),
            now + Duration::from_secs(3)
        );
        assert!(deadline_after(now, Duration::MAX) >= now);
    }
}
