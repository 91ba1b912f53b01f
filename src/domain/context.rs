//! Context keys scoping independent debounce and throttle timelines.
//!
//! Every call is attributed to a context. Calls that share a context interfere
//! with each other, calls on different contexts never do. A caller that does not
//! supply a key lands on [`ContextKey::Default`], so all unkeyed calls share one
//! timeline.

use std::fmt::{self, Debug};
use std::hash::Hash;

/// Bounds required of a caller-supplied context value.
///
/// Blanket-implemented for every type that satisfies them, so `String`,
/// `&'static str`, integers and user enums all work out of the box.
pub trait ContextValue: Hash + Eq + Clone + Send + Sync + Debug + 'static {}

impl<T> ContextValue for T where T: Hash + Eq + Clone + Send + Sync + Debug + 'static {}

/// Identifies the timeline a call belongs to.
///
/// # Example
/// ```
/// use dispatch_throttle::ContextKey;
///
/// let keyed = ContextKey::from_option(Some("search"));
/// let unkeyed: ContextKey<&str> = ContextKey::from_option(None);
///
/// assert_eq!(keyed.as_key(), Some(&"search"));
/// assert!(unkeyed.is_default());
/// assert_ne!(keyed, unkeyed);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKey<K> {
    /// The shared timeline used by every call without an explicit key
    Default,
    /// A caller-supplied key
    Keyed(K),
}

impl<K> ContextKey<K> {
    /// Map an optional caller key onto a context.
    pub fn from_option(key: Option<K>) -> Self {
        match key {
            Some(key) => ContextKey::Keyed(key),
            None => ContextKey::Default,
        }
    }

    /// Check if this is the shared default timeline.
    pub fn is_default(&self) -> bool {
        matches!(self, ContextKey::Default)
    }

    /// Get the caller key, if any.
    pub fn as_key(&self) -> Option<&K> {
        match self {
            ContextKey::Default => None,
            ContextKey::Keyed(key) => Some(key),
        }
    }
}

impl<K> Default for ContextKey<K> {
    fn default() -> Self {
        ContextKey::Default
    }
}

impl<K: Debug> Debug for ContextKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKey::Default => f.write_str("<default>"),
            ContextKey::Keyed(key) => key.fmt(f),
        }
    }
}

/// A slot in the pending-task map.
///
/// Caller throttles and the internal expiry of debounce timestamps are both
/// scheduled through the throttle mechanism, but in separate namespaces: a
/// debounce on any key can never supersede a caller's throttle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerSlot<K> {
    /// Work scheduled by `throttle`
    Throttle(ContextKey<K>),
    /// Removal of a debounce timestamp once its interval has elapsed
    Expiry(ContextKey<K>),
}

impl<K> TimerSlot<K> {
    /// Get the context this slot belongs to.
    pub fn context(&self) -> &ContextKey<K> {
        match self {
            TimerSlot::Throttle(context) | TimerSlot::Expiry(context) => context,
        }
    }

    /// Check if this slot holds caller throttle work.
    pub fn is_throttle(&self) -> bool {
        matches!(self, TimerSlot::Throttle(_))
    }
}
