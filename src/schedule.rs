//! Coalescing scheduler (debounce)
//!
//! A [`Debouncer`] holds the latest pending value and a deadline. Each new
//! value replaces the pending one and pushes the deadline out; once the
//! deadline passes, polling hands out the latest value exactly once.
//! Intermediate values are dropped, so the last value before the deadline
//! wins.
//!
//! Time is passed in explicitly. The owner decides when to poll (a UI frame,
//! a timer, a test), so no event loop is assumed.

use std::time::{Duration, Instant};

/// Delay before a selection change triggers a rebuild
pub const DEFAULT_SELECTION_DEBOUNCE: Duration = Duration::from_millis(500);

/// Delay before rebuilt chart data is published
pub const DEFAULT_PUBLISH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Last-value-wins debouncer.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use trueno_metrics::schedule::Debouncer;
///
/// let start = Instant::now();
/// let mut debouncer = Debouncer::new(Duration::from_millis(500));
///
/// debouncer.schedule("a", start);
/// debouncer.schedule("b", start + Duration::from_millis(100));
///
/// assert_eq!(debouncer.poll(start + Duration::from_millis(550)), None);
/// assert_eq!(debouncer.poll(start + Duration::from_millis(600)), Some("b"));
/// assert_eq!(debouncer.poll(start + Duration::from_millis(700)), None);
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Quiet period.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the quiet period at `now`.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((_, deadline)) if now >= deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Take the pending value immediately, ignoring the deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Check if a value is waiting.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }
}
