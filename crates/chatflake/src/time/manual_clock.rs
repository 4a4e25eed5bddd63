use crate::time::TimeSource;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A shared, manually driven time source.
///
/// Clones observe the same reading, so a test can hand one clone to a
/// generator and keep another to move time forward or backward while other
/// threads are blocked on the generator.
///
/// # Example
///
/// ```
/// use chatflake::{ManualClock, TimeSource};
///
/// let clock = ManualClock::new(42);
/// let handle = clock.clone();
/// handle.advance(1);
/// assert_eq!(clock.current_millis(), 43);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock that reads `millis` until changed.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    /// Sets the reading. Moving it backwards simulates a wall-clock step.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Release);
    }

    /// Moves the reading forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::AcqRel);
    }
}

impl TimeSource<u64> for ManualClock {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }
}
