use crate::time::{CHAT_EPOCH, TimeSource};
use core::time::Duration;
use std::time::SystemTime;

/// A wall-clock time source reporting milliseconds since a custom epoch.
///
/// Every call reads [`SystemTime::now`], so an NTP step or a manual clock
/// change is visible to the generator. That is the point: the generator must
/// refuse to issue IDs while the clock sits behind the last issued timestamp
/// instead of fabricating one.
///
/// Readings taken before the epoch saturate to `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch: Duration,
}

impl Default for SystemClock {
    /// Constructs a clock aligned to [`CHAT_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(CHAT_EPOCH)
    }
}

impl SystemClock {
    /// Constructs a clock whose zero point is `epoch`, given as a [`Duration`]
    /// since 1970-01-01 UTC.
    pub const fn with_epoch(epoch: Duration) -> Self {
        Self { epoch }
    }

    /// Returns the epoch this clock counts from.
    pub const fn epoch(&self) -> Duration {
        self.epoch
    }
}

impl TimeSource<u64> for SystemClock {
    fn current_millis(&self) -> u64 {
        let since_unix = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        since_unix.saturating_sub(self.epoch).as_millis() as u64
    }
}
