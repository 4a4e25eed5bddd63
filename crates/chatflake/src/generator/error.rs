/// A result type defaulting to the generator [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants the generator can emit.
///
/// Every variant is fatal to the call that produced it and to nothing else:
/// the generator state is left untouched, so the caller may retry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The time source reported a timestamp earlier than the last one used to
    /// issue an ID.
    ///
    /// This signals a backward wall-clock step. The generator refuses to
    /// reuse or fabricate a timestamp, since doing so risks duplicate IDs.
    #[error("clock moved backwards: last issued timestamp {last}, observed {now}")]
    ClockRegression { last: u64, now: u64 },

    /// The time source reported a timestamp that does not fit in the ID's
    /// timestamp field.
    #[error("timestamp {now} exceeds the encodable maximum {max}")]
    TimestampOverflow { now: u64, max: u64 },

    /// The operation failed because the lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use std::sync::{MutexGuard, PoisonError};

#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
