use crate::id::Id;

/// Represents the result of polling a generator for a new ID.
///
/// This type models the outcome of [`SnowflakeGenerator::try_poll_id`]:
///
/// - [`IdGenStatus::Ready`] indicates a new ID was successfully generated.
/// - [`IdGenStatus::Pending`] means the sequence for the current millisecond
///   is exhausted and the caller should back off before polling again.
///
/// This allows non-blocking generation loops (see the async extension) where
/// [`SnowflakeGenerator::try_next_id`] would spin.
///
/// [`SnowflakeGenerator::try_poll_id`]: crate::generator::SnowflakeGenerator::try_poll_id
/// [`SnowflakeGenerator::try_next_id`]: crate::generator::SnowflakeGenerator::try_next_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus<T: Id> {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: T,
    },
    /// No ID could be generated because the sequence has been exhausted for
    /// the current millisecond.
    Pending {
        /// Milliseconds to wait before polling again.
        yield_for: T::Ty,
    },
}
