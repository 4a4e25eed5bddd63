use core::fmt;

use crate::{
    generator::{IdGenStatus, Result},
    id::SnowflakeId,
    time::TimeSource,
};

/// A minimal interface for generating Snowflake IDs.
pub trait SnowflakeGenerator<ID, T>
where
    ID: SnowflakeId,
    T: TimeSource<ID::Ty>,
{
    /// The error type returned by the generation methods.
    type Err: fmt::Debug;

    /// Creates a new generator for `node_id`.
    fn new(node_id: ID::Ty, time: T) -> Self;

    /// Generates the next ID, busy-waiting for the next millisecond if the
    /// current one has run out of sequence numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock moved backwards or the implementation
    /// uses a lock and it is poisoned.
    fn try_next_id(&self) -> Result<ID, Self::Err>;

    /// Attempts to generate the next ID without waiting.
    ///
    /// The returned [`IdGenStatus`] contains either:
    /// - the newly generated ID, or
    /// - a duration to yield/sleep if the sequence is exhausted.
    ///
    /// # Errors
    ///
    /// Same as [`SnowflakeGenerator::try_next_id`].
    fn try_poll_id(&self) -> Result<IdGenStatus<ID>, Self::Err>;
}
