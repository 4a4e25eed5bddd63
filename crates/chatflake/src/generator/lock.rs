use core::cmp::Ordering;
use std::sync::Arc;

#[cfg(feature = "parking-lot")]
use parking_lot::{Mutex, MutexGuard};
use rand::distr::uniform::SampleUniform;
#[cfg(not(feature = "parking-lot"))]
use std::sync::{Mutex, MutexGuard};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    generator::{Error, IdGenStatus, Result, SnowflakeGenerator, random_node_id},
    id::SnowflakeId,
    time::TimeSource,
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The last issued ID is kept behind a single [`Mutex`]. Reading the clock,
/// comparing it with the last timestamp, bumping the sequence and storing the
/// new ID all happen while the lock is held, so concurrent callers never
/// observe overlapping `(timestamp, sequence)` pairs and a slow reader can
/// never be mistaken for a clock regression.
///
/// Cloning the generator is cheap and shares the same state; construct one per
/// process and hand clones to whoever needs IDs.
///
/// ## Recommended When
/// - You need strictly increasing IDs from a single node
/// - Callers live on many threads or tasks
///
/// ## See Also
/// - [`SnowflakeGeneratorAsyncExt`] for awaiting instead of spinning
///
/// [`SnowflakeGeneratorAsyncExt`]: crate::futures::SnowflakeGeneratorAsyncExt
pub struct LockSnowflakeGenerator<ID, T>
where
    ID: SnowflakeId,
    T: TimeSource<ID::Ty>,
{
    #[cfg(feature = "cache-padded")]
    pub(crate) state: Arc<crossbeam_utils::CachePadded<Mutex<Option<ID>>>>,
    #[cfg(not(feature = "cache-padded"))]
    pub(crate) state: Arc<Mutex<Option<ID>>>,
    pub(crate) node_id: ID::Ty,
    pub(crate) time: T,
}

impl<ID, T> Clone for LockSnowflakeGenerator<ID, T>
where
    ID: SnowflakeId,
    T: TimeSource<ID::Ty> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            node_id: self.node_id,
            time: self.time.clone(),
        }
    }
}

impl<ID, T> LockSnowflakeGenerator<ID, T>
where
    ID: SnowflakeId,
    T: TimeSource<ID::Ty>,
{
    /// Creates a new [`LockSnowflakeGenerator`] for the given node.
    ///
    /// # Parameters
    ///
    /// - `node_id`: identifier for this generator instance, encoded into every
    ///   ID. Values wider than the node field are masked.
    /// - `time`: a [`TimeSource`] (e.g., [`SystemClock`]) consulted on every
    ///   call.
    ///
    /// # Example
    /// ```
    /// use chatflake::{ChatId, LockSnowflakeGenerator, SystemClock};
    ///
    /// let generator = LockSnowflakeGenerator::<ChatId, _>::new(7, SystemClock::default());
    /// let a = generator.try_next_id().unwrap();
    /// let b = generator.try_next_id().unwrap();
    /// assert!(a < b);
    /// assert_eq!(a.node_id(), 7);
    /// ```
    ///
    /// [`SystemClock`]: crate::time::SystemClock
    pub fn new(node_id: ID::Ty, time: T) -> Self {
        let node_id = ID::from_components(ID::ZERO, node_id, ID::ZERO).node_id();
        Self {
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(Mutex::new(None))),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(Mutex::new(None)),
            node_id,
            time,
        }
    }

    /// Creates a generator whose node ID is drawn at random.
    pub fn with_random_node(time: T) -> Self
    where
        ID::Ty: SampleUniform,
    {
        let node_id = random_node_id::<ID>();
        #[cfg(feature = "tracing")]
        tracing::debug!(%node_id, "drew random generator node id");
        Self::new(node_id, time)
    }

    /// Returns the node ID encoded into every issued ID.
    pub fn node_id(&self) -> ID::Ty {
        self.node_id
    }

    /// Generates the next ID.
    ///
    /// When the current millisecond has run out of sequence numbers this
    /// busy-polls the time source until it advances, holding the lock so that
    /// issuance order is preserved. The wait is bounded by the wall clock and
    /// is at most about one millisecond.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegression`] if the clock reads earlier than the last
    ///   issued timestamp, including while waiting for the next millisecond.
    /// - [`Error::TimestampOverflow`] if the clock is past the layout's range.
    /// - [`Error::LockPoisoned`] (std mutex only) if another caller panicked
    ///   while holding the lock.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_next_id(&self) -> Result<ID> {
        let mut state = self.lock()?;
        let now = self.checked_now()?;

        let id = match *state {
            None => ID::from_components(now, self.node_id, ID::ZERO),
            Some(last) => {
                let last_ts = last.timestamp();
                match now.cmp(&last_ts) {
                    Ordering::Greater => last.rollover_to_timestamp(now),
                    Ordering::Equal if last.has_sequence_room() => last.increment_sequence(),
                    Ordering::Equal => {
                        let next = self.wait_next_millis(last_ts)?;
                        last.rollover_to_timestamp(next)
                    }
                    Ordering::Less => return Err(Self::cold_clock_behind(now, last_ts)),
                }
            }
        };

        *state = Some(id);
        Ok(id)
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// Returns [`IdGenStatus::Pending`] with a one millisecond back-off when
    /// the sequence is exhausted, leaving the caller free to sleep or yield.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_next_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdGenStatus<ID>> {
        let mut state = self.lock()?;
        let now = self.checked_now()?;

        let id = match *state {
            None => ID::from_components(now, self.node_id, ID::ZERO),
            Some(last) => {
                let last_ts = last.timestamp();
                match now.cmp(&last_ts) {
                    Ordering::Greater => last.rollover_to_timestamp(now),
                    Ordering::Equal if last.has_sequence_room() => last.increment_sequence(),
                    Ordering::Equal => return Ok(IdGenStatus::Pending { yield_for: ID::ONE }),
                    Ordering::Less => return Err(Self::cold_clock_behind(now, last_ts)),
                }
            }
        };

        *state = Some(id);
        Ok(IdGenStatus::Ready { id })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<ID>>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }

    fn checked_now(&self) -> Result<ID::Ty> {
        let now = self.time.current_millis();
        if now > ID::max_timestamp() {
            return Err(Error::TimestampOverflow {
                now: now.into(),
                max: ID::max_timestamp().into(),
            });
        }
        Ok(now)
    }

    /// Spins until the clock moves past `last_ts`.
    fn wait_next_millis(&self, last_ts: ID::Ty) -> Result<ID::Ty> {
        loop {
            let now = self.checked_now()?;
            match now.cmp(&last_ts) {
                Ordering::Greater => return Ok(now),
                Ordering::Equal => core::hint::spin_loop(),
                Ordering::Less => return Err(Self::cold_clock_behind(now, last_ts)),
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: ID::Ty, last_ts: ID::Ty) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(%now, last = %last_ts, "clock moved backwards, refusing to issue id");
        Error::ClockRegression {
            last: last_ts.into(),
            now: now.into(),
        }
    }
}

impl<ID, T> SnowflakeGenerator<ID, T> for LockSnowflakeGenerator<ID, T>
where
    ID: SnowflakeId,
    T: TimeSource<ID::Ty>,
{
    type Err = Error;

    fn new(node_id: ID::Ty, time: T) -> Self {
        Self::new(node_id, time)
    }

    fn try_next_id(&self) -> Result<ID, Self::Err> {
        self.try_next_id()
    }

    fn try_poll_id(&self) -> Result<IdGenStatus<ID>, Self::Err> {
        self.try_poll_id()
    }
}
