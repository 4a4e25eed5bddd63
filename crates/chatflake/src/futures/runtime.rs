use core::{future::Future, pin::Pin, time::Duration};

use crate::{
    futures::{SleepProvider, SnowflakeGeneratorAsyncExt},
    generator::{Result, SnowflakeGenerator},
    id::SnowflakeId,
    time::TimeSource,
};

/// A [`SleepProvider`] backed by Tokio's timer.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    type Sleep = tokio::time::Sleep;

    fn sleep_for(dur: Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}

/// A [`SleepProvider`] that yields to the Tokio scheduler instead of
/// sleeping.
///
/// Reacts faster when the clock ticks over, at the cost of re-polling the
/// generator more often while the sequence is exhausted.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    /// `yield_now()` returns a private future type, so it has to be boxed.
    type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn sleep_for(_dur: Duration) -> Self::Sleep {
        Box::pin(tokio::task::yield_now())
    }
}

/// Convenience over [`SnowflakeGeneratorAsyncExt`] that always backs off with
/// [`TokioSleep`].
pub trait SnowflakeGeneratorAsyncTokioExt<ID, T>
where
    ID: SnowflakeId,
    T: TimeSource<ID::Ty>,
{
    type Err;

    /// Resolves to the next ID, sleeping on Tokio's timer whenever the
    /// current millisecond is exhausted.
    ///
    /// # Errors
    ///
    /// Whatever the underlying generator returns.
    fn next_id_async(&self) -> impl Future<Output = Result<ID, Self::Err>>;
}

impl<G, ID, T> SnowflakeGeneratorAsyncTokioExt<ID, T> for G
where
    G: SnowflakeGenerator<ID, T> + Sync,
    ID: SnowflakeId + Send,
    T: TimeSource<ID::Ty> + Send,
{
    type Err = G::Err;

    fn next_id_async(&self) -> impl Future<Output = Result<ID, Self::Err>> {
        <Self as SnowflakeGeneratorAsyncExt<ID, T>>::try_next_id_async::<TokioSleep>(self)
    }
}
