use core::{future::Future, time::Duration};

/// Abstracts over how an async caller waits out a [`Duration`].
///
/// The async generator extension is generic over this so it can back off on
/// any runtime's timer instead of spinning.
pub trait SleepProvider {
    /// We require `Send` so that the future can be safely moved across threads
    type Sleep: Future<Output = ()> + Send;

    fn sleep_for(dur: Duration) -> Self::Sleep;
}
