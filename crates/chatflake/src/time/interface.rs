use core::time::Duration;

/// Chat epoch: Monday, January 1, 2024 00:00:00 UTC
///
/// Timestamps embedded in a [`ChatId`] count milliseconds from this instant.
///
/// [`ChatId`]: crate::id::ChatId
pub const CHAT_EPOCH: Duration = Duration::from_millis(1_704_067_200_000);

/// Unix epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const UNIX_EPOCH: Duration = Duration::ZERO;

/// A trait for time sources that return a millisecond timestamp.
///
/// This abstraction allows you to plug in the system wall clock or a simulated
/// clock in tests. The generator compares successive readings, so a source
/// that can move backwards (like the wall clock) surfaces as a
/// [`ClockRegression`] rather than being silently absorbed.
///
/// The unit is **milliseconds** relative to the origin configured on the
/// source (usually [`CHAT_EPOCH`]).
///
/// # Example
///
/// ```
/// use chatflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource<u64> for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
///
/// [`ClockRegression`]: crate::generator::Error::ClockRegression
pub trait TimeSource<T> {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> T;
}

impl<T, S> TimeSource<T> for &S
where
    S: TimeSource<T> + ?Sized,
{
    fn current_millis(&self) -> T {
        (**self).current_millis()
    }
}

impl<T, S> TimeSource<T> for std::sync::Arc<S>
where
    S: TimeSource<T> + ?Sized,
{
    fn current_millis(&self) -> T {
        (**self).current_millis()
    }
}
