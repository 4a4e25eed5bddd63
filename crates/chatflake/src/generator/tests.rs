use crate::{
    ChatId, Error, Id, IdGenStatus, LockSnowflakeGenerator, ManualClock, SnowflakeGenerator,
    SnowflakeId, SystemClock, TimeSource,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread::scope;
use std::time::Duration;

#[derive(Clone)]
struct FixedTime;
impl TimeSource<u64> for FixedTime {
    fn current_millis(&self) -> u64 {
        42
    }
}

trait IdGenStatusExt<T>
where
    T: Id,
{
    fn unwrap_ready(self) -> T;
    fn unwrap_pending(self) -> T::Ty;
}

impl<T> IdGenStatusExt<T> for IdGenStatus<T>
where
    T: Id,
{
    fn unwrap_ready(self) -> T {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for})")
            }
        }
    }

    fn unwrap_pending(self) -> T::Ty {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

fn run_id_sequence_increments_within_same_tick<G, ID, T>(generator: &G)
where
    G: SnowflakeGenerator<ID, T>,
    ID: SnowflakeId,
    T: TimeSource<ID::Ty>,
{
    let id1 = generator.try_next_id().unwrap();
    let id2 = generator.try_next_id().unwrap();
    let id3 = generator.try_next_id().unwrap();

    let fields = |id: ID| -> (u64, u64) { (id.timestamp().into(), id.sequence().into()) };
    assert_eq!(fields(id1), (42, 0));
    assert_eq!(fields(id2), (42, 1));
    assert_eq!(fields(id3), (42, 2));
    assert!(id1 < id2 && id2 < id3);
}

fn run_generator_monotonic<G, ID, T>(generator: &G)
where
    G: SnowflakeGenerator<ID, T>,
    ID: SnowflakeId,
    T: TimeSource<ID::Ty>,
{
    const TOTAL_IDS: usize = 4096 * 64;

    let mut last: Option<ID> = None;
    for _ in 0..TOTAL_IDS {
        let id = generator.try_next_id().unwrap();
        if let Some(prev) = last {
            assert!(id > prev, "{id:?} is not after {prev:?}");
            if id.timestamp() == prev.timestamp() {
                assert_eq!(id.sequence(), prev.sequence() + ID::ONE);
            } else {
                assert_eq!(id.sequence(), ID::ZERO);
            }
        }
        last = Some(id);
    }
}

fn run_generator_unique_threaded<G, ID, T>(generator: G, threads: usize, total_ids: usize)
where
    G: SnowflakeGenerator<ID, T> + Send + Sync,
    ID: SnowflakeId + Send,
    T: TimeSource<ID::Ty>,
{
    let ids_per_thread = total_ids / threads;
    let generator = Arc::new(generator);
    let seen_ids = Arc::new(Mutex::new(HashSet::with_capacity(total_ids)));

    scope(|s| {
        for _ in 0..threads {
            let generator = Arc::clone(&generator);
            let seen_ids = Arc::clone(&seen_ids);

            s.spawn(move || {
                let mut local = Vec::with_capacity(ids_per_thread);
                for _ in 0..ids_per_thread {
                    local.push(generator.try_next_id().unwrap());
                }
                // Each caller must itself observe increasing IDs.
                assert!(local.windows(2).all(|w| w[0] < w[1]));

                let mut seen = seen_ids.lock().unwrap();
                for id in local {
                    assert!(seen.insert(id), "duplicate id {id:?}");
                }
            });
        }
    });

    assert_eq!(seen_ids.lock().unwrap().len(), ids_per_thread * threads);
}

#[test]
fn lock_generator_sequence_test() {
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(0, FixedTime);
    run_id_sequence_increments_within_same_tick(&generator);
}

#[test]
fn lock_generator_first_id_starts_at_sequence_zero() {
    let clock = ManualClock::new(0);
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(3, clock.clone());

    let id = generator.try_next_id().unwrap();
    assert_eq!(id.timestamp(), 0);
    assert_eq!(id.sequence(), 0);
    assert_eq!(id.node_id(), 3);
}

#[test]
fn lock_generator_resets_sequence_when_clock_advances() {
    let clock = ManualClock::new(100);
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(1, clock.clone());

    for expected in 0..5 {
        assert_eq!(generator.try_next_id().unwrap().sequence(), expected);
    }

    clock.advance(3);
    let id = generator.try_next_id().unwrap();
    assert_eq!(id.timestamp(), 103);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn lock_generator_poll_pending_when_sequence_exhausted() {
    let clock = ManualClock::new(42);
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(1, clock.clone());

    for i in 0..=ChatId::max_sequence() {
        let id = generator.try_poll_id().unwrap().unwrap_ready();
        assert_eq!(id.sequence(), i);
        assert_eq!(id.timestamp(), 42);
    }

    let yield_for = generator.try_poll_id().unwrap().unwrap_pending();
    assert_eq!(yield_for, 1);

    clock.advance(1);
    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn lock_generator_waits_for_next_millisecond_after_wrap() {
    let clock = ManualClock::new(42);
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(1, clock.clone());

    let mut last = None;
    for _ in 0..=ChatId::max_sequence() {
        last = Some(generator.try_next_id().unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.sequence(), ChatId::max_sequence());

    scope(|s| {
        let waiter = s.spawn(|| generator.try_next_id());

        // The waiter spins on the frozen clock until we move it.
        std::thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());
        clock.advance(1);

        let id = waiter.join().unwrap().unwrap();
        assert_eq!(id.timestamp(), 43);
        assert_eq!(id.sequence(), 0);
        assert!(id > last);
    });
}

#[test]
fn lock_generator_rejects_clock_regression() {
    let clock = ManualClock::new(500);
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(9, clock.clone());

    let before = generator.try_next_id().unwrap();

    clock.set(499);
    assert_eq!(
        generator.try_next_id(),
        Err(Error::ClockRegression { last: 500, now: 499 })
    );
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::ClockRegression { last: 500, now: 499 })
    );

    // A failed call leaves the state untouched.
    clock.set(500);
    let after = generator.try_next_id().unwrap();
    assert_eq!(after.timestamp(), 500);
    assert_eq!(after.sequence(), before.sequence() + 1);
}

#[test]
fn lock_generator_reports_regression_while_waiting() {
    let clock = ManualClock::new(42);
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(1, clock.clone());

    for _ in 0..=ChatId::max_sequence() {
        generator.try_next_id().unwrap();
    }

    scope(|s| {
        let waiter = s.spawn(|| generator.try_next_id());
        std::thread::sleep(Duration::from_millis(20));
        clock.set(41);
        assert_eq!(
            waiter.join().unwrap(),
            Err(Error::ClockRegression { last: 42, now: 41 })
        );
    });
}

#[test]
fn lock_generator_rejects_timestamp_overflow() {
    let clock = ManualClock::new(ChatId::max_timestamp() + 1);
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(0, clock);

    assert_eq!(
        generator.try_next_id(),
        Err(Error::TimestampOverflow {
            now: ChatId::max_timestamp() + 1,
            max: ChatId::max_timestamp(),
        })
    );
}

#[test]
fn lock_generator_masks_node_id() {
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(1024 + 12, FixedTime);
    assert_eq!(generator.node_id(), 12);
    assert_eq!(generator.try_next_id().unwrap().node_id(), 12);
}

#[test]
fn lock_generator_random_node_in_range() {
    for _ in 0..64 {
        let generator = LockSnowflakeGenerator::<ChatId, _>::with_random_node(FixedTime);
        assert!(generator.node_id() <= ChatId::max_node_id());
    }
}

#[test]
fn lock_generator_clones_share_state() {
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(0, FixedTime);
    let other = generator.clone();

    let a = generator.try_next_id().unwrap();
    let b = other.try_next_id().unwrap();
    let c = generator.try_next_id().unwrap();
    assert_eq!([a.sequence(), b.sequence(), c.sequence()], [0, 1, 2]);
}

#[test]
fn lock_generator_monotonic_with_system_clock() {
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(1, SystemClock::default());
    run_generator_monotonic(&generator);
}

#[test]
fn lock_generator_unique_under_fifty_callers() {
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(1, SystemClock::default());
    run_generator_unique_threaded(generator, 50, 10_000);
}

#[test]
fn lock_generator_unique_across_cpus() {
    let generator = LockSnowflakeGenerator::<ChatId, _>::new(2, SystemClock::default());
    let threads = num_cpus::get().max(2);
    run_generator_unique_threaded(generator, threads, 4096 * 64);
}
