use chatflake::{
    ChatId, IdGenStatus, LockSnowflakeGenerator, SnowflakeGenerator, SnowflakeId, StreamSplitter,
    SystemClock, TimeSource,
};
use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource<u64> for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// Number of IDs generated per benchmark iteration (per-thread for
// multi-threaded). One full millisecond worth of sequence numbers.
const TOTAL_IDS: usize = 4096;

/// Benchmarks a hot-path generator where IDs are always `Ready`.
fn bench_generator<ID, G, T>(c: &mut Criterion, group_name: &str, generator_factory: impl Fn() -> G)
where
    ID: SnowflakeId,
    G: SnowflakeGenerator<ID, T>,
    T: TimeSource<ID::Ty>,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    match generator.try_poll_id() {
                        Ok(IdGenStatus::Ready { id }) => {
                            black_box(id);
                        }
                        _ => unreachable!(),
                    }
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks the blocking path against the wall clock, which waits for the
/// next millisecond whenever a tick's sequence runs out.
fn bench_generator_blocking<ID, G, T>(
    c: &mut Criterion,
    group_name: &str,
    generator_factory: impl Fn() -> G,
) where
    ID: SnowflakeId,
    G: SnowflakeGenerator<ID, T>,
    T: TimeSource<ID::Ty>,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.try_next_id().unwrap());
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks a shared generator across threads.
fn bench_generator_contended<ID, G, T>(
    c: &mut Criterion,
    group_name: &str,
    generator_fn: impl Fn() -> G,
) where
    ID: SnowflakeId,
    G: SnowflakeGenerator<ID, T> + Send + Sync,
    T: TimeSource<ID::Ty>,
{
    let mut group = c.benchmark_group(group_name);

    for thread_count in [1, 2, 4, 8, 16] {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(format!("elems/{TOTAL_IDS}/threads/{thread_count}"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();

                for _ in 0..iters {
                    let generator = Arc::new(generator_fn());
                    let barrier = Arc::new(Barrier::new(thread_count + 1));
                    scope(|s| {
                        for _ in 0..thread_count {
                            let generator = Arc::clone(&generator);
                            let barrier = Arc::clone(&barrier);
                            s.spawn(move || {
                                barrier.wait();
                                for _ in 0..ids_per_thread {
                                    black_box(generator.try_next_id().unwrap());
                                }
                            });
                        }
                        barrier.wait();
                    });
                }

                start.elapsed()
            });
        });
    }

    group.finish();
}

/// Benchmarks the splitter on a response cut into fixed-width chunks.
fn bench_splitter(c: &mut Criterion) {
    let mut text = String::from("A reasonably short conversation title§");
    while text.len() < 64 * 1024 {
        text.push_str("The answer keeps streaming in small pieces, one token at a time. ");
    }
    let chars: Vec<char> = text.chars().collect();

    let mut group = c.benchmark_group("splitter");
    group.throughput(Throughput::Bytes(text.len() as u64));

    for width in [1, 4, 16, 256] {
        let chunks: Vec<String> = chars.chunks(width).map(|c| c.iter().collect()).collect();
        group.bench_function(format!("chunk_chars/{width}"), |b| {
            b.iter(|| {
                let mut splitter = StreamSplitter::default();
                for chunk in &chunks {
                    black_box(splitter.feed(chunk).unwrap());
                }
                splitter.finish().unwrap();
            });
        });
    }

    let bytes = text.as_bytes();
    group.bench_function("feed_bytes/3", |b| {
        b.iter(|| {
            let mut splitter = StreamSplitter::default();
            for chunk in bytes.chunks(3) {
                black_box(splitter.feed_bytes(chunk).unwrap());
            }
            splitter.finish().unwrap();
        });
    });

    group.finish();
}

fn benchmark_mock_sequential_lock(c: &mut Criterion) {
    bench_generator::<ChatId, _, _>(c, "mock/sequential/lock", || {
        LockSnowflakeGenerator::new(0, FixedMockTime { millis: 1 })
    });
}

fn benchmark_system_sequential_lock(c: &mut Criterion) {
    bench_generator_blocking::<ChatId, _, _>(c, "system/sequential/lock", || {
        LockSnowflakeGenerator::new(0, SystemClock::default())
    });
}

fn benchmark_mock_contended_lock(c: &mut Criterion) {
    bench_generator_contended::<ChatId, _, _>(c, "mock/contended/lock", || {
        LockSnowflakeGenerator::new(0, FixedMockTime { millis: 1 })
    });
}

fn benchmark_system_contended_lock(c: &mut Criterion) {
    bench_generator_contended::<ChatId, _, _>(c, "system/contended/lock", || {
        LockSnowflakeGenerator::new(0, SystemClock::default())
    });
}

criterion_group!(
    benches,
    benchmark_mock_sequential_lock,
    benchmark_mock_contended_lock,
    benchmark_system_sequential_lock,
    benchmark_system_contended_lock,
    bench_splitter,
);
criterion_main!(benches);
