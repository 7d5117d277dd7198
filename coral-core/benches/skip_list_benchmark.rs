//! Benchmark comparing the optimistic skip list with crossbeam-skiplist.
//!
//! Run with: cargo bench --package coral-core --bench skip_list_benchmark

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use crossbeam_skiplist::SkipSet;
use mimalloc::MiMalloc;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::thread;

use coral_core::SkipList;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const OPS_PER_THREAD: usize = 10_000;
const LOOKUP_KEYS: usize = 100_000;

fn new_list() -> Arc<SkipList<i64>> {
    SkipList::builder().build().unwrap()
}

// ============================================================================
// Insert-only benchmarks
// ============================================================================

fn bench_coral_insert(thread_count: usize, ops_per_thread: usize) {
    let list = new_list();
    let mut handles = vec![];

    for t in 0..thread_count {
        let accessor = list.accessor();
        let handle = thread::spawn(move || {
            let base = (t * ops_per_thread) as i64;
            for i in 0..ops_per_thread {
                accessor.add(base + i as i64);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_crossbeam_insert(thread_count: usize, ops_per_thread: usize) {
    let set: Arc<SkipSet<i64>> = Arc::new(SkipSet::new());
    let mut handles = vec![];

    for t in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            let base = (t * ops_per_thread) as i64;
            for i in 0..ops_per_thread {
                set_clone.insert(base + i as i64);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Mixed insert/remove benchmarks (50% insert, 50% remove)
// ============================================================================

fn bench_coral_mixed(thread_count: usize, ops_per_thread: usize) {
    let list = new_list();
    {
        let accessor = list.accessor();
        for i in 0..(thread_count * ops_per_thread / 2) {
            accessor.add(i as i64);
        }
    }

    let mut handles = vec![];

    for t in 0..thread_count {
        let accessor = list.accessor();
        let handle = thread::spawn(move || {
            let base = (t * ops_per_thread) as i64;
            for i in 0..ops_per_thread {
                if i % 2 == 0 {
                    accessor.add(base + i as i64);
                } else {
                    accessor.remove(&(base + i as i64 - 1));
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_crossbeam_mixed(thread_count: usize, ops_per_thread: usize) {
    let set: Arc<SkipSet<i64>> = Arc::new(SkipSet::new());
    for i in 0..(thread_count * ops_per_thread / 2) {
        set.insert(i as i64);
    }

    let mut handles = vec![];

    for t in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            let base = (t * ops_per_thread) as i64;
            for i in 0..ops_per_thread {
                if i % 2 == 0 {
                    set_clone.insert(base + i as i64);
                } else {
                    set_clone.remove(&(base + i as i64 - 1));
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Lookup benchmarks (random probes into a populated list)
// ============================================================================

fn shuffled_keys() -> Arc<Vec<i64>> {
    let mut keys: Vec<i64> = (0..LOOKUP_KEYS as i64).collect();
    keys.shuffle(&mut rand::rng());
    Arc::new(keys)
}

fn bench_coral_lookup(list: &Arc<SkipList<i64>>, keys: &Arc<Vec<i64>>, thread_count: usize) {
    let mut handles = vec![];

    for t in 0..thread_count {
        let accessor = list.accessor();
        let keys = Arc::clone(keys);
        let handle = thread::spawn(move || {
            let mut hits = 0;
            for key in keys.iter().skip(t).step_by(thread_count) {
                if accessor.contains(key) {
                    hits += 1;
                }
            }
            black_box(hits)
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_crossbeam_lookup(set: &Arc<SkipSet<i64>>, keys: &Arc<Vec<i64>>, thread_count: usize) {
    let mut handles = vec![];

    for t in 0..thread_count {
        let set = Arc::clone(set);
        let keys = Arc::clone(keys);
        let handle = thread::spawn(move || {
            let mut hits = 0;
            for key in keys.iter().skip(t).step_by(thread_count) {
                if set.contains(key) {
                    hits += 1;
                }
            }
            black_box(hits)
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Criterion benchmark groups
// ============================================================================

fn insert_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_benchmark_skip_list");

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("insert_benchmark_coral", threads),
            &threads,
            |b, &threads| b.iter(|| bench_coral_insert(black_box(threads), black_box(OPS_PER_THREAD))),
        );

        group.bench_with_input(
            BenchmarkId::new("insert_benchmark_crossbeam", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_crossbeam_insert(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );
    }

    group.finish();
}

fn mixed_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_benchmark_skip_list");

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("mixed_benchmark_coral", threads),
            &threads,
            |b, &threads| b.iter(|| bench_coral_mixed(black_box(threads), black_box(OPS_PER_THREAD))),
        );

        group.bench_with_input(
            BenchmarkId::new("mixed_benchmark_crossbeam", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_crossbeam_mixed(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );
    }

    group.finish();
}

fn lookup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_benchmark_skip_list");
    let keys = shuffled_keys();

    let list = new_list();
    let set: Arc<SkipSet<i64>> = Arc::new(SkipSet::new());
    {
        let accessor = list.accessor();
        for key in 0..LOOKUP_KEYS as i64 {
            accessor.add(key * 2);
            set.insert(key * 2);
        }
    }

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("lookup_benchmark_coral", threads),
            &threads,
            |b, &threads| b.iter(|| bench_coral_lookup(&list, &keys, black_box(threads))),
        );

        group.bench_with_input(
            BenchmarkId::new("lookup_benchmark_crossbeam", threads),
            &threads,
            |b, &threads| b.iter(|| bench_crossbeam_lookup(&set, &keys, black_box(threads))),
        );
    }

    group.finish();
}

criterion_group!(benches, insert_benchmark, mixed_benchmark, lookup_benchmark);
criterion_main!(benches);
