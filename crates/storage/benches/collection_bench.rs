//! Benchmarks for collection writes and live query maintenance.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use docket_core::{doc, value};
use docket_incremental::ObserveCallbacks;
use docket_storage::{Collection, FindOptions, LocalObserveHandle, UpdateOptions};

/// Deterministic pseudo-random sequence (64-bit LCG).
fn lcg(seed: &mut u64) -> u64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    *seed >> 33
}

fn populate(size: usize) -> Collection {
    let c = Collection::new("bench");
    let mut seed = 42;
    for i in 0..size {
        let n = (lcg(&mut seed) % 1000) as i64;
        c.insert(doc!({"_id": (format!("id{:06}", i)), "n": n, "tag": (if i % 3 == 0 { "a" } else { "b" })}))
            .unwrap();
    }
    c
}

fn observe_sorted(c: &Collection, options: FindOptions) -> LocalObserveHandle {
    c.find(&value!({"tag": "a"}), options.sort(value!({"n": 1})))
        .unwrap()
        .observe(ObserveCallbacks::new().on_added_at(|_, _, _| {}))
        .unwrap()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_insert");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(populate(size)).len())
        });
    }
    group.finish();
}

fn bench_find_sorted(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_find_sorted");

    for size in [100, 1000, 10000].iter() {
        let coll = populate(*size);
        let cursor = coll
            .find(&value!({"n": {"$lt": 500}}), FindOptions::new().sort(value!({"n": -1})).limit(20))
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(cursor.fetch()).len())
        });
    }
    group.finish();
}

fn bench_update_with_observer(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_update_observed");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || {
                    let coll = populate(size);
                    let handle = observe_sorted(&coll, FindOptions::new());
                    (coll, handle)
                },
                |(coll, handle)| {
                    let mut seed = 7;
                    for _ in 0..100 {
                        let id = format!("id{:06}", lcg(&mut seed) as usize % size);
                        coll.update(&value!(id), &value!({"$inc": {"n": 1}}), UpdateOptions::new())
                            .unwrap();
                    }
                    handle.stop();
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_update_with_limited_observer(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_update_observed_limit");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || {
                    let coll = populate(size);
                    let handle = observe_sorted(&coll, FindOptions::new().limit(10));
                    (coll, handle)
                },
                |(coll, handle)| {
                    let mut seed = 7;
                    for _ in 0..100 {
                        let id = format!("id{:06}", lcg(&mut seed) as usize % size);
                        coll.update(&value!(id), &value!({"$inc": {"n": -5}}), UpdateOptions::new())
                            .unwrap();
                    }
                    handle.stop();
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_find_sorted,
    bench_update_with_observer,
    bench_update_with_limited_observer
);
criterion_main!(benches);
