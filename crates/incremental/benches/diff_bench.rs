//! Benchmarks for result set diffing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use docket_core::{Document, Value, ID_FIELD};
use docket_incremental::{diff_query_ordered_changes, diff_query_unordered_changes, ChangeLog};

fn make_docs(count: usize, version: i64) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let mut doc = Document::new();
            doc.insert(ID_FIELD, Value::from(format!("id{:06}", i)));
            doc.insert("n", Value::from(i as i64));
            doc.insert("v", Value::from(version));
            doc
        })
        .collect()
}

/// Moves every tenth document to the front and bumps one field on every
/// seventh, so the diff exercises moves and changes together.
fn perturb(docs: &[Document]) -> Vec<Document> {
    let mut moved = Vec::new();
    let mut rest = Vec::new();
    for (i, doc) in docs.iter().enumerate() {
        let mut doc = doc.clone();
        if i % 7 == 0 {
            doc.insert("v", Value::from(1));
        }
        if i % 10 == 0 {
            moved.push(doc);
        } else {
            rest.push(doc);
        }
    }
    moved.extend(rest);
    moved
}

fn bench_ordered_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_ordered");

    for size in [100, 1000, 10000].iter() {
        let old = make_docs(*size, 0);
        let new = perturb(&old);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let log = ChangeLog::new(true);
                diff_query_ordered_changes(black_box(&old), black_box(&new), &log);
                log.len()
            })
        });
    }
    group.finish();
}

fn bench_unordered_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_unordered");

    for size in [100, 1000, 10000].iter() {
        let old = make_docs(*size, 0);
        let new = perturb(&old);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let log = ChangeLog::new(false);
                diff_query_unordered_changes(black_box(&old), black_box(&new), &log);
                log.len()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ordered_diff, bench_unordered_diff);
criterion_main!(benches);
