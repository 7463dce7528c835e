//! benches/intersection.rs
//!
//! Benchmarks comparing the bitscan and scancount engines at a few corpus
//! sizes and thresholds.
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

use threshold_count::{Corpus, QueryExecutor};

/// Builds `list_count` sorted, deduplicated posting lists of `list_len`
/// elements each, drawn uniformly from `[0, universe)`.
fn generate_lists(list_count: usize, list_len: usize, universe: u32, seed: u64) -> Vec<Vec<u32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..list_count)
        .map(|_| {
            let set: BTreeSet<u32> = (0..list_len).map(|_| rng.gen_range(0..universe)).collect();
            set.into_iter().collect()
        })
        .collect()
}

/// Compares bitscan against scancount for an all-lists query at a fixed
/// threshold, across a few corpus sizes.
fn bench_engines(c: &mut Criterion) {
    let mut group = c.benchmark_group("threshold_count");

    for list_count in [8, 32, 100] {
        let lists = generate_lists(list_count, 5000, 200_000, 7);
        let corpus = Corpus::build(&lists).expect("benchmark corpus is well-formed");
        let ids: Vec<u32> = (0..list_count as u32).collect();
        let t = 3u8;

        group.throughput(Throughput::Elements(list_count as u64));

        group.bench_with_input(BenchmarkId::new("bitscan", list_count), &ids, |b, ids| {
            b.iter(|| black_box(corpus.bitscan(black_box(ids), black_box(t)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("scancount", list_count), &ids, |b, ids| {
            b.iter(|| black_box(corpus.scancount(black_box(ids), black_box(t)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmarks the scancount engine alone across a sweep of thresholds,
/// reusing a single [`QueryExecutor`] the way a long-lived query service
/// would.
fn bench_scancount_thresholds(c: &mut Criterion) {
    let mut group = c.benchmark_group("scancount_by_threshold");

    let lists = generate_lists(32, 5000, 200_000, 11);
    let corpus = threshold_count::build_scancount_aux(
        &lists,
        scancount_aux::DEFAULT_WINDOW,
        scancount_aux::DEFAULT_UNROLL,
        scancount_aux::DEFAULT_OFFSET,
    )
    .expect("benchmark corpus is well-formed");
    let ids: Vec<u32> = (0..32u32).collect();
    let mut executor = QueryExecutor::new();

    for t in [1u8, 4, 8, 12] {
        group.bench_with_input(BenchmarkId::new("threshold", t), &t, |b, &t| {
            b.iter(|| {
                black_box(threshold_count::scancount(&mut executor, &corpus, black_box(&ids), black_box(t)).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_engines, bench_scancount_thresholds);
criterion_main!(benches);
