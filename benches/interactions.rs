//! Benchmarks for the interaction store: accumulation, decayed reads, export.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use decayrank::config::StoreConfig;
use decayrank::interactions::{ExportSelection, InteractionStore, SparseOrder, SECONDS_PER_DAY};
use rand::prelude::*;
use std::hint::black_box;

fn decaying() -> StoreConfig {
    StoreConfig {
        decay_in_days: Some(7.0),
        ..StoreConfig::default()
    }
}

fn populated(n_records: usize, seed: u64) -> InteractionStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = InteractionStore::new(&decaying()).unwrap();
    for _ in 0..n_records {
        let user = rng.random_range(0..1_000u32);
        let item = rng.random_range(0..5_000u32);
        let t = rng.random_range(0.0..30.0 * SECONDS_PER_DAY);
        store.add_interaction(user, item, t, rng.random_range(-1.0..3.0), false);
    }
    store
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_add");
    let n = 10_000;
    group.throughput(Throughput::Elements(n as u64));

    let mut rng = StdRng::seed_from_u64(1);
    let updates: Vec<(u32, u32, f64, f32)> = (0..n)
        .map(|i| {
            (
                rng.random_range(0..1_000),
                rng.random_range(0..5_000),
                i as f64,
                rng.random_range(-1.0..3.0),
            )
        })
        .collect();

    for overwrite in [false, true] {
        group.bench_with_input(
            BenchmarkId::from_parameter(if overwrite { "overwrite" } else { "accumulate" }),
            &overwrite,
            |bench, &overwrite| {
                bench.iter(|| {
                    let mut store = InteractionStore::new(&decaying()).unwrap();
                    for &(u, i, t, v) in &updates {
                        store.add_interaction(u, i, t, v, overwrite);
                    }
                    black_box(store.len())
                });
            },
        );
    }

    group.finish();
}

fn bench_reads(c: &mut Criterion) {
    let store = populated(50_000, 2);
    let users = store.get_all_users();

    c.bench_function("store_recent_items", |bench| {
        bench.iter(|| {
            for &u in users.iter().take(100) {
                black_box(store.get_user_items(u, Some(10)));
            }
        });
    });

    c.bench_function("store_non_negative_items", |bench| {
        bench.iter(|| black_box(store.get_non_negative_items(users[0])));
    });
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_export");

    for n in [10_000, 100_000] {
        let store = populated(n, 3);
        group.throughput(Throughput::Elements(store.len() as u64));

        for order in [SparseOrder::RowMajor, SparseOrder::ColumnMajor] {
            group.bench_with_input(
                BenchmarkId::new(format!("{order:?}"), n),
                &order,
                |bench, &order| {
                    bench.iter(|| black_box(store.export(&ExportSelection::all(), order)));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_add, bench_reads, bench_export);
criterion_main!(benches);
