//! End-to-end mining benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use patterncraft::core::params::MinerConfig;
use patterncraft::sync::Miner;
use patterncraft::topk::collector::PerItemTopKCollector;

fn synthetic_transactions(
    transaction_count: usize,
    item_count: u32,
    density: f64,
    seed: u64,
) -> Vec<(Vec<u32>, u32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..transaction_count)
        .map(|_| {
            let items: Vec<u32> = (0..item_count)
                .filter(|_| rng.gen_bool(density))
                .collect();
            (items, 1)
        })
        .collect()
}

fn bench_mining(c: &mut Criterion) {
    let mut group = c.benchmark_group("mine");
    for &threads in &[1usize, 4] {
        let transactions = synthetic_transactions(2_000, 40, 0.12, 42);
        group.bench_with_input(
            BenchmarkId::new("synthetic_2k", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let config = MinerConfig::new(20, 10).with_threads(threads);
                    let collector = PerItemTopKCollector::new(10, 0..40);
                    let miner = Miner::new(config).unwrap();
                    miner.mine(black_box(&transactions), &collector).unwrap();
                    black_box(collector.distinct_patterns().len())
                });
            },
        );
    }
    group.finish();
}

fn bench_topk_collection(c: &mut Criterion) {
    c.bench_function("collector_insert_10k", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        let patterns: Vec<(u32, Vec<u32>)> = (0..10_000)
            .map(|_| {
                let support = rng.gen_range(1..1_000);
                let len = rng.gen_range(1..6);
                let items: Vec<u32> = (0..len).map(|_| rng.gen_range(0..64)).collect();
                (support, items)
            })
            .collect();
        b.iter(|| {
            let collector = PerItemTopKCollector::new(10, 0..64);
            for (support, items) in &patterns {
                collector.collect(*support, items);
            }
            black_box(collector.lowest_bound())
        });
    });
}

criterion_group!(benches, bench_mining, bench_topk_collection);
criterion_main!(benches);
