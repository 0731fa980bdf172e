use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::hint::black_box;

use rankine::{quantile, ThreadComm};

fn xrng() -> impl Rng {
    <Xoshiro256PlusPlus as SeedableRng>::seed_from_u64(0x5EED)
}

/// Single-rank quantile across input sizes (gather path end to end).
fn bench_quantile_single_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantile/single_rank");

    for &size in &[10_000, 100_000, 1_000_000] {
        let mut rng = xrng();
        let data: Vec<f64> = (0..size).map(|_| rng.gen_range(-1e9..1e9)).collect();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("median", size), &data, |b, data| {
            b.iter(|| {
                let results = ThreadComm::run(1, |comm| {
                    quantile(&comm, black_box(data), data.len() as i64, 0.5).unwrap()
                });
                black_box(results)
            })
        });
    }
    group.finish();
}

/// Four simulated ranks over one shared machine; measures the collective
/// overhead of the thread transport more than the selection itself.
fn bench_quantile_four_ranks(c: &mut Criterion) {
    let mut rng = xrng();
    let per_rank: Vec<Vec<f64>> = (0..4)
        .map(|_| (0..250_000).map(|_| rng.gen_range(-1e9..1e9)).collect())
        .collect();

    c.bench_function("quantile/four_ranks_1m", |b| {
        b.iter(|| {
            let results = ThreadComm::run(4, |comm| {
                quantile(&comm, &per_rank[comm.rank()], 1_000_000, 0.5).unwrap()
            });
            black_box(results)
        })
    });
}

criterion_group!(benches, bench_quantile_single_rank, bench_quantile_four_ranks);
criterion_main!(benches);
