//! Query latency across result-set size and `expansion_search`.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hnsw_core::{Index, IndexOptions, MetricKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const DIM: usize = 64;
const CORPUS_SIZE: usize = 5_000;

fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn build_corpus() -> (Index, Vec<Vec<f32>>) {
    let vectors = random_vectors(CORPUS_SIZE, DIM, 42);
    let index = Index::open(IndexOptions::new(DIM, MetricKind::SquaredL2).connectivity(16, 32)).unwrap();
    for (key, v) in vectors.iter().enumerate() {
        index.add(0, key as u64, v).unwrap();
    }
    let queries = random_vectors(100, DIM, 99);
    (index, queries)
}

fn bench_search_by_k(c: &mut Criterion) {
    let (index, queries) = build_corpus();
    let mut group = c.benchmark_group("search_by_k");

    for k in [1usize, 10, 50, 100] {
        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::new("k", k), &k, |b, &k| {
            let mut i = 0;
            b.iter(|| {
                let q = &queries[i % queries.len()];
                i += 1;
                black_box(index.search(0, q, k, None, None).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_search_by_expansion(c: &mut Criterion) {
    let (index, queries) = build_corpus();
    let mut group = c.benchmark_group("search_by_expansion_search");

    for expansion in [16usize, 64, 256] {
        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::new("expansion", expansion), &expansion, |b, &expansion| {
            let mut i = 0;
            b.iter(|| {
                let q = &queries[i % queries.len()];
                i += 1;
                black_box(index.search(0, q, 10, Some(expansion), None).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search_by_k, bench_search_by_expansion);
criterion_main!(benches);
