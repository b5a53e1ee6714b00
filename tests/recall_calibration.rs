//! Recall calibration against the brute-force oracle: N = 10,000
//! uniform vectors in R^8 under cosine, default-ish connectivity,
//! top-10 recall >= 0.95 averaged over 1,000 queries.

use hnsw_core::{Index, IndexOptions, MetricKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

const DIM: usize = 8;
const N: usize = 10_000;
const QUERIES: usize = 1_000;
const K: usize = 10;

fn random_vector(rng: &mut StdRng) -> Vec<f32> {
    (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
#[ignore = "slow calibration run (10k inserts, 1k queries); run explicitly with --ignored"]
fn top_10_recall_against_brute_force_meets_threshold() {
    let index = Index::open(
        IndexOptions::new(DIM, MetricKind::Cosine)
            .connectivity(16, 32)
            .expansion_add(128)
            .expansion_search(64),
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    for key in 0..N as u64 {
        let v = random_vector(&mut rng);
        index.add(0, key, &v).unwrap();
    }

    let mut hits = 0usize;
    let mut total = 0usize;
    for _ in 0..QUERIES {
        let query = random_vector(&mut rng);
        let approx = index.search(0, &query, K, None, None).unwrap();
        let exact = index.search_exact(&query, K, None).unwrap();
        let exact_keys: HashSet<u64> = exact.iter().map(|(k, _)| *k).collect();
        hits += approx.iter().filter(|(k, _)| exact_keys.contains(k)).count();
        total += exact.len();
    }

    let recall = hits as f64 / total as f64;
    assert!(recall >= 0.95, "top-10 recall {recall:.4} below 0.95 threshold");
}
