//! Concurrent insertion property: `T` threads each inserting `N/T`
//! disjoint keys must leave the index in a consistent, fully-findable
//! state.

use hnsw_core::{Index, IndexOptions, MetricKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;

const DIM: usize = 8;
const THREADS: usize = 8;
const PER_THREAD: usize = 250;
const TOTAL: usize = THREADS * PER_THREAD;

fn random_vector(rng: &mut StdRng) -> Vec<f32> {
    (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
fn concurrent_inserts_are_all_findable_and_size_matches() {
    let index = Index::open(
        IndexOptions::new(DIM, MetricKind::Cosine)
            .connectivity(16, 32)
            .max_threads(THREADS),
    )
    .unwrap();

    let vectors: Vec<Vec<f32>> = {
        let mut rng = StdRng::seed_from_u64(2024);
        (0..TOTAL).map(|_| random_vector(&mut rng)).collect()
    };

    thread::scope(|scope| {
        for (thread_id, chunk) in vectors.chunks(PER_THREAD).enumerate() {
            let index = &index;
            let base_key = (thread_id * PER_THREAD) as u64;
            scope.spawn(move || {
                for (i, v) in chunk.iter().enumerate() {
                    index.add(thread_id, base_key + i as u64, v).unwrap();
                }
            });
        }
    });

    assert_eq!(index.size(), TOTAL);
    assert_eq!(index.count_deleted(), 0);

    // Every inserted key must be exactly findable.
    for key in 0..TOTAL as u64 {
        assert!(index.contains(key), "key {key} missing after concurrent insert");
        let stored = index.get(key).unwrap();
        assert_eq!(stored, vectors[key as usize]);
    }

    // And ANN search should recover most inserted keys as their own
    // nearest neighbor (recall >= 0.90 under default params).
    let mut hits = 0usize;
    for key in 0..TOTAL as u64 {
        let v = &vectors[key as usize];
        let results = index.search(0, v, 1, None, None).unwrap();
        if results.first().map(|(k, _)| *k) == Some(key) {
            hits += 1;
        }
    }
    let recall = hits as f64 / TOTAL as f64;
    assert!(recall >= 0.90, "self-recall {recall:.3} below 0.90");
}
