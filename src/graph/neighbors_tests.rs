use crate::container::Candidate;
use crate::node::LevelCapacities;

use super::test_support::make_graph;

fn caps(m0: usize, m: usize) -> LevelCapacities {
    LevelCapacities { m0, m }
}

#[test]
fn select_neighbors_never_exceeds_capacity() {
    let (graph, vectors) = make_graph(2, 16, caps(8, 4), 32, 16, 1);
    let query_slot = vectors.push(&[0.0, 0.0]);
    let mut candidates = Vec::new();
    for i in 1..10 {
        let slot = vectors.push(&[i as f32, 0.0]);
        let ptr = vectors.vector_ptr(slot);
        let query_ptr = vectors.vector_ptr(query_slot);
        let distance = unsafe { graph.metric().distance(query_ptr, ptr) };
        candidates.push(Candidate::new(distance, slot));
    }
    let selected = graph.select_neighbors(candidates, 3);
    assert!(selected.len() <= 3);
}

#[test]
fn select_neighbors_prefers_the_nearest_candidate() {
    let (graph, vectors) = make_graph(2, 16, caps(8, 4), 32, 16, 1);
    let query_slot = vectors.push(&[0.0, 0.0]);
    let near = vectors.push(&[1.0, 0.0]);
    let far = vectors.push(&[10.0, 0.0]);
    let query_ptr = vectors.vector_ptr(query_slot);
    let near_d = unsafe { graph.metric().distance(query_ptr, vectors.vector_ptr(near)) };
    let far_d = unsafe { graph.metric().distance(query_ptr, vectors.vector_ptr(far)) };
    let candidates = vec![Candidate::new(far_d, far), Candidate::new(near_d, near)];
    let selected = graph.select_neighbors(candidates, 1);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].slot, near);
}
