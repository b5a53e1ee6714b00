use crate::node::LevelCapacities;

use super::test_support::{insert_vector, make_graph};

fn caps(m0: usize, m: usize) -> LevelCapacities {
    LevelCapacities { m0, m }
}

#[test]
fn search_on_empty_graph_returns_empty() {
    let (graph, vectors) = make_graph(2, 4, caps(8, 4), 32, 16, 1);
    let query = vectors.push(&[0.0, 0.0]);
    let ptr = vectors.vector_ptr(query);
    let results = unsafe { graph.search(0, ptr, 5, None, None) }.unwrap();
    assert!(results.is_empty());
}

#[test]
fn single_element_matches_any_query() {
    let (graph, vectors) = make_graph(2, 4, caps(8, 4), 32, 16, 1);
    unsafe { insert_vector(&graph, &vectors, 0, &[1.0, 1.0]) };
    let query = vectors.push(&[5.0, -5.0]);
    let ptr = vectors.vector_ptr(query);
    let results = unsafe { graph.search(0, ptr, 3, None, None) }.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].slot, 0);
}

#[test]
fn k_greater_than_size_returns_all_live_sorted_ascending() {
    let (graph, vectors) = make_graph(2, 16, caps(8, 4), 32, 16, 1);
    for i in 0..5 {
        unsafe { insert_vector(&graph, &vectors, 0, &[i as f32, 0.0]) };
    }
    let query = vectors.push(&[0.0, 0.0]);
    let ptr = vectors.vector_ptr(query);
    let results = unsafe { graph.search(0, ptr, 100, None, None) }.unwrap();
    assert_eq!(results.len(), 5);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn tombstoned_nodes_are_excluded_from_results_but_stay_navigable() {
    let (graph, vectors) = make_graph(2, 64, caps(8, 4), 32, 16, 1);
    let mut slots = Vec::new();
    for i in 0..30 {
        let s = unsafe { insert_vector(&graph, &vectors, 0, &[i as f32, (i % 5) as f32]) };
        slots.push(s);
    }
    for &s in slots.iter().step_by(2) {
        graph.tombstone(s);
    }
    let query = vectors.push(&[0.0, 0.0]);
    let ptr = vectors.vector_ptr(query);
    let results = unsafe { graph.search(0, ptr, 10, None, None) }.unwrap();
    for r in &results {
        assert!(!graph.is_tombstoned(r.slot));
    }
    assert!(!results.is_empty());
}

#[test]
fn all_tombstoned_search_returns_empty() {
    let (graph, vectors) = make_graph(2, 8, caps(8, 4), 32, 16, 1);
    let s = unsafe { insert_vector(&graph, &vectors, 0, &[1.0, 1.0]) };
    graph.tombstone(s);
    let query = vectors.push(&[1.0, 1.0]);
    let ptr = vectors.vector_ptr(query);
    let results = unsafe { graph.search(0, ptr, 5, None, None) }.unwrap();
    assert!(results.is_empty());
}

#[test]
fn expansion_search_below_k_is_raised_to_k() {
    let (graph, vectors) = make_graph(2, 32, caps(8, 4), 32, 16, 1);
    for i in 0..20 {
        unsafe { insert_vector(&graph, &vectors, 0, &[i as f32, 0.0]) };
    }
    let query = vectors.push(&[0.0, 0.0]);
    let ptr = vectors.vector_ptr(query);
    let results = unsafe { graph.search(0, ptr, 10, Some(2), None) }.unwrap();
    assert_eq!(results.len(), 10);
}

#[test]
fn search_exact_matches_graph_search_on_tiny_dataset() {
    let (graph, vectors) = make_graph(2, 16, caps(8, 4), 64, 32, 1);
    for i in 0..10 {
        unsafe { insert_vector(&graph, &vectors, 0, &[i as f32, i as f32]) };
    }
    let query = vectors.push(&[3.0, 3.0]);
    let ptr = vectors.vector_ptr(query);
    let exact = unsafe { graph.search_exact(ptr, 3, None) };
    let approx = unsafe { graph.search(0, ptr, 3, None, None) }.unwrap();
    let exact_slots: Vec<u32> = exact.iter().map(|c| c.slot).collect();
    let approx_slots: Vec<u32> = approx.iter().map(|c| c.slot).collect();
    assert_eq!(exact_slots, approx_slots);
}

#[test]
fn predicate_filters_level_zero_results() {
    let (graph, vectors) = make_graph(2, 32, caps(8, 4), 32, 16, 1);
    for i in 0..20 {
        unsafe { insert_vector(&graph, &vectors, 0, &[i as f32, 0.0]) };
    }
    let query = vectors.push(&[0.0, 0.0]);
    let ptr = vectors.vector_ptr(query);
    let predicate = |slot: u32| slot % 2 == 0;
    let results = unsafe { graph.search(0, ptr, 5, Some(32), Some(&predicate)) }.unwrap();
    assert!(results.iter().all(|c| c.slot % 2 == 0));
}
