use super::visited::VisitedSet;

#[test]
fn set_reports_first_insertion_as_new() {
    let mut visited = VisitedSet::with_capacity(8);
    assert!(!visited.set(5));
    assert!(visited.set(5));
    assert!(visited.contains(5));
    assert_eq!(visited.len(), 1);
}

#[test]
fn grows_past_initial_capacity() {
    let mut visited = VisitedSet::with_capacity(4);
    for slot in 0..500 {
        visited.set(slot);
    }
    assert_eq!(visited.len(), 500);
    for slot in 0..500 {
        assert!(visited.contains(slot));
    }
}

#[test]
fn clear_empties_without_losing_capacity() {
    let mut visited = VisitedSet::with_capacity(16);
    visited.set(1);
    visited.set(2);
    visited.clear();
    assert!(visited.is_empty());
    assert!(!visited.contains(1));
}
