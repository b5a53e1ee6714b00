use super::topk::TopK;
use super::Candidate;

#[test]
fn keeps_only_k_smallest() {
    let mut top = TopK::new(2);
    for (d, s) in [(5.0, 1), (1.0, 2), (3.0, 3), (0.5, 4)] {
        top.insert_with_limit(Candidate::new(d, s));
    }
    let sorted = top.sort_ascending();
    assert_eq!(sorted.len(), 2);
    assert_eq!(sorted[0].slot, 4);
    assert_eq!(sorted[1].slot, 2);
}

#[test]
fn insert_rejects_when_full_and_worse() {
    let mut top = TopK::new(1);
    assert!(top.insert_with_limit(Candidate::new(1.0, 1)));
    assert!(!top.insert_with_limit(Candidate::new(2.0, 2)));
    assert!(top.insert_with_limit(Candidate::new(0.5, 3)));
    let sorted = top.sort_ascending();
    assert_eq!(sorted, vec![Candidate::new(0.5, 3)]);
}

#[test]
fn unbounded_when_limit_zero() {
    let mut top = TopK::new(0);
    for i in 0..50 {
        top.insert_with_limit(Candidate::new(i as f32, i));
    }
    assert_eq!(top.sort_ascending().len(), 50);
}
