use super::multiset::KeyMultiset;

#[test]
fn multiple_slots_per_key() {
    let mut set = KeyMultiset::with_capacity(4);
    set.insert(7, 10);
    set.insert(7, 11);
    set.insert(8, 20);
    assert_eq!(set.count(7), 2);
    assert_eq!(set.get(7), &[10, 11]);
    assert_eq!(set.count(8), 1);
}

#[test]
fn remove_one_leaves_others_intact() {
    let mut set = KeyMultiset::with_capacity(4);
    set.insert(7, 10);
    set.insert(7, 11);
    assert!(set.remove_one(7, 10));
    assert_eq!(set.get(7), &[11]);
    assert!(!set.remove_one(7, 999));
}

#[test]
fn remove_all_clears_key() {
    let mut set = KeyMultiset::with_capacity(4);
    set.insert(7, 10);
    set.insert(7, 11);
    let removed = set.remove_all(7);
    assert_eq!(removed, vec![10, 11]);
    assert!(!set.contains_key(7));
}
