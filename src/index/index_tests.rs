//! Index-level tests: deterministic scenarios, the codec round-trip,
//! and view mode.

use std::sync::Arc;

use crate::metric::MetricKind;
use crate::scalar::ScalarKind;

use super::{DuplicatePolicy, Index, IndexOptions, LoadLimits};

fn options(dim: usize, metric: MetricKind) -> IndexOptions {
    IndexOptions::new(dim, metric).connectivity(8, 16).max_threads(4)
}

#[test]
fn tiny_metric_sanity_nearest_is_itself() {
    let index = Index::open(options(2, MetricKind::SquaredL2)).unwrap();
    index.add(0, 1, &[0.0, 0.0]).unwrap();
    index.add(0, 2, &[10.0, 10.0]).unwrap();
    index.add(0, 3, &[0.5, 0.5]).unwrap();

    let results = index.search(0, &[0.0, 0.0], 1, None, None).unwrap();
    assert_eq!(results[0].0, 1);
}

#[test]
fn cosine_degenerate_zero_vector_does_not_panic() {
    let index = Index::open(options(3, MetricKind::Cosine)).unwrap();
    index.add(0, 1, &[0.0, 0.0, 0.0]).unwrap();
    index.add(0, 2, &[1.0, 0.0, 0.0]).unwrap();
    let results = index.search(0, &[0.0, 0.0, 0.0], 2, None, None).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn multi_vector_search_collapses_duplicate_keys() {
    let opts = options(2, MetricKind::SquaredL2).multi(true);
    let index = Index::open(opts).unwrap();
    index.add(0, 42, &[0.0, 0.0]).unwrap();
    index.add(0, 42, &[0.1, 0.1]).unwrap();
    index.add(0, 42, &[20.0, 20.0]).unwrap();
    index.add(0, 7, &[5.0, 5.0]).unwrap();

    let results = index.search(0, &[0.0, 0.0], 2, None, None).unwrap();
    let keys: Vec<u64> = results.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys.iter().filter(|&&k| k == 42).count(), 1);
    assert!(keys.contains(&42));
}

#[test]
fn tombstoned_nodes_are_excluded_from_results_but_stay_traversable() {
    let index = Index::open(options(2, MetricKind::SquaredL2)).unwrap();
    for i in 0..20u64 {
        index.add(0, i, &[i as f32, 0.0]).unwrap();
    }
    assert!(index.remove(5).unwrap());
    let results = index.search(0, &[5.0, 0.0], 20, None, None).unwrap();
    assert!(!results.iter().any(|(k, _)| *k == 5));
    assert_eq!(index.count_deleted(), 1);
    assert_eq!(index.size(), 19);
}

#[test]
fn duplicate_key_reject_policy_errs() {
    let index = Index::open(options(2, MetricKind::SquaredL2)).unwrap();
    index.add(0, 1, &[0.0, 0.0]).unwrap();
    let err = index.add(0, 1, &[1.0, 1.0]).unwrap_err();
    assert!(matches!(err, crate::error::Error::DuplicateKey));
}

#[test]
fn duplicate_key_overwrite_policy_replaces() {
    let opts = options(2, MetricKind::SquaredL2).duplicate_policy(DuplicatePolicy::Overwrite);
    let index = Index::open(opts).unwrap();
    index.add(0, 1, &[0.0, 0.0]).unwrap();
    index.add(0, 1, &[9.0, 9.0]).unwrap();
    assert_eq!(index.get(1).unwrap(), vec![9.0, 9.0]);
    assert_eq!(index.size(), 1);
}

fn build_sample_index() -> Index {
    let index = Index::open(options(4, MetricKind::SquaredL2)).unwrap();
    for i in 0..64u64 {
        let v = [i as f32, (i * 2) as f32, (i % 5) as f32, -(i as f32)];
        index.add(0, i, &v).unwrap();
    }
    index.remove(3).unwrap();
    index.remove(40).unwrap();
    index
}

#[test]
fn save_then_load_preserves_live_vectors_and_search_behavior() {
    let index = build_sample_index();
    let mut buf = Vec::new();
    index.save(&mut buf).unwrap();

    let loaded = Index::load(std::io::Cursor::new(buf)).unwrap();
    assert_eq!(loaded.size(), index.size());
    assert_eq!(loaded.count_deleted(), index.count_deleted());
    assert!(!loaded.contains(3));
    assert!(!loaded.contains(40));
    assert_eq!(loaded.get(10), index.get(10));

    let query = [10.0, 20.0, 0.0, -10.0];
    let before = index.search(0, &query, 5, None, None).unwrap();
    let after = loaded.search(0, &query, 5, None, None).unwrap();
    assert_eq!(before, after);
}

#[test]
fn save_then_load_with_limits_respects_override() {
    let index = build_sample_index();
    let mut buf = Vec::new();
    index.save(&mut buf).unwrap();

    let loaded = Index::load_with_limits(
        std::io::Cursor::new(buf),
        LoadLimits {
            max_threads: 2,
            expansion_search: 32,
            expansion_add: 64,
        },
    )
    .unwrap();
    assert_eq!(loaded.size(), index.size());
}

#[test]
fn view_mode_is_read_only_and_matches_owned_search() {
    let index = build_sample_index();
    let mut buf = Vec::new();
    index.save(&mut buf).unwrap();
    let bytes: Arc<[u8]> = Arc::from(buf.into_boxed_slice());

    let view = Index::view(Arc::clone(&bytes), 0).unwrap();
    assert_eq!(view.size(), index.size());

    let query = [1.0, 2.0, 3.0, 4.0];
    let expected = index.search(0, &query, 5, None, None).unwrap();
    let actual = view.search(0, &query, 5, None, None).unwrap();
    assert_eq!(expected, actual);

    let err = view.add(0, 999, &[0.0, 0.0, 0.0, 0.0]).unwrap_err();
    assert!(matches!(err, crate::error::Error::Immutable));
    let err = view.remove(10).unwrap_err();
    assert!(matches!(err, crate::error::Error::Immutable));
}

#[test]
fn view_mode_over_a_region_at_nonzero_offset() {
    let index = build_sample_index();
    let mut buf = vec![0xAAu8; 17]; // unrelated prefix bytes
    index.save(&mut buf).unwrap();
    let offset = 17;
    let bytes: Arc<[u8]> = Arc::from(buf.into_boxed_slice());

    let view = Index::view(bytes, offset).unwrap();
    assert_eq!(view.size(), index.size());
}

#[cfg(feature = "mmap")]
#[test]
fn view_file_mmaps_a_saved_index() {
    use std::io::Write as _;

    let index = build_sample_index();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let mut buf = Vec::new();
    index.save(&mut buf).unwrap();
    file.write_all(&buf).unwrap();
    file.flush().unwrap();

    let view = Index::view_file(file.path()).unwrap();
    assert_eq!(view.size(), index.size());
    let query = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(
        index.search(0, &query, 5, None, None).unwrap(),
        view.search(0, &query, 5, None, None).unwrap()
    );
}

#[test]
fn load_rejects_truncated_file() {
    let index = build_sample_index();
    let mut buf = Vec::new();
    index.save(&mut buf).unwrap();
    buf.truncate(buf.len() / 2);
    let err = Index::load(std::io::Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, crate::error::Error::IoError(_)));
}

#[test]
fn load_rejects_bad_magic() {
    let mut buf = vec![0u8; 64];
    buf[0..7].copy_from_slice(b"garbage");
    let err = Index::load(std::io::Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, crate::error::Error::IncompatibleFormat { .. }));
}

#[test]
fn compact_preserves_live_search_results() {
    let index = build_sample_index();
    let compacted = index.compact().unwrap();
    assert_eq!(compacted.size(), index.size());
    assert_eq!(compacted.count_deleted(), 0);

    let query = [1.0, 2.0, 3.0, 4.0];
    let before = index.search_exact(&query, 5, None).unwrap();
    let after = compacted.search_exact(&query, 5, None).unwrap();
    assert_eq!(before, after);
}

#[test]
fn reserve_grows_capacity_without_inserting() {
    let index = Index::open(options(2, MetricKind::SquaredL2)).unwrap();
    index.reserve(100).unwrap();
    assert!(index.capacity() >= 100);
    assert_eq!(index.size(), 0);
}

#[test]
fn scalar_kind_i8_round_trips_through_search() {
    let opts = options(3, MetricKind::SquaredL2).scalar_kind(ScalarKind::I8);
    let index = Index::open(opts).unwrap();
    index.add(0, 1, &[1.0, 0.0, 0.0]).unwrap();
    index.add(0, 2, &[-1.0, 0.0, 0.0]).unwrap();
    let results = index.search(0, &[0.9, 0.0, 0.0], 1, None, None).unwrap();
    assert_eq!(results[0].0, 1);
}
