//! Key↔slot mapping: single-vector mode uses a
//! unique `key -> slot` map; multi-vector mode uses
//! [`crate::container::multiset::KeyMultiset`].

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::container::multiset::KeyMultiset;
use crate::node::Slot;

/// A unique `key -> slot` map for single-vector-mode indexes.
#[derive(Debug, Default)]
pub struct KeyMap {
    map: FxHashMap<u64, Slot>,
}

impl KeyMap {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }
}

/// The façade's key index, single- or multi-vector depending on how
/// the index was opened. Holds its own mutex: the key↔slot map is
/// touched once per public op, so contention is low and a single lock
/// (rather than per-bucket sharding) is sufficient.
pub(super) enum KeyIndex {
    Single(Mutex<KeyMap>),
    Multi(Mutex<KeyMultiset>),
}

impl KeyIndex {
    pub(super) fn new(multi: bool, capacity: usize) -> Self {
        if multi {
            Self::Multi(Mutex::new(KeyMultiset::with_capacity(capacity)))
        } else {
            Self::Single(Mutex::new(KeyMap::with_capacity(capacity)))
        }
    }

    pub(super) fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// All slots currently registered under `key`.
    pub(super) fn get_all(&self, key: u64) -> Vec<Slot> {
        match self {
            Self::Single(m) => m.lock().map.get(&key).copied().into_iter().collect(),
            Self::Multi(m) => m.lock().get(key).to_vec(),
        }
    }

    pub(super) fn count(&self, key: u64) -> usize {
        match self {
            Self::Single(m) => usize::from(m.lock().map.contains_key(&key)),
            Self::Multi(m) => m.lock().count(key),
        }
    }

    pub(super) fn contains_key(&self, key: u64) -> bool {
        match self {
            Self::Single(m) => m.lock().map.contains_key(&key),
            Self::Multi(m) => m.lock().contains_key(key),
        }
    }

    /// Registers `slot` under `key`. In single mode, `Some(previous)`
    /// is returned if `key` was already present (caller decides
    /// whether that was allowed).
    pub(super) fn insert(&self, key: u64, slot: Slot) -> Option<Slot> {
        match self {
            Self::Single(m) => m.lock().map.insert(key, slot),
            Self::Multi(m) => {
                m.lock().insert(key, slot);
                None
            }
        }
    }

    /// Removes every slot registered under `key`, returning them.
    pub(super) fn remove_all(&self, key: u64) -> Vec<Slot> {
        match self {
            Self::Single(m) => m.lock().map.remove(&key).into_iter().collect(),
            Self::Multi(m) => m.lock().remove_all(key),
        }
    }

    /// Removes a single `slot` from under `key` (multi-vector mode
    /// only API; in single mode this is equivalent to `remove_all`).
    pub(super) fn remove_one(&self, key: u64, slot: Slot) -> bool {
        match self {
            Self::Single(m) => {
                let mut guard = m.lock();
                if guard.map.get(&key) == Some(&slot) {
                    guard.map.remove(&key);
                    true
                } else {
                    false
                }
            }
            Self::Multi(m) => m.lock().remove_one(key, slot),
        }
    }

    /// Every `(key, slot)` pair currently registered.
    pub(super) fn iter_pairs(&self) -> Vec<(u64, Slot)> {
        match self {
            Self::Single(m) => m.lock().map.iter().map(|(&k, &s)| (k, s)).collect(),
            Self::Multi(m) => m.lock().iter().collect(),
        }
    }
}
