//! Growing `key -> {slot, ...}` multiset backing multi-vector mode.

use rustc_hash::FxHashMap;

/// A multimap from caller key to the (possibly many) slots storing
/// vectors added under that key.
///
/// Single-vector mode uses [`crate::index::keymap::KeyMap`] instead;
/// this type is the multi-vector counterpart, allowing several slots
/// per key.
#[derive(Debug, Default)]
pub struct KeyMultiset {
    map: FxHashMap<u64, Vec<u32>>,
}

impl KeyMultiset {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Adds `slot` under `key`, appending to any existing slots.
    pub fn insert(&mut self, key: u64, slot: u32) {
        self.map.entry(key).or_default().push(slot);
    }

    /// All slots currently registered under `key`.
    #[must_use]
    pub fn get(&self, key: u64) -> &[u32] {
        self.map.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Number of slots registered under `key`.
    #[must_use]
    pub fn count(&self, key: u64) -> usize {
        self.map.get(&key).map_or(0, Vec::len)
    }

    /// Removes every slot registered under `key`, returning them.
    pub fn remove_all(&mut self, key: u64) -> Vec<u32> {
        self.map.remove(&key).unwrap_or_default()
    }

    /// Removes a single `slot` from under `key`. Returns `true` if a
    /// slot was removed.
    pub fn remove_one(&mut self, key: u64, slot: u32) -> bool {
        let Some(slots) = self.map.get_mut(&key) else {
            return false;
        };
        let before = slots.len();
        slots.retain(|&s| s != slot);
        let removed = slots.len() != before;
        if slots.is_empty() {
            self.map.remove(&key);
        }
        removed
    }

    /// Whether any slot is registered under `key`.
    #[must_use]
    pub fn contains_key(&self, key: u64) -> bool {
        self.map.contains_key(&key)
    }

    /// Iterates every `(key, slot)` pair currently registered.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.map
            .iter()
            .flat_map(|(&k, slots)| slots.iter().map(move |&s| (k, s)))
    }
}
