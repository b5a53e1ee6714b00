//! The dense-vector façade: vector payload storage, key↔slot mapping,
//! duplicate-key policy, and scalar conversion on top of the HNSW
//! graph engine.

pub mod options;
pub(crate) mod keymap;
mod vectors;

mod codec;
mod compact;
pub mod stats;

#[cfg(test)]
mod index_tests;

use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::container::Candidate;
use crate::error::{Error, Result};
use crate::graph::{GraphParams, HnswGraph, Predicate, VectorSource};
use crate::metric::Metric;
use crate::node::Slot;
use crate::scalar;

use keymap::KeyIndex;
pub use codec::LoadLimits;
pub use options::{DuplicatePolicy, IndexOptions};
pub use stats::IndexStats;
pub use vectors::VectorStore;

/// How many extra internal candidates a multi-vector `search` requests
/// per desired result, to absorb duplicate-key collapsing without
/// iterating until `k` distinct keys accumulate (see `DESIGN.md`).
const DEDUP_FANOUT: usize = 4;

/// Outcome of a successful [`Index::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// The slot the vector was stored at.
    pub slot: Slot,
    /// Always `true` — a rejected duplicate key surfaces as an `Err`
    /// instead, matching the graph layer's own `InsertOutcome`.
    pub added: bool,
}

/// An open approximate-nearest-neighbor index: the public surface of
/// this crate.
pub struct Index {
    options: IndexOptions,
    graph: HnswGraph,
    vectors: Arc<VectorStore>,
    keys: KeyIndex,
    /// Reverse `slot -> key` map, kept alongside the graph's own
    /// key→slot map so search results (which the graph reports as
    /// slots) can be translated back to caller keys in O(1) without a
    /// linear scan over the key map.
    slot_keys: RwLock<FxHashMap<Slot, u64>>,
}

impl Index {
    /// Opens a new, empty, mutable index per `options`.
    ///
    /// Fails with [`Error::Misconfiguration`] if no metric kernel
    /// exists for `(metric_kind, scalar_kind)`, or if
    /// `duplicate_policy` is `MultiAppend` while `multi` is `false`
    /// (multi-append only makes sense when many slots per key are
    /// structurally supported).
    #[instrument(skip(options), fields(dimensions = options.dimensions, multi = options.multi))]
    pub fn open(options: IndexOptions) -> Result<Self> {
        if options.duplicate_policy == DuplicatePolicy::MultiAppend && !options.multi {
            return Err(Error::misconfiguration(
                "duplicate_policy MultiAppend requires multi-vector mode",
            ));
        }
        let metric = Metric::new(options.metric_kind, options.scalar_kind, options.dimensions)?;
        let vectors = Arc::new(VectorStore::with_capacity(
            options.dimensions,
            options.scalar_kind,
            0,
        ));
        let graph = HnswGraph::new(
            Arc::clone(&vectors) as Arc<dyn VectorSource>,
            metric,
            GraphParams {
                capacities: options.capacities,
                expansion_add: options.expansion_add,
                expansion_search: options.expansion_search,
                max_level_cap: options.max_level_cap,
                max_threads: options.max_threads,
            },
        );
        debug!("index opened");
        Ok(Self {
            options,
            graph,
            vectors,
            keys: KeyIndex::new(options.multi, 0),
            slot_keys: RwLock::new(FxHashMap::default()),
        })
    }

    /// Grows vector storage to hold at least `capacity` vectors without
    /// further reallocation. `max_threads` is fixed at [`Index::open`]
    /// (the per-thread scratch pool is sized once); this only grows
    /// storage.
    pub fn reserve(&self, capacity: usize) -> Result<()> {
        if !self.vectors.is_mutable() {
            return Err(Error::Immutable);
        }
        if capacity == 0 {
            return Ok(());
        }
        #[allow(clippy::cast_possible_truncation)]
        self.vectors.ensure_capacity((capacity - 1) as u32)
    }

    /// Adds `vector` under `key`. `thread_id` selects the per-thread
    /// scratch used while linking.
    ///
    /// In single-vector mode, an existing `key` is handled per
    /// [`DuplicatePolicy`]. In multi-vector mode every call appends a
    /// new slot under `key` regardless of what is already stored.
    #[instrument(skip(self, vector), fields(key, dim = vector.len()))]
    pub fn add(&self, thread_id: usize, key: u64, vector: &[f32]) -> Result<AddOutcome> {
        if !self.vectors.is_mutable() {
            return Err(Error::Immutable);
        }
        if vector.len() != self.options.dimensions {
            return Err(Error::misconfiguration(format!(
                "vector has {} components, index expects {}",
                vector.len(),
                self.options.dimensions
            )));
        }

        if !self.options.multi {
            match self.options.duplicate_policy {
                DuplicatePolicy::Reject => {
                    if self.keys.contains_key(key) {
                        return Err(Error::DuplicateKey);
                    }
                }
                DuplicatePolicy::Overwrite => {
                    if self.keys.contains_key(key) {
                        self.remove(key)?;
                    }
                }
                DuplicatePolicy::MultiAppend => {
                    unreachable!("validated against !multi at open()")
                }
            }
        }

        let mut encoded = Vec::with_capacity(self.vectors.bytes_per_vector());
        scalar::encode(self.vectors.scalar_kind(), vector, &mut encoded);

        // Reserve the slot and write its vector payload *before*
        // linking makes it reachable from any other node's back-edges
        // — otherwise a concurrent reader following a freshly
        // installed edge into this slot would race this write, or
        // (if the slot starts a not-yet-allocated storage segment)
        // index out of bounds.
        let reserved = self.graph.reserve_slot(thread_id)?;
        self.vectors.ensure_capacity(reserved.slot)?;
        self.vectors.write_at(reserved.slot, &encoded)?;

        // SAFETY: `encoded` holds exactly `bytes_per_vector` bytes of
        // the graph's configured scalar kind and outlives this call;
        // `reserved.slot`'s payload is already written above.
        let outcome = unsafe { self.graph.link_slot(thread_id, reserved, encoded.as_ptr()) }?;
        self.keys.insert(key, outcome.slot);
        self.slot_keys.write().insert(outcome.slot, key);
        debug!(slot = outcome.slot, "vector added");

        Ok(AddOutcome {
            slot: outcome.slot,
            added: outcome.added,
        })
    }

    /// Tombstones every slot registered under `key`. Returns `false` if
    /// `key` was not present.
    pub fn remove(&self, key: u64) -> Result<bool> {
        if !self.vectors.is_mutable() {
            return Err(Error::Immutable);
        }
        let slots = self.keys.remove_all(key);
        if slots.is_empty() {
            return Ok(false);
        }
        let mut slot_keys = self.slot_keys.write();
        for slot in slots {
            self.graph.tombstone(slot);
            slot_keys.remove(&slot);
        }
        Ok(true)
    }

    /// Tombstones a single `slot` directly, regardless of key. Returns
    /// `false` if `slot` is not registered under any key (already
    /// removed, or never assigned a key).
    pub fn remove_slot(&self, slot: Slot) -> Result<bool> {
        if !self.vectors.is_mutable() {
            return Err(Error::Immutable);
        }
        let Some(key) = self.slot_keys.write().remove(&slot) else {
            return Ok(false);
        };
        self.keys.remove_one(key, slot);
        Ok(self.graph.tombstone(slot))
    }

    /// Whether any slot is currently registered under `key`.
    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.keys.contains_key(key)
    }

    /// Number of slots currently registered under `key` (0 or 1 in
    /// single-vector mode).
    #[must_use]
    pub fn count(&self, key: u64) -> usize {
        self.keys.count(key)
    }

    /// The vector stored under `key`, decoded back to `f32`. In
    /// multi-vector mode, returns the first slot registered under
    /// `key` (use [`Index::get_all`] for every vector under the key).
    #[must_use]
    pub fn get(&self, key: u64) -> Option<Vec<f32>> {
        self.keys
            .get_all(key)
            .into_iter()
            .next()
            .map(|slot| self.decode_slot(slot))
    }

    /// Every vector currently registered under `key`, decoded back to
    /// `f32`.
    #[must_use]
    pub fn get_all(&self, key: u64) -> Vec<Vec<f32>> {
        self.keys
            .get_all(key)
            .into_iter()
            .map(|slot| self.decode_slot(slot))
            .collect()
    }

    fn decode_slot(&self, slot: Slot) -> Vec<f32> {
        let bytes = self.vectors.read_at(slot);
        scalar::decode(self.vectors.scalar_kind(), self.vectors.dim(), &bytes)
    }

    /// Approximate top-k query. `thread_id` selects the per-thread
    /// scratch used for the search. `expansion` overrides the default
    /// `expansion_search` candidate-set size for this call only.
    pub fn search(
        &self,
        thread_id: usize,
        query: &[f32],
        k: usize,
        expansion: Option<usize>,
        predicate: Option<&Predicate<'_>>,
    ) -> Result<Vec<(u64, f32)>> {
        let encoded = self.encode_query(query)?;
        let internal_k = self.internal_fanout(k);
        // SAFETY: `encoded` holds `bytes_per_vector` bytes of the
        // graph's configured scalar kind.
        let candidates =
            unsafe { self.graph.search(thread_id, encoded.as_ptr(), internal_k, expansion, predicate) }?;
        Ok(self.slots_to_results(candidates, k))
    }

    /// Brute-force top-k query, bypassing the graph. Used for recall
    /// calibration and as a correctness oracle.
    pub fn search_exact(
        &self,
        query: &[f32],
        k: usize,
        predicate: Option<&Predicate<'_>>,
    ) -> Result<Vec<(u64, f32)>> {
        let encoded = self.encode_query(query)?;
        let internal_k = self.internal_fanout(k);
        // SAFETY: `encoded` holds `bytes_per_vector` bytes of the
        // graph's configured scalar kind.
        let candidates = unsafe { self.graph.search_exact(encoded.as_ptr(), internal_k, predicate) };
        Ok(self.slots_to_results(candidates, k))
    }

    fn encode_query(&self, query: &[f32]) -> Result<Vec<u8>> {
        if query.len() != self.options.dimensions {
            return Err(Error::misconfiguration(format!(
                "query has {} components, index expects {}",
                query.len(),
                self.options.dimensions
            )));
        }
        let mut encoded = Vec::with_capacity(self.vectors.bytes_per_vector());
        scalar::encode(self.vectors.scalar_kind(), query, &mut encoded);
        Ok(encoded)
    }

    /// Internal candidate count requested from the graph: `k` in
    /// single-vector mode, `k * DEDUP_FANOUT` in multi-vector mode so
    /// collapsing duplicate keys client-side still usually yields `k`
    /// distinct results.
    fn internal_fanout(&self, k: usize) -> usize {
        if self.keys.is_multi() {
            k.saturating_mul(DEDUP_FANOUT).max(1)
        } else {
            k.max(1)
        }
    }

    /// Maps graph-level `(distance, slot)` candidates back to caller
    /// keys, collapsing duplicates (multi-vector mode keeps the
    /// smallest distance per key) and truncating to `k`.
    fn slots_to_results(&self, candidates: Vec<Candidate>, k: usize) -> Vec<(u64, f32)> {
        let slot_keys = self.slot_keys.read();
        if !self.keys.is_multi() {
            let mut results: Vec<(u64, f32)> = candidates
                .into_iter()
                .filter_map(|c| slot_keys.get(&c.slot).map(|&key| (key, c.distance)))
                .collect();
            results.truncate(k);
            return results;
        }

        let mut best: FxHashMap<u64, f32> = FxHashMap::default();
        let mut order: Vec<u64> = Vec::new();
        for c in candidates {
            let Some(&key) = slot_keys.get(&c.slot) else {
                continue;
            };
            match best.entry(key) {
                Entry::Vacant(e) => {
                    e.insert(c.distance);
                    order.push(key);
                }
                Entry::Occupied(mut e) => {
                    if c.distance < *e.get() {
                        *e.get_mut() = c.distance;
                    }
                }
            }
        }
        order.sort_by(|a, b| best[a].total_cmp(&best[b]));
        order.truncate(k);
        order.into_iter().map(|key| (key, best[&key])).collect()
    }

    /// Number of live (non-tombstoned) vectors.
    #[must_use]
    pub fn size(&self) -> usize {
        self.graph.len()
    }

    /// Number of vectors tombstoned but not yet reclaimed by `compact`.
    #[must_use]
    pub fn count_deleted(&self) -> usize {
        self.graph.count_deleted()
    }

    /// Current vector-storage capacity before the next grow.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.vectors.capacity()
    }

    /// Total bytes currently allocated for vector payload storage.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.vectors.memory_usage()
    }

    /// The options this index was opened with.
    #[must_use]
    pub const fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// A snapshot of graph and façade statistics.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        stats::collect(self)
    }
}
