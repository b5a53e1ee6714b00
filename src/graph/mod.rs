//! The HNSW proximity graph: layered adjacency, concurrent insertion,
//! and bounded best-first search.
//!
//! The graph engine owns the layer adjacency and the per-slot
//! metadata (sampled level, tombstone flag); it does **not** own
//! vector storage — it reaches vector payloads through a
//! [`VectorSource`] the dense façade (`crate::index`) supplies.

mod insert;
mod neighbors;
mod rebuild;
mod search;
pub mod stats;

#[cfg(test)]
mod neighbors_tests;
#[cfg(test)]
mod search_tests;
#[cfg(test)]
mod test_support;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::container::heap::Frontier;
use crate::container::topk::TopK;
use crate::container::visited::VisitedSet;
use crate::locks::NodeLocks;
use crate::metric::Metric;
use crate::node::{LevelCapacities, Slot};
use crate::prefetch::{DefaultPrefetcher, Prefetcher};
use crate::rng::{level_multiplier, Rng};
use crate::safety::SafetyCounters;

pub use insert::{InsertOutcome, ReservedSlot};
pub use search::Predicate;
pub use stats::{GraphStats, LevelStats};

/// How the graph reaches a slot's vector payload. Implemented by the
/// dense façade's vector store; kept as a trait object so the graph
/// engine stays free of storage-layout concerns.
pub trait VectorSource: Send + Sync {
    /// Returns a pointer to the `dim` scalars stored for `slot`.
    ///
    /// # Safety
    ///
    /// The returned pointer must stay valid for as long as `slot`
    /// remains allocated (i.e., until `compact()` remaps it).
    fn vector_ptr(&self, slot: Slot) -> *const u8;
}

/// A single layer's adjacency: one growable neighbor list per slot.
struct Layer {
    neighbors: Vec<RwLock<Vec<Slot>>>,
}

impl Layer {
    fn new() -> Self {
        Self {
            neighbors: Vec::new(),
        }
    }

    fn ensure_capacity(&mut self, slot: Slot) {
        let slot = slot as usize;
        while self.neighbors.len() <= slot {
            self.neighbors.push(RwLock::new(Vec::new()));
        }
    }

    fn get(&self, slot: Slot) -> Vec<Slot> {
        self.neighbors
            .get(slot as usize)
            .map_or_else(Vec::new, |lock| lock.read().clone())
    }

    fn set(&self, slot: Slot, neighbors: Vec<Slot>) {
        if let Some(lock) = self.neighbors.get(slot as usize) {
            *lock.write() = neighbors;
        }
    }
}

/// Per-slot level and tombstone bookkeeping, separate from the
/// adjacency layers so a tombstone flip never touches edge data.
struct NodeTable {
    top_level: RwLock<Vec<u16>>,
    tombstoned: RwLock<Vec<std::sync::atomic::AtomicBool>>,
}

impl NodeTable {
    fn new() -> Self {
        Self {
            top_level: RwLock::new(Vec::new()),
            tombstoned: RwLock::new(Vec::new()),
        }
    }

    fn push(&self, level: u16) -> Slot {
        let mut top_level = self.top_level.write();
        let mut tombstoned = self.tombstoned.write();
        let slot = top_level.len() as u32;
        top_level.push(level);
        tombstoned.push(std::sync::atomic::AtomicBool::new(false));
        slot
    }

    fn level(&self, slot: Slot) -> u16 {
        self.top_level.read()[slot as usize]
    }

    fn is_tombstoned(&self, slot: Slot) -> bool {
        self.tombstoned.read()[slot as usize].load(Ordering::Acquire)
    }

    fn set_tombstoned(&self, slot: Slot) -> bool {
        self.tombstoned.read()[slot as usize].swap(true, Ordering::AcqRel)
    }

    fn len(&self) -> usize {
        self.top_level.read().len()
    }
}

const NO_ENTRY: u64 = u64::MAX;

/// The atomic `(slot, level)` entry point, CAS-updated on level raise.
struct EntryPoint(AtomicU64);

impl EntryPoint {
    const fn new() -> Self {
        Self(AtomicU64::new(NO_ENTRY))
    }

    fn get(&self) -> Option<(Slot, u16)> {
        let packed = self.0.load(Ordering::Acquire);
        if packed == NO_ENTRY {
            None
        } else {
            Some(((packed >> 32) as u32, (packed & 0xFFFF) as u16))
        }
    }

    fn pack(slot: Slot, level: u16) -> u64 {
        (u64::from(slot) << 32) | u64::from(level)
    }

    /// Raises the entry to `(slot, level)` if `level` is strictly
    /// greater than the current entry level, retrying the CAS on
    /// conflicting concurrent raises.
    fn raise(&self, slot: Slot, level: u16, safety: &SafetyCounters) {
        loop {
            let current = self.0.load(Ordering::Acquire);
            let current_level = if current == NO_ENTRY {
                -1
            } else {
                i32::from((current & 0xFFFF) as u16)
            };
            if i32::from(level) <= current_level {
                return;
            }
            let new = Self::pack(slot, level);
            match self
                .0
                .compare_exchange(current, new, Ordering::Release, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(_) => safety.record_retry(),
            }
        }
    }

    /// Unconditionally installs `(slot, level)`; only valid for the
    /// very first insertion, when no entry exists yet.
    fn set_initial(&self, slot: Slot, level: u16) {
        self.0.store(Self::pack(slot, level), Ordering::Release);
    }
}

/// Per-thread scratch reused across insert/search calls so the hot
/// path never allocates.
struct ThreadScratch {
    frontier: Frontier,
    top_k: TopK,
    visited: VisitedSet,
    rng: Rng,
}

impl ThreadScratch {
    fn new(seed: u64, expansion: usize) -> Self {
        Self {
            frontier: Frontier::with_capacity(expansion.max(16)),
            top_k: TopK::new(expansion.max(1)),
            visited: VisitedSet::with_capacity(expansion.max(16) * 4),
            rng: Rng::seeded(seed),
        }
    }
}

/// Tuning parameters fixed at graph construction.
#[derive(Debug, Clone, Copy)]
pub struct GraphParams {
    /// Neighbor-list capacities (`m`, `m0`).
    pub capacities: LevelCapacities,
    /// Candidate-set size used while linking during insertion.
    pub expansion_add: usize,
    /// Default candidate-set size used during search.
    pub expansion_search: usize,
    /// Upper bound on sampled levels, preventing pathological heights.
    pub max_level_cap: usize,
    /// Number of per-thread scratch slots to pre-allocate.
    pub max_threads: usize,
}

/// The layered proximity graph.
pub struct HnswGraph {
    vectors: Arc<dyn VectorSource>,
    metric: Metric,
    params: GraphParams,
    level_mult: f64,
    layers: RwLock<Vec<Layer>>,
    nodes: NodeTable,
    entry: EntryPoint,
    node_locks: NodeLocks,
    safety: Arc<SafetyCounters>,
    scratch: Vec<Mutex<ThreadScratch>>,
    prefetcher: Box<dyn Prefetcher>,
    count_present: AtomicUsize,
    count_deleted: AtomicUsize,
}

impl HnswGraph {
    /// Creates an empty graph backed by `vectors` for payload access.
    #[must_use]
    pub fn new(vectors: Arc<dyn VectorSource>, metric: Metric, params: GraphParams) -> Self {
        let safety = Arc::new(SafetyCounters::default());
        let scratch = (0..params.max_threads.max(1))
            .map(|i| Mutex::new(ThreadScratch::new(i as u64 + 1, params.expansion_search)))
            .collect();
        Self {
            vectors,
            metric,
            params,
            level_mult: level_multiplier(params.capacities.m),
            layers: RwLock::new(Vec::new()),
            nodes: NodeTable::new(),
            entry: EntryPoint::new(),
            node_locks: NodeLocks::with_capacity(0, Arc::clone(&safety)),
            safety,
            scratch,
            prefetcher: Box::new(DefaultPrefetcher),
            count_present: AtomicUsize::new(0),
            count_deleted: AtomicUsize::new(0),
        }
    }

    /// Number of live (non-tombstoned) nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count_present.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slots ever allocated, live or tombstoned.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn count_deleted(&self) -> usize {
        self.count_deleted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    #[must_use]
    pub fn is_tombstoned(&self, slot: Slot) -> bool {
        self.nodes.is_tombstoned(slot)
    }

    #[must_use]
    pub fn top_level_of(&self, slot: Slot) -> u16 {
        self.nodes.level(slot)
    }

    /// A snapshot of `slot`'s neighbor list at `level`, for inspection
    /// by tests and the `compact()` rebuild path.
    #[must_use]
    pub(crate) fn neighbors_at(&self, slot: Slot, level: usize) -> Vec<Slot> {
        self.layers
            .read()
            .get(level)
            .map_or_else(Vec::new, |l| l.get(slot))
    }

    /// Marks `slot` deleted. Returns `false` if already tombstoned.
    pub fn tombstone(&self, slot: Slot) -> bool {
        if self.nodes.set_tombstoned(slot) {
            return false;
        }
        self.count_present.fetch_sub(1, Ordering::Relaxed);
        self.count_deleted.fetch_add(1, Ordering::Relaxed);
        true
    }

    #[must_use]
    pub(crate) fn entry_point(&self) -> Option<(Slot, u16)> {
        self.entry.get()
    }

    unsafe fn distance_to(&self, query: *const u8, slot: Slot) -> f32 {
        self.metric.distance(query, self.vectors.vector_ptr(slot))
    }

    /// A snapshot of graph-level statistics for `stats()`.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        stats::collect(self)
    }
}
