//! Façade-level statistics surface: the graph's own
//! [`crate::graph::GraphStats`] plus storage sizing the graph engine
//! has no visibility into.

use crate::graph::GraphStats;

use super::Index;

/// A point-in-time snapshot of index health and storage sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    /// Graph-level node population, per-layer connectivity, and safety
    /// counters.
    pub graph: GraphStats,
    /// Current vector-storage capacity before the next grow.
    pub capacity: usize,
    /// Total bytes currently allocated for vector payload storage.
    pub memory_usage: usize,
    /// Distinct keys currently registered (not slots — a key with
    /// several slots in multi-vector mode counts once).
    pub distinct_keys: usize,
}

pub(super) fn collect(index: &Index) -> IndexStats {
    let pairs = index.keys.iter_pairs();
    let distinct_keys: std::collections::HashSet<u64> = pairs.iter().map(|&(k, _)| k).collect();
    IndexStats {
        graph: index.graph.stats(),
        capacity: index.vectors.capacity(),
        memory_usage: index.vectors.memory_usage(),
        distinct_keys: distinct_keys.len(),
    }
}
