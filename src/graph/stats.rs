//! Graph-level statistics surface: nodes, per-level population, mean
//! out-degree, and the always-on safety counters. An observability
//! addition, not a correctness requirement.

use crate::safety::SafetySnapshot;

use super::HnswGraph;

/// Population and connectivity snapshot for a single layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStats {
    /// The layer this snapshot describes (0 = base layer).
    pub level: usize,
    /// Number of live and tombstoned nodes that participate in this
    /// layer (i.e. whose `top_level >= level`).
    pub node_count: usize,
    /// Mean neighbor-list length across `node_count` nodes at this
    /// layer.
    pub mean_out_degree: f64,
}

/// A point-in-time snapshot of graph health, returned by `stats()`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStats {
    /// Live (non-tombstoned) node count.
    pub nodes_present: usize,
    /// Tombstoned node count.
    pub nodes_deleted: usize,
    /// Per-layer population and connectivity, index 0 = base layer.
    pub levels: Vec<LevelStats>,
    /// Always-on concurrency anomaly counters.
    pub safety: SafetySnapshot,
}

pub(super) fn collect(graph: &HnswGraph) -> GraphStats {
    let layers = graph.layers.read();
    let slot_count = graph.nodes.len();
    let mut levels = Vec::with_capacity(layers.len());

    for (level, layer) in layers.iter().enumerate() {
        let mut node_count = 0usize;
        let mut total_degree = 0usize;
        #[allow(clippy::cast_possible_truncation)]
        for slot in 0..slot_count as u32 {
            if usize::from(graph.top_level_of(slot)) < level {
                continue;
            }
            node_count += 1;
            total_degree += layer.get(slot).len();
        }
        let mean_out_degree = if node_count == 0 {
            0.0
        } else {
            total_degree as f64 / node_count as f64
        };
        levels.push(LevelStats {
            level,
            node_count,
            mean_out_degree,
        });
    }

    GraphStats {
        nodes_present: graph.len(),
        nodes_deleted: graph.count_deleted(),
        levels,
        safety: graph.safety.snapshot(),
    }
}
