//! Bulk node/edge installation used by the codec's `load` path:
//! reconstructs a graph directly from a deserialized node tape instead
//! of replaying individual inserts, so the loaded topology matches the
//! saved one exactly.

use std::sync::atomic::Ordering;

use crate::node::Slot;

use super::HnswGraph;

impl HnswGraph {
    /// Allocates the next slot with a known `top_level`/tombstone
    /// state, bypassing level sampling. Slots must be rebuilt in
    /// ascending order starting from 0 to match the codec's node tape.
    pub(crate) fn rebuild_node(&self, top_level: u16, tombstoned: bool) -> Slot {
        let slot = self.nodes.push(top_level);
        self.ensure_layers(slot, usize::from(top_level));
        self.node_locks.ensure_capacity(slot);
        if tombstoned {
            self.nodes.set_tombstoned(slot);
            self.count_deleted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.count_present.fetch_add(1, Ordering::Relaxed);
        }
        slot
    }

    /// Installs `slot`'s neighbor list at `level` verbatim, without
    /// re-running the diversity heuristic.
    pub(crate) fn rebuild_set_neighbors(&self, slot: Slot, level: usize, neighbors: Vec<Slot>) {
        let layers = self.layers.read();
        if let Some(layer) = layers.get(level) {
            layer.set(slot, neighbors);
        }
    }

    /// Unconditionally installs the entry point. The binary format
    /// does not persist one explicitly (`DESIGN.md`): the codec picks
    /// the loaded node with the highest `top_level`, ties broken by
    /// smallest slot, and calls this once after every node is rebuilt.
    pub(crate) fn rebuild_set_entry(&self, slot: Slot, level: u16) {
        self.entry.set_initial(slot, level);
    }
}
