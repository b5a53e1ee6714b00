//! Insertion algorithm: level sampling, entry-point descent, neighbor
//! selection, back-linking, and entry-point raise.
//!
//! Insertion is split into [`HnswGraph::reserve_slot`] and
//! [`HnswGraph::link_slot`] rather than one call, so the dense façade
//! can write the new node's vector payload in between. `link_slot`
//! installs the back-edges that make a slot reachable from existing
//! nodes; if the payload were not yet written when that happens, a
//! concurrent reader following one of those edges straight into
//! `VectorSource::vector_ptr` would race the façade's write, or — if
//! the slot lands on a not-yet-allocated storage segment — index out
//! of bounds. Reserving first and linking only after the façade
//! confirms the payload is in place closes that window.

use std::sync::atomic::Ordering;

use crate::node::Slot;
use crate::rng::sample_level;

use super::HnswGraph;

/// Outcome of a successful `add` at the graph layer. The dense façade
/// wraps this with the caller's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// The slot the new node was stored at.
    pub slot: Slot,
    /// Always `true` for the graph layer — insertion either succeeds
    /// or returns an error; the façade's duplicate-key policy is what
    /// can turn an `add` into a no-op above this layer.
    pub added: bool,
}

/// A freshly allocated, not-yet-linked slot: the new node exists in
/// the node table (sampled level, layer adjacency storage, a lock
/// bit), but no other node references it yet. The façade must write
/// the slot's vector payload before passing this to
/// [`HnswGraph::link_slot`].
#[derive(Debug, Clone, Copy)]
pub struct ReservedSlot {
    /// The slot the new node was stored at.
    pub slot: Slot,
    /// The new node's sampled top level.
    pub top_level: u16,
}

impl HnswGraph {
    /// Samples a level and allocates a slot for a new node, without
    /// making it reachable from any existing node. The façade must
    /// write the slot's vector payload before calling
    /// [`HnswGraph::link_slot`] with the result.
    ///
    /// `thread_id` selects the per-thread scratch used for level
    /// sampling.
    pub fn reserve_slot(&self, thread_id: usize) -> crate::error::Result<ReservedSlot> {
        let scratch_idx = self.scratch_index(thread_id)?;

        let top_level = {
            let mut scratch = self.scratch[scratch_idx].lock();
            sample_level(&mut scratch.rng, self.level_mult, self.params.max_level_cap)
        };
        #[allow(clippy::cast_possible_truncation)]
        let top_level_u16 = top_level as u16;

        let slot = self.nodes.push(top_level_u16);
        self.ensure_layers(slot, top_level);
        self.node_locks.ensure_capacity(slot);

        Ok(ReservedSlot {
            slot,
            top_level: top_level_u16,
        })
    }

    /// Descends from the current entry point, selects and installs
    /// bidirectional edges at every applicable level for `reserved`,
    /// and raises the entry point if it reaches higher than the
    /// current one.
    ///
    /// `query_ptr` points at `reserved.slot`'s own vector. Callers
    /// must have already written that slot's payload into storage —
    /// see the module doc comment for why. `thread_id` must be the
    /// same value passed to the `reserve_slot` call that produced
    /// `reserved`.
    ///
    /// # Safety
    ///
    /// `query_ptr` must point at `dimensions` valid scalars of the
    /// graph's configured scalar kind and remain valid for the
    /// duration of this call.
    pub unsafe fn link_slot(
        &self,
        thread_id: usize,
        reserved: ReservedSlot,
        query_ptr: *const u8,
    ) -> crate::error::Result<InsertOutcome> {
        let scratch_idx = self.scratch_index(thread_id)?;
        let ReservedSlot { slot, top_level: top_level_u16 } = reserved;
        let top_level = usize::from(top_level_u16);

        let Some((entry_slot, entry_level)) = self.entry_point() else {
            self.entry.set_initial(slot, top_level_u16);
            self.count_present.fetch_add(1, Ordering::Relaxed);
            return Ok(InsertOutcome { slot, added: true });
        };

        // Step 4: descend greedily through every level strictly above
        // the new node's sampled level.
        let mut best = entry_slot;
        if usize::from(entry_level) > top_level {
            for level in (top_level + 1..=usize::from(entry_level)).rev() {
                best = self.search_one_in_level(query_ptr, best, level);
            }
        }

        // Step 5: link at every level from min(top_level, entry_level)
        // down to 0, nearest-first.
        let link_from = top_level.min(usize::from(entry_level));
        for level in (0..=link_from).rev() {
            let capacity = self.params.capacities.at(level);
            let ef = self.params.expansion_add.max(capacity);
            let candidates = {
                let mut scratch = self.scratch[scratch_idx].lock();
                self.search_layer_bfs(query_ptr, &[best], level, ef, None, &mut scratch)
            };
            let selected = self.select_neighbors(candidates, capacity);
            if let Some(nearest) = selected.first() {
                best = nearest.slot;
            }
            for candidate in &selected {
                self.add_bidirectional_connection(slot, candidate.slot, level, capacity);
            }
        }

        // Step 6: raise the entry point if this node reaches higher
        // than the current one. A CAS race with a concurrent insert
        // sampling an even higher level is resolved by `raise` itself.
        self.entry.raise(slot, top_level_u16, &self.safety);
        self.count_present.fetch_add(1, Ordering::Relaxed);
        Ok(InsertOutcome { slot, added: true })
    }

    /// Grows the layer table to cover `top_level` and ensures every
    /// level from 0 to `top_level` has adjacency storage reserved for
    /// `slot` (layers above a node's `top_level` never reference it).
    pub(super) fn ensure_layers(&self, slot: Slot, top_level: usize) {
        let mut layers = self.layers.write();
        while layers.len() <= top_level {
            layers.push(super::Layer::new());
        }
        for layer in layers.iter_mut().take(top_level + 1) {
            layer.ensure_capacity(slot);
        }
    }
}
