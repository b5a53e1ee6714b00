//! Neighbor selection heuristic and bidirectional edge installation.

use crate::container::Candidate;
use crate::node::Slot;

use super::HnswGraph;

impl HnswGraph {
    /// The standard HNSW diversity-preserving heuristic: greedily keep
    /// a candidate only if it is closer to every already-selected
    /// neighbor than that neighbor is to the query, which avoids
    /// clustering all of a node's edges around one nearby group.
    ///
    /// Each candidate's distance to the query point it was gathered
    /// against — the new node during insertion, or an existing node's
    /// own vector when pruning its overfull list — is already baked
    /// into `candidate.distance`, so no query pointer is needed here.
    pub(super) fn select_neighbors(
        &self,
        mut candidates: Vec<Candidate>,
        capacity: usize,
    ) -> Vec<Candidate> {
        candidates.sort_unstable();
        let mut selected: Vec<Candidate> = Vec::with_capacity(capacity);
        let mut leftover: Vec<Candidate> = Vec::new();

        for candidate in candidates {
            if selected.len() == capacity {
                break;
            }
            // SAFETY: vector pointers come from the façade's vector
            // store and remain valid for the slot's lifetime.
            let keeps_diversity = selected.iter().all(|&s| unsafe {
                let dist_c_s = self.distance_to(self.vectors.vector_ptr(candidate.slot), s.slot);
                dist_c_s > candidate.distance
            });
            if keeps_diversity {
                selected.push(candidate);
            } else {
                leftover.push(candidate);
            }
        }

        if selected.len() < capacity {
            for candidate in leftover {
                if selected.len() == capacity {
                    break;
                }
                selected.push(candidate);
            }
        }
        selected
    }

    /// Installs `new_slot <-> neighbor` at level `ell`, pruning
    /// `neighbor`'s list back to capacity if it overflows.
    pub(super) fn add_bidirectional_connection(
        &self,
        new_slot: Slot,
        neighbor: Slot,
        ell: usize,
        capacity: usize,
    ) {
        let (_first, _second) = self.node_locks.lock_pair(new_slot, neighbor);

        let layers = self.layers.read();
        let Some(layer) = layers.get(ell) else {
            return;
        };

        let mut forward = layer.get(new_slot);
        if !forward.contains(&neighbor) {
            forward.push(neighbor);
            layer.set(new_slot, forward);
        }

        let mut back = layer.get(neighbor);
        if back.contains(&new_slot) {
            return;
        }
        back.push(new_slot);
        if back.len() > capacity {
            let candidates: Vec<Candidate> = back
                .iter()
                .map(|&s| {
                    // SAFETY: both pointers come from the façade's live
                    // vector store.
                    let distance = unsafe {
                        self.distance_to(self.vectors.vector_ptr(neighbor), s)
                    };
                    Candidate::new(distance, s)
                })
                .collect();
            let pruned = self.select_neighbors(candidates, capacity);
            back = pruned.into_iter().map(|c| c.slot).collect();
        }
        layer.set(neighbor, back);
    }
}
