//! Search primitives: greedy descent, bounded best-first expansion,
//! and the public top-k / exact query entry points.

use crate::container::topk::TopK;
use crate::container::Candidate;
use crate::error::{Error, Result};
use crate::node::Slot;

use super::{HnswGraph, ThreadScratch};

/// An optional filter applied while collecting level-0 results. The
/// same predicate is *not* applied to upper-layer routing or to
/// insertion's linking candidates — it only gates level-0 public
/// queries.
pub type Predicate<'a> = dyn Fn(Slot) -> bool + 'a;

impl HnswGraph {
    /// Greedy descent at `level`: repeatedly step to the neighbor of
    /// `start` strictly closer to `query_ptr`, stopping at the first
    /// local minimum.
    ///
    /// # Safety
    ///
    /// `query_ptr` must point at `dimensions` valid scalars of the
    /// graph's configured scalar kind.
    pub(super) unsafe fn search_one_in_level(
        &self,
        query_ptr: *const u8,
        start: Slot,
        level: usize,
    ) -> Slot {
        let mut current = start;
        let mut current_dist = self.distance_to(query_ptr, current);
        loop {
            let neighbors = {
                let layers = self.layers.read();
                layers.get(level).map_or_else(Vec::new, |l| l.get(current))
            };
            self.prefetch_neighbors(&neighbors);
            let mut improved = false;
            for n in neighbors {
                if !self.slot_valid(n) {
                    continue;
                }
                let d = self.distance_to(query_ptr, n);
                if d < current_dist {
                    current = n;
                    current_dist = d;
                    improved = true;
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Bounded best-first expansion at `level`, seeded from `starts`,
    /// returning up to `ef` candidates ascending by `(distance, slot)`.
    ///
    /// Reuses `scratch`'s frontier/top-k/visited-set so the call never
    /// allocates once the scratch has warmed up to its working size.
    ///
    /// # Safety
    ///
    /// `query_ptr` must point at `dimensions` valid scalars of the
    /// graph's configured scalar kind.
    pub(super) unsafe fn search_layer_bfs(
        &self,
        query_ptr: *const u8,
        starts: &[Slot],
        level: usize,
        ef: usize,
        predicate: Option<&Predicate<'_>>,
        scratch: &mut ThreadScratch,
    ) -> Vec<Candidate> {
        scratch.frontier.clear();
        scratch.visited.clear();
        scratch.visited.reserve(ef.max(16) * 4);
        scratch.top_k.reset(ef.max(1));

        for &start in starts {
            if !self.slot_valid(start) || scratch.visited.set(start) {
                continue;
            }
            let candidate = Candidate::new(self.distance_to(query_ptr, start), start);
            scratch.frontier.push(candidate);
            if predicate.map_or(true, |p| p(start)) {
                scratch.top_k.insert_with_limit(candidate);
            }
        }

        while let Some(nearest) = scratch.frontier.pop() {
            if scratch.top_k.is_full() {
                if let Some(worst) = scratch.top_k.worst() {
                    if nearest.distance > worst.distance {
                        break;
                    }
                }
            }

            let neighbors = {
                let layers = self.layers.read();
                layers.get(level).map_or_else(Vec::new, |l| l.get(nearest.slot))
            };
            self.prefetch_neighbors(&neighbors);

            for n in neighbors {
                if !self.slot_valid(n) || scratch.visited.set(n) {
                    continue;
                }
                let candidate = Candidate::new(self.distance_to(query_ptr, n), n);
                let worth_exploring = !scratch.top_k.is_full()
                    || scratch.top_k.worst().map_or(true, |worst| candidate < worst);
                if worth_exploring {
                    scratch.frontier.push(candidate);
                }
                if predicate.map_or(true, |p| p(n)) {
                    scratch.top_k.insert_with_limit(candidate);
                }
            }
        }

        scratch.top_k.to_sorted_vec()
    }

    /// Top-k query: greedy descent through every level above 0, then a
    /// bounded best-first expansion at level 0. Tombstoned nodes are
    /// filtered from the result but still traversed on the way there.
    ///
    /// # Safety
    ///
    /// `query_ptr` must point at `dimensions` valid scalars of the
    /// graph's configured scalar kind.
    pub unsafe fn search(
        &self,
        thread_id: usize,
        query_ptr: *const u8,
        k: usize,
        ef_search: Option<usize>,
        predicate: Option<&Predicate<'_>>,
    ) -> Result<Vec<Candidate>> {
        let scratch_idx = self.scratch_index(thread_id)?;
        let Some((entry_slot, entry_level)) = self.entry_point() else {
            return Ok(Vec::new());
        };

        let mut best = entry_slot;
        for level in (1..=usize::from(entry_level)).rev() {
            best = self.search_one_in_level(query_ptr, best, level);
        }

        let ef = ef_search.unwrap_or(self.params.expansion_search).max(k.max(1));
        let candidates = {
            let mut scratch = self.scratch[scratch_idx].lock();
            self.search_layer_bfs(query_ptr, &[best], 0, ef, predicate, &mut scratch)
        };

        let mut results: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !self.nodes.is_tombstoned(c.slot))
            .collect();
        results.truncate(k);
        Ok(results)
    }

    /// Brute-force top-k over every non-tombstoned slot, bypassing the
    /// graph entirely. Used for benchmarking and as the correctness
    /// oracle in recall tests.
    ///
    /// # Safety
    ///
    /// `query_ptr` must point at `dimensions` valid scalars of the
    /// graph's configured scalar kind.
    #[must_use]
    pub unsafe fn search_exact(
        &self,
        query_ptr: *const u8,
        k: usize,
        predicate: Option<&Predicate<'_>>,
    ) -> Vec<Candidate> {
        let mut top_k = TopK::new(k.max(1));
        let slot_count = self.nodes.len();
        for slot in 0..slot_count as u32 {
            if self.nodes.is_tombstoned(slot) {
                continue;
            }
            if predicate.is_some_and(|p| !p(slot)) {
                continue;
            }
            let distance = self.distance_to(query_ptr, slot);
            top_k.insert_with_limit(Candidate::new(distance, slot));
        }
        top_k.sort_ascending()
    }

    pub(super) fn scratch_index(&self, thread_id: usize) -> Result<usize> {
        if thread_id >= self.scratch.len() {
            return Err(Error::misconfiguration(format!(
                "thread_id {thread_id} out of range (max_threads = {})",
                self.scratch.len()
            )));
        }
        Ok(thread_id)
    }

    pub(super) fn slot_valid(&self, slot: Slot) -> bool {
        (slot as usize) < self.nodes.len()
    }

    pub(super) fn prefetch_neighbors(&self, neighbors: &[Slot]) {
        for &n in neighbors {
            if self.slot_valid(n) {
                self.prefetcher.hint(self.vectors.vector_ptr(n));
            }
        }
    }
}
