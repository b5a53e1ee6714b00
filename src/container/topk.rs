//! The k-limited ascending result buffer ("top-k buffer" in the
//! glossary): holds at most `k` candidates, always the k smallest seen
//! so far by distance.

use std::collections::BinaryHeap;

use super::Candidate;

/// A k-limited buffer of `(distance, slot)` candidates.
///
/// Internally a max-heap so the current worst member — the one to
/// evict when a better candidate arrives — is always at the top in
/// O(1); `sort_ascending` drains it into the public ascending order.
#[derive(Debug)]
pub struct TopK {
    limit: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopK {
    /// Creates a buffer bounded to `limit` entries (`limit == 0` means
    /// "unbounded", used by the exact brute-force search path).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit.max(1)),
        }
    }

    /// Resets the buffer to a new limit, reusing its allocation.
    pub fn reset(&mut self, limit: usize) {
        self.limit = limit;
        self.heap.clear();
    }

    /// Number of candidates currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the buffer is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.limit != 0 && self.heap.len() >= self.limit
    }

    /// The current worst (largest-distance) member, if any.
    #[must_use]
    pub fn worst(&self) -> Option<Candidate> {
        self.heap.peek().copied()
    }

    /// Inserts `candidate` if the buffer has room or it beats the
    /// current worst member. Returns `true` if the candidate was kept.
    pub fn insert_with_limit(&mut self, candidate: Candidate) -> bool {
        if self.limit == 0 {
            self.heap.push(candidate);
            return true;
        }
        if self.heap.len() < self.limit {
            self.heap.push(candidate);
            return true;
        }
        if let Some(worst) = self.heap.peek().copied() {
            if candidate < worst {
                self.heap.pop();
                self.heap.push(candidate);
                return true;
            }
        }
        false
    }

    /// Drains the buffer into ascending order by `(distance, slot)`.
    #[must_use]
    pub fn sort_ascending(self) -> Vec<Candidate> {
        let mut v: Vec<Candidate> = self.heap.into_vec();
        v.sort_unstable();
        v
    }

    /// Same as [`Self::sort_ascending`] but without consuming the
    /// buffer, so per-thread scratch can be read back out and reused
    /// across calls instead of being rebuilt every time.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<Candidate> {
        let mut v: Vec<Candidate> = self.heap.clone().into_vec();
        v.sort_unstable();
        v
    }
}
