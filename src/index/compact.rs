//! Compaction: produces a fresh, tombstone-free index by walking live
//! `(key, slot)` pairs in slot order and reinserting each vector into
//! a new index.
//!
//! This rebuilds topology via fresh inserts rather than literally
//! relinking old edges under a slot remap; `DESIGN.md` records the
//! trade-off (simpler, but does not byte-for-byte preserve neighbor
//! lists — only the set of `(key, search result)` pairs, which is the
//! round-trip guarantee callers actually depend on).

use tracing::info;

use crate::error::Result;

use super::Index;

impl Index {
    /// Returns a new, tombstone-free index holding the same live
    /// `(key, vector)` pairs, reinserted in ascending slot order. The
    /// original index is unaffected.
    pub fn compact(&self) -> Result<Self> {
        let fresh = Self::open(self.options)?;

        let mut pairs = self.keys.iter_pairs();
        pairs.sort_by_key(|&(_, slot)| slot);

        let mut reinserted = 0usize;
        for (key, slot) in pairs {
            if self.graph.is_tombstoned(slot) {
                continue;
            }
            let vector = self.decode_slot(slot);
            fresh.add(0, key, &vector)?;
            reinserted += 1;
        }

        info!(reinserted, "compaction complete");
        Ok(fresh)
    }
}
