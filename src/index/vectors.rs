//! The façade's vector payload store: a chunked
//! `bytes[capacity · bytes_per_vector]` buffer grown in geometric
//! steps, or a read-only alias over externally mapped bytes in view
//! mode.
//!
//! Storage is split into fixed-size segments rather than one flat
//! `Vec<u8>` so that growing the store never moves an already-written
//! vector: [`VectorSource::vector_ptr`] promises its pointer stays
//! valid "until `compact()` remaps it", which a reallocating buffer
//! could not honor while a reader holds the pointer across a
//! concurrent `add`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::graph::VectorSource;
use crate::node::Slot;
use crate::scalar::ScalarKind;

/// Vectors per segment. Each segment is allocated once, fully
/// zeroed, and never resized — only appended slot writes land inside
/// it — so its address is stable for the store's lifetime.
const SEGMENT_VECTORS: usize = 1024;

enum Backing {
    /// Mutable, owned storage, grown one segment at a time under
    /// `segments`'s write lock (lock-rank order: vectors-buffer mutex
    /// < key-map mutex < node spinlocks).
    Owned(RwLock<Vec<Box<[u8]>>>),
    /// Read-only alias into caller-provided bytes (`view` mode): a
    /// shared handle over the whole mapped file plus the byte offset
    /// where the vector payload begins, so constructing a view never
    /// copies the payload out of the caller's mapping.
    Mapped { bytes: Arc<[u8]>, payload_offset: usize },
}

/// Owns the raw vector payload for every slot. Implements
/// [`VectorSource`] so the graph engine can read through it without
/// knowing about scalar kinds or storage layout.
pub struct VectorStore {
    dim: usize,
    scalar_kind: ScalarKind,
    bytes_per_vector: usize,
    backing: Backing,
}

impl VectorStore {
    pub(super) fn with_capacity(dim: usize, scalar_kind: ScalarKind, capacity: usize) -> Self {
        let bytes_per_vector = scalar_kind.bytes_per_vector(dim);
        let initial_segments = capacity.div_ceil(SEGMENT_VECTORS).max(1);
        let segments = (0..initial_segments)
            .map(|_| vec![0u8; SEGMENT_VECTORS * bytes_per_vector].into_boxed_slice())
            .collect();
        Self {
            dim,
            scalar_kind,
            bytes_per_vector,
            backing: Backing::Owned(RwLock::new(segments)),
        }
    }

    /// Wraps an externally owned, already mapped byte buffer. `bytes`
    /// is the whole file (or whatever range the caller mapped);
    /// `payload_offset` is where the vector payload begins within it.
    /// Never copies `bytes`.
    pub(super) fn mapped(
        dim: usize,
        scalar_kind: ScalarKind,
        bytes: Arc<[u8]>,
        payload_offset: usize,
    ) -> Self {
        let bytes_per_vector = scalar_kind.bytes_per_vector(dim);
        Self {
            dim,
            scalar_kind,
            bytes_per_vector,
            backing: Backing::Mapped {
                bytes,
                payload_offset,
            },
        }
    }

    pub(super) const fn dim(&self) -> usize {
        self.dim
    }

    pub(super) const fn scalar_kind(&self) -> ScalarKind {
        self.scalar_kind
    }

    pub(super) const fn bytes_per_vector(&self) -> usize {
        self.bytes_per_vector
    }

    pub(super) fn is_mutable(&self) -> bool {
        matches!(self.backing, Backing::Owned(_))
    }

    /// Current slot capacity (how many vectors fit before a grow).
    pub(super) fn capacity(&self) -> usize {
        match &self.backing {
            Backing::Owned(segments) => segments.read().len() * SEGMENT_VECTORS,
            Backing::Mapped {
                bytes,
                payload_offset,
            } => (bytes.len() - payload_offset) / self.bytes_per_vector.max(1),
        }
    }

    /// Total bytes currently allocated for the vector payload.
    pub(super) fn memory_usage(&self) -> usize {
        match &self.backing {
            Backing::Owned(segments) => {
                segments.read().len() * SEGMENT_VECTORS * self.bytes_per_vector
            }
            Backing::Mapped {
                bytes,
                payload_offset,
            } => bytes.len() - payload_offset,
        }
    }

    fn segment_index(slot: Slot) -> usize {
        slot as usize / SEGMENT_VECTORS
    }

    fn offset_in_segment(&self, slot: Slot) -> usize {
        (slot as usize % SEGMENT_VECTORS) * self.bytes_per_vector
    }

    /// Grows the owned store with fresh segments so `slot` has room.
    pub(super) fn ensure_capacity(&self, slot: Slot) -> Result<()> {
        let Backing::Owned(segments) = &self.backing else {
            return Err(Error::Immutable);
        };
        let needed = Self::segment_index(slot) + 1;
        let mut segments = segments.write();
        while segments.len() < needed {
            segments.push(vec![0u8; SEGMENT_VECTORS * self.bytes_per_vector].into_boxed_slice());
        }
        Ok(())
    }

    /// Writes `bytes` (already converted to this store's scalar kind)
    /// at `slot`. Caller must have already called `ensure_capacity`.
    ///
    /// Safe to call concurrently for distinct slots: slot allocation
    /// is unique per insertion, so no two callers ever target the same
    /// byte range, and a slot only becomes visible to other readers
    /// (via the key map / graph) after this write completes.
    pub(super) fn write_at(&self, slot: Slot, bytes: &[u8]) -> Result<()> {
        let Backing::Owned(segments) = &self.backing else {
            return Err(Error::Immutable);
        };
        debug_assert_eq!(bytes.len(), self.bytes_per_vector);
        let seg_idx = Self::segment_index(slot);
        let offset = self.offset_in_segment(slot);
        let segments = segments.read();
        let segment = segments
            .get(seg_idx)
            .expect("ensure_capacity must be called before write_at");
        // SAFETY: see doc comment above; writes to disjoint slots
        // never alias, and this segment's allocation never moves.
        unsafe {
            let ptr = segment.as_ptr().add(offset).cast_mut();
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
        }
        Ok(())
    }

    /// Copies out the raw stored bytes for `slot` (not yet decoded to `f32`).
    pub(super) fn read_at(&self, slot: Slot) -> Vec<u8> {
        match &self.backing {
            Backing::Owned(segments) => {
                let seg_idx = Self::segment_index(slot);
                let offset = self.offset_in_segment(slot);
                let segments = segments.read();
                segments[seg_idx][offset..offset + self.bytes_per_vector].to_vec()
            }
            Backing::Mapped {
                bytes,
                payload_offset,
            } => {
                let start = payload_offset + slot as usize * self.bytes_per_vector;
                bytes[start..start + self.bytes_per_vector].to_vec()
            }
        }
    }

    /// A contiguous snapshot of `slot_count` vectors' raw bytes, in
    /// slot order, for `save`/`compact`.
    pub(super) fn raw_bytes(&self, slot_count: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(slot_count * self.bytes_per_vector);
        #[allow(clippy::cast_possible_truncation)]
        for slot in 0..slot_count as u32 {
            out.extend_from_slice(&self.read_at(slot));
        }
        out
    }
}

impl VectorSource for VectorStore {
    fn vector_ptr(&self, slot: Slot) -> *const u8 {
        match &self.backing {
            Backing::Owned(segments) => {
                let seg_idx = Self::segment_index(slot);
                let offset = self.offset_in_segment(slot);
                let segments = segments.read();
                // SAFETY: the returned pointer outlives this read
                // lock because the segment's `Box<[u8]>` allocation is
                // never moved or freed while `self` lives — appending
                // new segments never touches existing ones.
                unsafe { segments[seg_idx].as_ptr().add(offset) }
            }
            Backing::Mapped {
                bytes,
                payload_offset,
            } => {
                let offset = payload_offset + slot as usize * self.bytes_per_vector;
                // SAFETY: `bytes` is immutable for the lifetime of `self`.
                unsafe { bytes.as_ptr().add(offset) }
            }
        }
    }
}
