//! Shared scaffolding for the graph engine's unit tests: a trivial
//! append-only `f32` vector store implementing [`VectorSource`].

use std::sync::{Arc, Mutex};

use crate::metric::{Metric, MetricKind};
use crate::node::LevelCapacities;
use crate::scalar::ScalarKind;

use super::{GraphParams, HnswGraph, VectorSource};

/// An in-memory, fixed-capacity `f32` vector store. Capacity is
/// reserved up front so pushed vectors' pointers stay stable for the
/// lifetime of the test, matching the stability the real façade's
/// vectors buffer provides its own readers.
pub struct VecSource {
    dim: usize,
    data: Mutex<Vec<f32>>,
}

impl VecSource {
    pub fn with_capacity(dim: usize, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            dim,
            data: Mutex::new(Vec::with_capacity(capacity * dim)),
        })
    }

    /// Appends `vector`, returning the slot it was stored at.
    pub fn push(&self, vector: &[f32]) -> u32 {
        assert_eq!(vector.len(), self.dim);
        let mut data = self.data.lock().unwrap();
        assert!(
            data.len() + vector.len() <= data.capacity(),
            "test VecSource exceeded its reserved capacity"
        );
        let slot = (data.len() / self.dim) as u32;
        data.extend_from_slice(vector);
        slot
    }

    /// Writes `vector` at `slot`, growing to cover it if needed. Used
    /// by [`insert_vector`] to mirror the façade's write-after-insert
    /// ordering: the graph allocates the slot, the caller fills it in.
    pub fn set_at(&self, slot: u32, vector: &[f32]) {
        assert_eq!(vector.len(), self.dim);
        let mut data = self.data.lock().unwrap();
        let end = (slot as usize + 1) * self.dim;
        assert!(
            end <= data.capacity(),
            "test VecSource exceeded its reserved capacity"
        );
        if data.len() < end {
            data.resize(end, 0.0);
        }
        let start = slot as usize * self.dim;
        data[start..end].copy_from_slice(vector);
    }
}

impl VectorSource for VecSource {
    fn vector_ptr(&self, slot: u32) -> *const u8 {
        let data = self.data.lock().unwrap();
        let offset = slot as usize * self.dim;
        // SAFETY: test-only helper; `with_capacity` pre-reserves
        // enough room that `push` never reallocates, so this pointer
        // stays valid for the backing `Vec`'s lifetime.
        unsafe { data.as_ptr().add(offset).cast::<u8>() }
    }
}

/// Builds a small squared-L2 graph with a fixed-capacity vector store
/// for the tests in this module tree.
pub fn make_graph(
    dim: usize,
    capacity: usize,
    capacities: LevelCapacities,
    expansion_add: usize,
    expansion_search: usize,
    max_threads: usize,
) -> (HnswGraph, Arc<VecSource>) {
    let vectors = VecSource::with_capacity(dim, capacity);
    let metric = Metric::new(MetricKind::SquaredL2, ScalarKind::F32, dim).unwrap();
    let params = GraphParams {
        capacities,
        expansion_add,
        expansion_search,
        max_level_cap: 8,
        max_threads,
    };
    let graph = HnswGraph::new(vectors.clone(), metric, params);
    (graph, vectors)
}

/// Inserts `vector` under a freshly allocated slot on `thread_id`,
/// mirroring the dense façade's ownership split: the graph reserves
/// the slot, the vector store is filled in, and only then does the
/// graph link the slot into the graph — linking is what makes a slot
/// reachable from other nodes' back-edges, so it must not happen
/// before the payload exists.
///
/// # Safety
///
/// Caller must ensure `thread_id < max_threads` for `graph`.
pub unsafe fn insert_vector(
    graph: &HnswGraph,
    vectors: &VecSource,
    thread_id: usize,
    vector: &[f32],
) -> u32 {
    let reserved = graph.reserve_slot(thread_id).unwrap();
    vectors.set_at(reserved.slot, vector);
    let query_ptr = vector.as_ptr().cast::<u8>();
    let outcome = graph.link_slot(thread_id, reserved, query_ptr).unwrap();
    outcome.slot
}
