//! `hnsw-core`: an embeddable approximate-nearest-neighbor search
//! engine over dense fixed-dimensional vectors, built on HNSW
//! (Hierarchical Navigable Small World).
//!
//! The crate is organized in three subsystems, each owning a distinct
//! slice of the design:
//!
//! - [`graph`] — the proximity graph itself: layered adjacency,
//!   concurrent insertion, and bounded best-first search.
//! - [`index`] — the dense-vector façade on top of the graph: vector
//!   payload storage, key↔slot mapping, duplicate-key policy, scalar
//!   conversion, and the binary codec (save/load/view).
//! - [`metric`] — `(kind, scalar)` distance-kernel dispatch, resolved
//!   once at index-open time.
//!
//! [`container`], [`node`], [`locks`], [`rng`], [`prefetch`],
//! [`safety`], [`scalar`], and [`error`] are shared infrastructure
//! those three subsystems build on.
//!
//! ```
//! use hnsw_core::{Index, IndexOptions, MetricKind};
//!
//! let index = Index::open(IndexOptions::new(3, MetricKind::SquaredL2)).unwrap();
//! index.add(0, 1, &[0.0, 0.0, 0.0]).unwrap();
//! index.add(0, 2, &[1.0, 1.0, 1.0]).unwrap();
//!
//! let results = index.search(0, &[0.0, 0.0, 0.1], 1, None, None).unwrap();
//! assert_eq!(results[0].0, 1);
//! ```

pub mod container;
#[cfg(feature = "config")]
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod locks;
pub mod metric;
pub mod node;
pub mod prefetch;
pub mod rng;
pub mod safety;
pub mod scalar;

#[cfg(feature = "config")]
pub use config::{ConfigError, RuntimeConfig};
pub use error::{Error, Result};
pub use graph::{GraphStats, LevelStats, Predicate};
pub use index::{AddOutcome, DuplicatePolicy, Index, IndexOptions, IndexStats, LoadLimits};
pub use metric::MetricKind;
pub use node::Slot;
pub use safety::{SafetyCounters, SafetySnapshot};
pub use scalar::ScalarKind;
