//! Index construction options for `open`/`reserve`.

use crate::metric::MetricKind;
use crate::node::LevelCapacities;
use crate::scalar::ScalarKind;

/// What happens when `add` sees a key that already exists, in
/// single-vector mode. Multi-vector mode ignores this entirely — every
/// `add` appends another slot under the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail the `add` with [`crate::error::Error::DuplicateKey`].
    Reject,
    /// Tombstone the existing slot(s), then insert as normal.
    Overwrite,
    /// Behave as if multi-vector mode were enabled for this key.
    MultiAppend,
}

/// Builder for [`crate::index::Index::open`].
///
/// Plain data, a `Default`-free builder with named setters, validated
/// once at `open` time rather than on every field assignment.
#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    pub(crate) dimensions: usize,
    pub(crate) metric_kind: MetricKind,
    pub(crate) scalar_kind: ScalarKind,
    pub(crate) capacities: LevelCapacities,
    pub(crate) expansion_add: usize,
    pub(crate) expansion_search: usize,
    pub(crate) max_level_cap: usize,
    pub(crate) max_threads: usize,
    pub(crate) multi: bool,
    pub(crate) duplicate_policy: DuplicatePolicy,
}

impl IndexOptions {
    /// Starts a builder for a `dimensions`-wide index under `metric_kind`.
    #[must_use]
    pub const fn new(dimensions: usize, metric_kind: MetricKind) -> Self {
        Self {
            dimensions,
            metric_kind,
            scalar_kind: ScalarKind::F32,
            capacities: LevelCapacities { m0: 32, m: 16 },
            expansion_add: 128,
            expansion_search: 64,
            max_level_cap: 24,
            max_threads: 1,
            multi: false,
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }

    /// Sets the storage scalar kind (default `F32`).
    #[must_use]
    pub const fn scalar_kind(mut self, scalar_kind: ScalarKind) -> Self {
        self.scalar_kind = scalar_kind;
        self
    }

    /// Sets neighbor-list capacities `M` (above level 0) and `M0`
    /// (level 0). Default `M=16, M0=32`.
    #[must_use]
    pub const fn connectivity(mut self, m: usize, m0: usize) -> Self {
        self.capacities = LevelCapacities { m0, m };
        self
    }

    /// Sets the candidate-set size used while linking during insertion
    /// (default 128).
    #[must_use]
    pub const fn expansion_add(mut self, expansion_add: usize) -> Self {
        self.expansion_add = expansion_add;
        self
    }

    /// Sets the default candidate-set size used during search (default 64).
    #[must_use]
    pub const fn expansion_search(mut self, expansion_search: usize) -> Self {
        self.expansion_search = expansion_search;
        self
    }

    /// Caps the sampled level height (default 24).
    #[must_use]
    pub const fn max_level_cap(mut self, max_level_cap: usize) -> Self {
        self.max_level_cap = max_level_cap;
        self
    }

    /// Number of concurrent callers, each identified by a `thread_id`
    /// in `[0, max_threads)` (default 1).
    #[must_use]
    pub const fn max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Enables multi-vector mode: every `add` under a key appends
    /// another slot rather than being subject to `duplicate_policy`.
    #[must_use]
    pub const fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    /// Sets the single-vector-mode duplicate-key policy (default `Reject`).
    #[must_use]
    pub const fn duplicate_policy(mut self, duplicate_policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = duplicate_policy;
        self
    }
}
