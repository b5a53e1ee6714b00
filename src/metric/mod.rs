//! Metric configuration and dispatch.
//!
//! A [`Metric`] resolves `(kind, scalar)` to a function pointer exactly
//! once, at index-creation time — there is no runtime inheritance or
//! virtual dispatch on the hot path. See [`kernels`] for the actual
//! distance computations.

mod kernels;

use crate::error::{Error, Result};
use crate::scalar::ScalarKind;

/// The family of distance function a metric computes.
///
/// Distance is always a signed scalar where lower means closer;
/// `Cosine` is reported as `1 - similarity` so every kind shares that
/// convention and the insertion/search code never special-cases sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MetricKind {
    /// Negative inner product (`-sum(a_i * b_i)`).
    InnerProduct = 0,
    /// `1 - cosine_similarity(a, b)`.
    Cosine = 1,
    /// Squared Euclidean distance.
    SquaredL2 = 2,
    /// Great-circle distance between two `(lat, lon)` pairs in degrees.
    Haversine = 3,
    /// Kullback-Leibler-style divergence between two distributions.
    Divergence = 4,
    /// `1 - Pearson correlation coefficient`.
    Pearson = 5,
    /// Hamming distance (bit or element mismatches).
    Hamming = 6,
    /// `1 - Tanimoto coefficient` over bit vectors.
    Tanimoto = 7,
    /// Sorensen-Dice distance over bit vectors.
    Sorensen = 8,
    /// Jaccard distance over bit vectors.
    Jaccard = 9,
}

impl MetricKind {
    /// Decodes a metric kind from its on-disk `u32` tag.
    pub fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            0 => Self::InnerProduct,
            1 => Self::Cosine,
            2 => Self::SquaredL2,
            3 => Self::Haversine,
            4 => Self::Divergence,
            5 => Self::Pearson,
            6 => Self::Hamming,
            7 => Self::Tanimoto,
            8 => Self::Sorensen,
            9 => Self::Jaccard,
            other => {
                return Err(Error::incompatible_format(format!(
                    "unknown metric tag {other}"
                )))
            }
        })
    }

    /// The on-disk `u32` tag for this metric kind.
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

/// Function-pointer signature every distance kernel implements.
///
/// `a` and `b` point at `dim` scalars of the configured [`ScalarKind`];
/// kernels read through raw pointers because the node tape and vector
/// buffer are not guaranteed to be aligned beyond their scalar width.
pub type DistanceFn = fn(a: *const u8, b: *const u8, dim: usize) -> f32;

/// Optional batch variant: one query against many candidate pointers.
pub type BatchDistanceFn = fn(q: *const u8, candidates: &[*const u8], dim: usize, out: &mut [f32]);

/// A resolved metric: a kind/scalar pair bound to a concrete kernel.
///
/// Cloning a `Metric` is cheap (two function pointers and a couple of
/// `Copy` enums); engines hold it by value.
#[derive(Clone, Copy)]
pub struct Metric {
    kind: MetricKind,
    scalar: ScalarKind,
    dimensions: usize,
    distance_fn: DistanceFn,
    batch_fn: Option<BatchDistanceFn>,
}

impl Metric {
    /// Resolves `(kind, scalar, dimensions)` to a kernel.
    ///
    /// Fails with [`Error::Misconfiguration`] when no kernel exists for
    /// the pair, or when `dimensions == 0`.
    pub fn new(kind: MetricKind, scalar: ScalarKind, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::misconfiguration("dimensions must be non-zero"));
        }
        let distance_fn = kernels::select(kind, scalar).ok_or_else(|| {
            Error::misconfiguration(format!("no kernel for ({kind:?}, {scalar:?})"))
        })?;
        Ok(Self {
            kind,
            scalar,
            dimensions,
            distance_fn,
            batch_fn: kernels::select_batch(kind, scalar),
        })
    }

    /// The metric kind this instance computes.
    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        self.kind
    }

    /// The scalar type this instance expects `a`/`b` to point at.
    #[must_use]
    pub const fn scalar(&self) -> ScalarKind {
        self.scalar
    }

    /// The configured vector dimensionality.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Computes the distance between two raw vector pointers.
    ///
    /// # Safety
    ///
    /// `a` and `b` must each point at `dimensions` valid, initialized
    /// scalars of `self.scalar()`'s width.
    #[inline]
    #[must_use]
    pub unsafe fn distance(&self, a: *const u8, b: *const u8) -> f32 {
        (self.distance_fn)(a, b, self.dimensions)
    }

    /// Computes distances from one query against many candidates,
    /// falling back to a per-candidate loop when no batch kernel is
    /// registered for this `(kind, scalar)`.
    ///
    /// # Safety
    ///
    /// `q` and every pointer in `candidates` must point at `dimensions`
    /// valid scalars of `self.scalar()`'s width.
    pub unsafe fn batch_distance(&self, q: *const u8, candidates: &[*const u8], out: &mut [f32]) {
        debug_assert_eq!(candidates.len(), out.len());
        if let Some(batch_fn) = self.batch_fn {
            batch_fn(q, candidates, self.dimensions, out);
            return;
        }
        for (c, slot) in candidates.iter().zip(out.iter_mut()) {
            *slot = (self.distance_fn)(q, *c, self.dimensions);
        }
    }
}

impl std::fmt::Debug for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metric")
            .field("kind", &self.kind)
            .field("scalar", &self.scalar)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}
