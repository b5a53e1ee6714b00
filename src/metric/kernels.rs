//! Concrete distance kernels.
//!
//! `f32` and the bit-packed `b1x8` kind get direct kernels that read
//! straight off the raw pointers; every other scalar kind goes through
//! a decode-to-`f32` fallback built on [`crate::scalar::decode`]. Only
//! the three "numeric" metrics (inner product, cosine, squared L2) are
//! wired up for the narrower scalar kinds — `Haversine`, `Divergence`,
//! and `Pearson` are geography/statistics-flavored metrics that this
//! crate only supports at full `f32` precision. Every other pairing
//! simply has no registered kernel, which is the intended way
//! `Metric::new` reports `Misconfiguration`.

use super::{BatchDistanceFn, DistanceFn, MetricKind, ScalarKind};
use crate::scalar;

pub(super) fn select(kind: MetricKind, scalar: ScalarKind) -> Option<DistanceFn> {
    use MetricKind::{
        Cosine, Divergence, Hamming, Haversine, InnerProduct, Jaccard, Pearson, Sorensen,
        SquaredL2, Tanimoto,
    };
    use ScalarKind::{B1X8, BF16, F16, F32, F64, I8};

    Some(match (kind, scalar) {
        (InnerProduct, F32) => inner_product_f32,
        (Cosine, F32) => cosine_f32,
        (SquaredL2, F32) => squared_l2_f32,
        (Haversine, F32) => haversine_f32,
        (Divergence, F32) => divergence_f32,
        (Pearson, F32) => pearson_f32,

        (InnerProduct, F64) => inner_product_f64,
        (Cosine, F64) => cosine_f64,
        (SquaredL2, F64) => squared_l2_f64,

        (InnerProduct, F16) => inner_product_f16,
        (Cosine, F16) => cosine_f16,
        (SquaredL2, F16) => squared_l2_f16,

        (InnerProduct, BF16) => inner_product_bf16,
        (Cosine, BF16) => cosine_bf16,
        (SquaredL2, BF16) => squared_l2_bf16,

        (InnerProduct, I8) => inner_product_i8,
        (Cosine, I8) => cosine_i8,
        (SquaredL2, I8) => squared_l2_i8,

        (Hamming, B1X8) => hamming_b1x8,
        (Tanimoto, B1X8) => tanimoto_b1x8,
        (Sorensen, B1X8) => sorensen_b1x8,
        (Jaccard, B1X8) => jaccard_b1x8,

        _ => return None,
    })
}

pub(super) fn select_batch(_kind: MetricKind, _scalar: ScalarKind) -> Option<BatchDistanceFn> {
    // No specialized batch kernels yet; `Metric::batch_distance` falls
    // back to looping the scalar kernel, which is correct in all cases.
    None
}

#[inline]
unsafe fn load_f32(ptr: *const u8, i: usize) -> f32 {
    std::ptr::read_unaligned(ptr.add(i * 4).cast::<f32>())
}

fn inner_product_f32(a: *const u8, b: *const u8, dim: usize) -> f32 {
    let mut acc = 0.0_f32;
    for i in 0..dim {
        unsafe { acc += load_f32(a, i) * load_f32(b, i) };
    }
    -acc
}

fn squared_l2_f32(a: *const u8, b: *const u8, dim: usize) -> f32 {
    let mut acc = 0.0_f32;
    for i in 0..dim {
        unsafe {
            let d = load_f32(a, i) - load_f32(b, i);
            acc += d * d;
        }
    }
    acc
}

fn cosine_f32(a: *const u8, b: *const u8, dim: usize) -> f32 {
    let (mut dot, mut na, mut nb) = (0.0_f32, 0.0_f32, 0.0_f32);
    for i in 0..dim {
        unsafe {
            let (x, y) = (load_f32(a, i), load_f32(b, i));
            dot += x * y;
            na += x * x;
            nb += y * y;
        }
    }
    cosine_from_parts(dot, na, nb)
}

fn cosine_from_parts(dot: f32, na: f32, nb: f32) -> f32 {
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 1.0;
    }
    (1.0 - dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 2.0)
}

fn haversine_f32(a: *const u8, b: *const u8, _dim: usize) -> f32 {
    // a/b are (lat, lon) pairs in degrees; returns distance in radians
    // on the unit sphere, leaving scaling by the actual earth radius to
    // the caller.
    unsafe {
        let (lat1, lon1) = (load_f32(a, 0).to_radians(), load_f32(a, 1).to_radians());
        let (lat2, lon2) = (load_f32(b, 0).to_radians(), load_f32(b, 1).to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let h = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * h.sqrt().asin()
    }
}

fn divergence_f32(a: *const u8, b: *const u8, dim: usize) -> f32 {
    let mut acc = 0.0_f32;
    for i in 0..dim {
        unsafe {
            let (x, y) = (load_f32(a, i).max(1e-12), load_f32(b, i).max(1e-12));
            acc += x * (x / y).ln();
        }
    }
    acc
}

fn pearson_f32(a: *const u8, b: *const u8, dim: usize) -> f32 {
    let n = dim as f32;
    let (mut sa, mut sb) = (0.0_f32, 0.0_f32);
    for i in 0..dim {
        unsafe {
            sa += load_f32(a, i);
            sb += load_f32(b, i);
        }
    }
    let (ma, mb) = (sa / n, sb / n);
    let (mut cov, mut va, mut vb) = (0.0_f32, 0.0_f32, 0.0_f32);
    for i in 0..dim {
        unsafe {
            let (x, y) = (load_f32(a, i) - ma, load_f32(b, i) - mb);
            cov += x * y;
            va += x * x;
            vb += y * y;
        }
    }
    if va <= f32::EPSILON || vb <= f32::EPSILON {
        return 1.0;
    }
    (1.0 - cov / (va.sqrt() * vb.sqrt())).clamp(0.0, 2.0)
}

/// Generates a decode-then-compute kernel for `$scalar_kind` built on
/// a `Vec<f32>`-based numeric core.
macro_rules! decoded_kernel {
    ($name:ident, $scalar_kind:expr, $core:expr) => {
        fn $name(a: *const u8, b: *const u8, dim: usize) -> f32 {
            let byte_len = $scalar_kind.bytes_per_vector(dim);
            // SAFETY: caller guarantees `a`/`b` point at `byte_len`
            // valid, initialized bytes of the configured scalar kind.
            let (a_bytes, b_bytes) = unsafe {
                (
                    std::slice::from_raw_parts(a, byte_len),
                    std::slice::from_raw_parts(b, byte_len),
                )
            };
            let av = scalar::decode($scalar_kind, dim, a_bytes);
            let bv = scalar::decode($scalar_kind, dim, b_bytes);
            $core(&av, &bv)
        }
    };
}

fn inner_product_core(a: &[f32], b: &[f32]) -> f32 {
    -a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>()
}

fn squared_l2_core(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn cosine_core(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum();
    let nb: f32 = b.iter().map(|y| y * y).sum();
    cosine_from_parts(dot, na, nb)
}

decoded_kernel!(inner_product_f64, ScalarKind::F64, inner_product_core);
decoded_kernel!(squared_l2_f64, ScalarKind::F64, squared_l2_core);
decoded_kernel!(cosine_f64, ScalarKind::F64, cosine_core);

decoded_kernel!(inner_product_f16, ScalarKind::F16, inner_product_core);
decoded_kernel!(squared_l2_f16, ScalarKind::F16, squared_l2_core);
decoded_kernel!(cosine_f16, ScalarKind::F16, cosine_core);

decoded_kernel!(inner_product_bf16, ScalarKind::BF16, inner_product_core);
decoded_kernel!(squared_l2_bf16, ScalarKind::BF16, squared_l2_core);
decoded_kernel!(cosine_bf16, ScalarKind::BF16, cosine_core);

decoded_kernel!(inner_product_i8, ScalarKind::I8, inner_product_core);
decoded_kernel!(squared_l2_i8, ScalarKind::I8, squared_l2_core);
decoded_kernel!(cosine_i8, ScalarKind::I8, cosine_core);

fn popcount_u8(b: u8) -> u32 {
    b.count_ones()
}

fn hamming_b1x8(a: *const u8, b: *const u8, dim: usize) -> f32 {
    let bytes = dim.div_ceil(8);
    let mut acc = 0_u32;
    for i in 0..bytes {
        unsafe {
            let (x, y) = (*a.add(i), *b.add(i));
            acc += popcount_u8(x ^ y);
        }
    }
    acc as f32
}

fn tanimoto_b1x8(a: *const u8, b: *const u8, dim: usize) -> f32 {
    let bytes = dim.div_ceil(8);
    let (mut inter, mut union) = (0_u32, 0_u32);
    for i in 0..bytes {
        unsafe {
            let (x, y) = (*a.add(i), *b.add(i));
            inter += popcount_u8(x & y);
            union += popcount_u8(x | y);
        }
    }
    if union == 0 {
        return 0.0;
    }
    1.0 - (inter as f32 / union as f32)
}

fn sorensen_b1x8(a: *const u8, b: *const u8, dim: usize) -> f32 {
    let bytes = dim.div_ceil(8);
    let (mut inter, mut count_a, mut count_b) = (0_u32, 0_u32, 0_u32);
    for i in 0..bytes {
        unsafe {
            let (x, y) = (*a.add(i), *b.add(i));
            inter += popcount_u8(x & y);
            count_a += popcount_u8(x);
            count_b += popcount_u8(y);
        }
    }
    let denom = count_a + count_b;
    if denom == 0 {
        return 0.0;
    }
    1.0 - (2.0 * inter as f32 / denom as f32)
}

fn jaccard_b1x8(a: *const u8, b: *const u8, dim: usize) -> f32 {
    tanimoto_b1x8(a, b, dim)
}
