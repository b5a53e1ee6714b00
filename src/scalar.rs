//! Storage scalar kinds and conversion to/from `f32`.
//!
//! Every vector the façade stores is converted, component-wise, from
//! the caller's input scalar kind into the index's configured storage
//! kind. Conversions saturate rather than wrap; precision loss is
//! expected and is not reported as an error.

use half::{bf16, f16};

use crate::error::{Error, Result};

/// The scalar type vectors are stored as on disk and in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ScalarKind {
    /// 64-bit IEEE float.
    F64 = 0,
    /// 32-bit IEEE float.
    F32 = 1,
    /// 16-bit IEEE half float.
    F16 = 2,
    /// 16-bit brain float.
    BF16 = 3,
    /// 8-bit signed integer, symmetric-quantized with an inline per-vector scale.
    I8 = 4,
    /// 1 bit per component, MSB-first, 8 components per byte.
    B1X8 = 5,
}

impl ScalarKind {
    /// Decodes a scalar kind from its on-disk `u32` tag.
    pub fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            0 => Self::F64,
            1 => Self::F32,
            2 => Self::F16,
            3 => Self::BF16,
            4 => Self::I8,
            5 => Self::B1X8,
            other => {
                return Err(Error::incompatible_format(format!(
                    "unknown scalar tag {other}"
                )))
            }
        })
    }

    /// The on-disk `u32` tag for this scalar kind.
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Bytes occupied by one stored vector of `dim` components,
    /// including the inline quantization scale for [`ScalarKind::I8`].
    #[must_use]
    pub const fn bytes_per_vector(self, dim: usize) -> usize {
        match self {
            Self::F64 => dim * 8,
            Self::F32 => dim * 4,
            Self::F16 | Self::BF16 => dim * 2,
            Self::I8 => dim + 4, // one byte per component + f32 scale
            Self::B1X8 => dim.div_ceil(8),
        }
    }

    /// The natural alignment of one stored scalar, used by view mode
    /// to validate mmap'd payload alignment (`max(8, bytes_per_scalar)`).
    #[must_use]
    pub const fn scalar_align(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 | Self::I8 | Self::B1X8 => 4,
            Self::F16 | Self::BF16 => 2,
        }
    }
}

/// Encodes `values` (always supplied as `f32` by the façade, which
/// itself upconverts whatever the caller passed) into `out`, appending
/// exactly `bytes_per_vector(values.len())` bytes.
pub fn encode(kind: ScalarKind, values: &[f32], out: &mut Vec<u8>) {
    match kind {
        ScalarKind::F64 => {
            for &v in values {
                out.extend_from_slice(&(f64::from(v)).to_le_bytes());
            }
        }
        ScalarKind::F32 => {
            for &v in values {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        ScalarKind::F16 => {
            for &v in values {
                out.extend_from_slice(&f16::from_f32(v).to_le_bytes());
            }
        }
        ScalarKind::BF16 => {
            for &v in values {
                out.extend_from_slice(&bf16::from_f32(v).to_le_bytes());
            }
        }
        ScalarKind::I8 => encode_i8(values, out),
        ScalarKind::B1X8 => encode_b1x8(values, out),
    }
}

/// Decodes `dim` components of `kind` from `bytes` back into `f32`.
///
/// `bytes` must be at least `kind.bytes_per_vector(dim)` long.
#[must_use]
pub fn decode(kind: ScalarKind, dim: usize, bytes: &[u8]) -> Vec<f32> {
    match kind {
        ScalarKind::F64 => bytes[..dim * 8]
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().unwrap()) as f32)
            .collect(),
        ScalarKind::F32 => bytes[..dim * 4]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect(),
        ScalarKind::F16 => bytes[..dim * 2]
            .chunks_exact(2)
            .map(|c| f16::from_le_bytes(c.try_into().unwrap()).to_f32())
            .collect(),
        ScalarKind::BF16 => bytes[..dim * 2]
            .chunks_exact(2)
            .map(|c| bf16::from_le_bytes(c.try_into().unwrap()).to_f32())
            .collect(),
        ScalarKind::I8 => decode_i8(dim, bytes),
        ScalarKind::B1X8 => decode_b1x8(dim, bytes),
    }
}

/// `q = round(clamp(x / s, -1, 1) * 127)`, `s` = per-vector L-infinity norm.
/// The scale is appended inline as a little-endian `f32` after the
/// quantized bytes, per the façade's Open-Question resolution
/// (see `DESIGN.md`).
fn encode_i8(values: &[f32], out: &mut Vec<u8>) {
    let scale = values.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()));
    let scale = if scale <= f32::EPSILON { 1.0 } else { scale };
    for &v in values {
        let normalized = (v / scale).clamp(-1.0, 1.0) * 127.0;
        #[allow(clippy::cast_possible_truncation)]
        out.push(normalized.round() as i8 as u8);
    }
    out.extend_from_slice(&scale.to_le_bytes());
}

fn decode_i8(dim: usize, bytes: &[u8]) -> Vec<f32> {
    let scale = f32::from_le_bytes(bytes[dim..dim + 4].try_into().unwrap());
    bytes[..dim]
        .iter()
        .map(|&b| (b as i8) as f32 / 127.0 * scale)
        .collect()
}

/// Bit `i` is `1` iff component `i >= 0`, packed MSB-first, 8 per byte.
fn encode_b1x8(values: &[f32], out: &mut Vec<u8>) {
    for chunk in values.chunks(8) {
        let mut byte = 0u8;
        for (i, &v) in chunk.iter().enumerate() {
            if v >= 0.0 {
                byte |= 0x80 >> i;
            }
        }
        out.push(byte);
    }
}

fn decode_b1x8(dim: usize, bytes: &[u8]) -> Vec<f32> {
    let mut result = Vec::with_capacity(dim);
    for i in 0..dim {
        let byte = bytes[i / 8];
        let bit = (byte >> (7 - (i % 8))) & 1;
        result.push(if bit == 1 { 1.0 } else { -1.0 });
    }
    result
}
