//! Uniform scalar quantization.
//!
//! Each attribute component is quantized independently onto a uniform grid
//! of `2^bits` levels spanning its value range. All grid arithmetic runs in
//! f64 so the encoder and decoder agree bit-for-bit across platforms. The
//! reconstruction error is at most `range / (2^bits - 1)` per component.

use thiserror::Error;

#[remain::sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Err {
    #[error("quantization bits must lie in 1..=30, got {bits}")]
    InvalidBits { bits: u8 },
    #[error("grid spacing must be positive and finite")]
    InvalidGridDelta,
    #[error("component {component} contains a non-finite value")]
    RangeOverflow { component: usize },
}

pub(crate) const MAX_QUANTIZATION_BITS: u8 = 30;

/// Scans one interleaved component for its extent. Non-finite values cannot
/// be placed on a grid and fail with `RangeOverflow`.
pub(crate) fn component_extent(
    data: &[f32],
    component: usize,
    stride: usize,
) -> Result<(f32, f32), Err> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut i = component;
    while i < data.len() {
        let v = data[i];
        if !v.is_finite() {
            return Err(Err::RangeOverflow { component });
        }
        min = min.min(v);
        max = max.max(v);
        i += stride;
    }
    if min > max {
        return Ok((0.0, 0.0));
    }
    Ok((min, max))
}

/// Maps one component between f32 values and grid levels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quantizer {
    min: f64,
    range: f64,
    scale: f64,
}

impl Quantizer {
    pub fn new(min: f32, range: f32, bits: u8) -> Result<Self, Err> {
        if bits == 0 || bits > MAX_QUANTIZATION_BITS {
            return Err(Err::InvalidBits { bits });
        }
        Ok(Self {
            min: f64::from(min),
            range: f64::from(range),
            scale: f64::from((1_u32 << bits) - 1),
        })
    }

    /// True when every value collapses onto a single level.
    pub fn is_constant(&self) -> bool {
        self.range == 0.0
    }

    pub fn quantize(&self, v: f32) -> u32 {
        if self.range == 0.0 {
            return 0;
        }
        let t = (f64::from(v) - self.min) / self.range * self.scale;
        t.round().clamp(0.0, self.scale) as u32
    }

    pub fn dequantize(&self, q: u32) -> f32 {
        (self.min + f64::from(q) * self.range / self.scale) as f32
    }
}

/// Picks the bit depth whose step is at most `delta` over `range`. Returns
/// the depth and the effective range covered by that many steps. A spacing
/// finer than 30 bits can resolve keeps the true range, so the grid always
/// spans the data; the step is then coarser than requested. The caller has
/// already rejected non-positive spacings.
pub(crate) fn grid_bits(range: f32, delta: f32) -> (u8, f32) {
    let range = if range <= 0.0 { 1.0 } else { range };
    let steps = (f64::from(range) / f64::from(delta)).ceil();
    let bits = (steps + 1.0).log2().ceil() as i64;
    if bits > i64::from(MAX_QUANTIZATION_BITS) {
        return (MAX_QUANTIZATION_BITS, range);
    }
    let bits = bits.max(1) as u8;
    let effective = (f64::from(delta) * f64::from((1_u32 << bits) - 1)) as f32;
    (bits, effective)
}
