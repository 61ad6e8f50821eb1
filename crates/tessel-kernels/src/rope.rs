//! Rotary Position Embeddings (RoPE).
//!
//! Every variant rotates pairs of features `(a, b) -> (a·cos - b·sin, a·sin + b·cos)`
//! with angles read from precomputed cos/sin tables of shape `[time, dim/2]`
//! (or `[batch, time, dim/2]` when a per-batch table is selected through
//! `stride_b`). They differ only in which two features form a pair:
//!
//! - half-split: `(i, i + dim/2)` over a `(batch*heads, time, dim)` layout
//! - interleaved: adjacent `(2k, 2k+1)` over the same layout
//! - THD: half-split pairs over a `(batch, time, heads, dim)` layout
//!
//! Strided variants map both members of a pair through the views
//! independently, so a pair may land in non-adjacent memory.

use tessel_core::{Float, Result, RopeConfig, View};

/// Logical extents of a rotary call.
///
/// `stride_b` is the number of source elements per batch entry of the
/// cos/sin tables; `0` shares one table across the whole input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RopeShape {
    pub batch: usize,
    pub time: usize,
    pub heads: usize,
    pub dim: usize,
    pub stride_b: usize,
}

impl RopeShape {
    pub fn new(batch: usize, heads: usize, time: usize, dim: usize) -> Self {
        Self {
            batch,
            time,
            heads,
            dim,
            stride_b: 0,
        }
    }

    pub fn with_batch_tables(mut self, stride_b: usize) -> Self {
        self.stride_b = stride_b;
        self
    }

    pub fn numel(&self) -> usize {
        self.batch * self.heads * self.time * self.dim
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RopeVariant {
    HalfSplit,
    Interleaved,
    Thd,
}

/// Call `f(i1, i2, table_index)` for every rotated pair in logical order.
fn for_each_pair(variant: RopeVariant, shape: RopeShape, mut f: impl FnMut(usize, usize, usize)) {
    let RopeShape {
        time: t,
        dim: d,
        stride_b,
        ..
    } = shape;
    let half_d = d / 2;
    let pairs = shape.numel() / 2;
    if half_d == 0 || pairs == 0 {
        return;
    }
    let half_td = t * half_d;

    for idx in 0..pairs {
        let batch_offset = if stride_b > 0 {
            (2 * idx) / stride_b * half_td
        } else {
            0
        };
        match variant {
            RopeVariant::HalfSplit => {
                let i_bh = idx / half_td;
                let i_td = idx - half_td * i_bh;
                let i_t = i_td / half_d;
                let i_d = i_td - half_d * i_t;
                let i1 = i_bh * t * d + i_t * d + i_d;
                f(i1, i1 + half_d, i_t * half_d + i_d + batch_offset);
            }
            RopeVariant::Interleaved => {
                f(2 * idx, 2 * idx + 1, idx % half_td + batch_offset);
            }
            RopeVariant::Thd => {
                let i_bth = idx / half_d;
                let i_d = idx - half_d * i_bth;
                let i_t = (i_bth / shape.heads) % t;
                let i1 = i_bth * d + i_d;
                f(i1, i1 + half_d, i_t * half_d + i_d + batch_offset);
            }
        }
    }
}

#[inline]
fn rotate<T: Float>(a: T, b: T, c: T, s: T) -> (T, T) {
    (a * c - b * s, a * s + b * c)
}

/// Apply one rotary variant to contiguous buffers.
pub fn rope_apply<T: Float>(
    variant: RopeVariant,
    shape: RopeShape,
    cos: &[T],
    sin: &[T],
    src: &[T],
    dst: &mut [T],
) {
    for_each_pair(variant, shape, |i1, i2, cs| {
        let (x, y) = rotate(src[i1], src[i2], cos[cs], sin[cs]);
        dst[i1] = x;
        dst[i2] = y;
    });
}

/// Apply one rotary variant with source and destination addressed through
/// views whose logical order matches the variant's layout.
#[allow(clippy::too_many_arguments)]
pub fn rope_apply_strided<T: Float>(
    variant: RopeVariant,
    shape: RopeShape,
    cos: &[T],
    sin: &[T],
    src_view: View<'_>,
    src: &[T],
    dst_view: View<'_>,
    dst: &mut [T],
) {
    if src_view.is_contiguous() && dst_view.is_contiguous() {
        tracing::trace!(?variant, "rope: contiguous fast path");
        return rope_apply(variant, shape, cos, sin, src, dst);
    }
    for_each_pair(variant, shape, |i1, i2, cs| {
        let (x, y) = rotate(
            src[src_view.offset(i1)],
            src[src_view.offset(i2)],
            cos[cs],
            sin[cs],
        );
        dst[dst_view.offset(i1)] = x;
        dst[dst_view.offset(i2)] = y;
    });
}

/// Half-split rotary over `(batch*heads, time, dim)`.
pub fn rope<T: Float>(shape: RopeShape, cos: &[T], sin: &[T], src: &[T], dst: &mut [T]) {
    rope_apply(RopeVariant::HalfSplit, shape, cos, sin, src, dst)
}

pub fn rope_strided<T: Float>(
    shape: RopeShape,
    cos: &[T],
    sin: &[T],
    src_view: View<'_>,
    src: &[T],
    dst_view: View<'_>,
    dst: &mut [T],
) {
    rope_apply_strided(RopeVariant::HalfSplit, shape, cos, sin, src_view, src, dst_view, dst)
}

/// Interleaved rotary: pairs are adjacent features.
pub fn rope_interleaved<T: Float>(shape: RopeShape, cos: &[T], sin: &[T], src: &[T], dst: &mut [T]) {
    rope_apply(RopeVariant::Interleaved, shape, cos, sin, src, dst)
}

pub fn rope_interleaved_strided<T: Float>(
    shape: RopeShape,
    cos: &[T],
    sin: &[T],
    src_view: View<'_>,
    src: &[T],
    dst_view: View<'_>,
    dst: &mut [T],
) {
    rope_apply_strided(RopeVariant::Interleaved, shape, cos, sin, src_view, src, dst_view, dst)
}

/// Half-split rotary over a `(batch, time, heads, dim)` layout.
pub fn rope_thd<T: Float>(shape: RopeShape, cos: &[T], sin: &[T], src: &[T], dst: &mut [T]) {
    rope_apply(RopeVariant::Thd, shape, cos, sin, src, dst)
}

pub fn rope_thd_strided<T: Float>(
    shape: RopeShape,
    cos: &[T],
    sin: &[T],
    src_view: View<'_>,
    src: &[T],
    dst_view: View<'_>,
    dst: &mut [T],
) {
    rope_apply_strided(RopeVariant::Thd, shape, cos, sin, src_view, src, dst_view, dst)
}

/// Precomputed cos/sin tables, each `[positions, dim/2]`.
#[derive(Debug, Clone)]
pub struct RopeTable<T> {
    pub cos: Vec<T>,
    pub sin: Vec<T>,
    pub dim: usize,
    pub positions: usize,
}

impl<T: Float> RopeTable<T> {
    /// Angle for position `p` and frequency slot `i` is `p / base^(2i/dim)`.
    pub fn new(config: &RopeConfig, positions: usize) -> Result<Self> {
        config.validate()?;
        let half_d = config.dim / 2;
        let mut cos = Vec::with_capacity(positions * half_d);
        let mut sin = Vec::with_capacity(positions * half_d);

        for pos in 0..positions {
            for i in 0..half_d {
                let freq = 1.0 / config.base.powf(2.0 * i as f64 / config.dim as f64);
                let angle = pos as f64 * freq;
                cos.push(T::from_f64(angle.cos()));
                sin.push(T::from_f64(angle.sin()));
            }
        }

        Ok(Self {
            cos,
            sin,
            dim: config.dim,
            positions,
        })
    }
}
