//! 2D pooling and nearest-neighbor upsampling over `[batch, channels, h, w]`.

use tessel_core::{Element, Pool2dParams, Result};

/// Extents of a channels-first image batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDims {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageDims {
    pub fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self { batch, channels, height, width }
    }

    /// Row-major `[batch, channel, row, col]` strides.
    pub fn strides(&self) -> [usize; 4] {
        let hw = self.height * self.width;
        [self.channels * hw, hw, self.width, 1]
    }

    fn resized(&self, height: usize, width: usize) -> Self {
        Self { height, width, ..*self }
    }
}

/// Visit every output slot of a pooling window grid, passing the in-bounds
/// source offsets of its window to `reduce`.
fn pool_windows<T, F>(
    dims: &ImageDims,
    params: &Pool2dParams,
    src: &[T],
    ss: [usize; 4],
    dst: &mut [T],
    ds: [usize; 4],
    mut reduce: F,
) -> Result<()>
where
    T: Element,
    F: FnMut(&mut dyn Iterator<Item = T>) -> T,
{
    let (h_out, w_out) = params.out_hw(dims.height, dims.width)?;
    for b in 0..dims.batch {
        for c in 0..dims.channels {
            let base = b * ss[0] + c * ss[1];
            for ho in 0..h_out {
                for wo in 0..w_out {
                    let mut window = (0..params.kernel_h)
                        .map(move |hk| ho * params.stride_h + hk)
                        .filter(|&hi| hi < dims.height)
                        .flat_map(move |hi| {
                            (0..params.kernel_w)
                                .map(move |wk| wo * params.stride_w + wk)
                                .filter(move |&wi| wi < dims.width)
                                .map(move |wi| base + hi * ss[2] + wi * ss[3])
                        })
                        .map(|off| src[off]);
                    dst[b * ds[0] + c * ds[1] + ho * ds[2] + wo * ds[3]] = reduce(&mut window);
                }
            }
        }
    }
    Ok(())
}

/// Average pooling. Each output divides by the number of window positions
/// that actually fall inside the input, not by the full window area.
/// Integer outputs truncate toward zero.
pub fn avg_pool2d<T: Element>(dims: &ImageDims, params: &Pool2dParams, src: &[T], dst: &mut [T]) -> Result<()> {
    let (h_out, w_out) = params.out_hw(dims.height, dims.width)?;
    let ds = dims.resized(h_out, w_out).strides();
    avg_pool2d_strided(dims, params, src, dims.strides(), dst, ds)
}

pub fn avg_pool2d_strided<T: Element>(
    dims: &ImageDims,
    params: &Pool2dParams,
    src: &[T],
    src_strides: [usize; 4],
    dst: &mut [T],
    dst_strides: [usize; 4],
) -> Result<()> {
    tracing::debug!(dtype = %T::DTYPE, ?dims, ?params, "avg_pool2d");
    pool_windows(dims, params, src, src_strides, dst, dst_strides, |window| {
        // Widened so integer windows cannot overflow before the divide.
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for v in window {
            sum += v.to_f64();
            count += 1;
        }
        if count == 0 {
            T::ZERO
        } else {
            T::from_f64(sum / count as f64)
        }
    })
}

/// Max pooling. The first in-bounds value seeds the running max.
pub fn max_pool2d<T: Element>(dims: &ImageDims, params: &Pool2dParams, src: &[T], dst: &mut [T]) -> Result<()> {
    let (h_out, w_out) = params.out_hw(dims.height, dims.width)?;
    let ds = dims.resized(h_out, w_out).strides();
    max_pool2d_strided(dims, params, src, dims.strides(), dst, ds)
}

pub fn max_pool2d_strided<T: Element>(
    dims: &ImageDims,
    params: &Pool2dParams,
    src: &[T],
    src_strides: [usize; 4],
    dst: &mut [T],
    dst_strides: [usize; 4],
) -> Result<()> {
    tracing::debug!(dtype = %T::DTYPE, ?dims, ?params, "max_pool2d");
    pool_windows(dims, params, src, src_strides, dst, dst_strides, |window| {
        let first = window.next().unwrap_or(T::ZERO);
        window.fold(first, |acc, v| if v > acc { v } else { acc })
    })
}

/// Nearest source coordinate for output coordinate `out`:
/// `floor((out + 0.5) * len_in / len_out)`, clamped to the last row/col.
#[inline]
fn nearest(out: usize, len_in: usize, len_out: usize) -> usize {
    let pos = ((out as f64 + 0.5) * len_in as f64 / len_out as f64).floor() as usize;
    pos.min(len_in.saturating_sub(1))
}

/// Nearest-neighbor resize of every `height x width` plane to
/// `h_out x w_out`.
pub fn upsample_nearest2d<T: Element>(dims: &ImageDims, h_out: usize, w_out: usize, src: &[T], dst: &mut [T]) {
    let ds = dims.resized(h_out, w_out).strides();
    upsample_nearest2d_strided(dims, h_out, w_out, src, dims.strides(), dst, ds)
}

pub fn upsample_nearest2d_strided<T: Element>(
    dims: &ImageDims,
    h_out: usize,
    w_out: usize,
    src: &[T],
    ss: [usize; 4],
    dst: &mut [T],
    ds: [usize; 4],
) {
    if dims.height == 0 || dims.width == 0 {
        return;
    }
    for b in 0..dims.batch {
        for c in 0..dims.channels {
            for ho in 0..h_out {
                let hi = nearest(ho, dims.height, h_out);
                for wo in 0..w_out {
                    let wi = nearest(wo, dims.width, w_out);
                    dst[b * ds[0] + c * ds[1] + ho * ds[2] + wo * ds[3]] =
                        src[b * ss[0] + c * ss[1] + hi * ss[2] + wi * ss[3]];
                }
            }
        }
    }
}
