//! 1D and 2D convolution: direct loops, im2col/col2im lowering and the
//! im2col + GEMM fast path.
//!
//! Layouts are channels-first: inputs `[batch, c_in, spatial..]`, outputs
//! `[batch, c_out, spatial..]`. Forward kernels are `[c_out, c_in, k..]`,
//! transposed kernels `[c_in, c_out, k..]`. Input coordinates that land in
//! the padding read as zero.
//!
//! The `_strided` variants take per-axis element strides for each operand
//! (3 entries in 1D, 4 in 2D) and resolve them for every multiply-add term.
//! The direct loops are the correctness oracle; [`conv1d_im2col`] and
//! [`conv2d_im2col`] are the ones to call when speed matters.

use tessel_core::{Conv1dParams, Conv2dParams, Element, Result};

use crate::gemm::{Gemm, Transpose};

/// Extents of a 1D convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv1dDims {
    pub batch: usize,
    pub c_in: usize,
    pub l_in: usize,
    pub c_out: usize,
    pub k_size: usize,
}

impl Conv1dDims {
    fn src_strides(&self) -> [usize; 3] {
        [self.c_in * self.l_in, self.l_in, 1]
    }

    fn kernel_strides(&self) -> [usize; 3] {
        [self.c_in * self.k_size, self.k_size, 1]
    }

    fn transposed_kernel_strides(&self) -> [usize; 3] {
        [self.c_out * self.k_size, self.k_size, 1]
    }

    fn dst_strides(&self, l_out: usize) -> [usize; 3] {
        [self.c_out * l_out, l_out, 1]
    }

    /// Width of one im2col row: `c_in * k_size`.
    pub fn col_width(&self) -> usize {
        self.c_in * self.k_size
    }
}

/// Extents of a 2D convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dDims {
    pub batch: usize,
    pub c_in: usize,
    pub h_in: usize,
    pub w_in: usize,
    pub c_out: usize,
    pub h_k: usize,
    pub w_k: usize,
}

impl Conv2dDims {
    fn src_strides(&self) -> [usize; 4] {
        let hw = self.h_in * self.w_in;
        [self.c_in * hw, hw, self.w_in, 1]
    }

    fn kernel_strides(&self) -> [usize; 4] {
        let k = self.h_k * self.w_k;
        [self.c_in * k, k, self.w_k, 1]
    }

    fn transposed_kernel_strides(&self) -> [usize; 4] {
        let k = self.h_k * self.w_k;
        [self.c_out * k, k, self.w_k, 1]
    }

    fn dst_strides(&self, h_out: usize, w_out: usize) -> [usize; 4] {
        let hw = h_out * w_out;
        [self.c_out * hw, hw, w_out, 1]
    }

    /// Width of one im2col row: `c_in * h_k * w_k`.
    pub fn col_width(&self) -> usize {
        self.c_in * self.h_k * self.w_k
    }
}

/// Input coordinate read by output position `out` at kernel tap `tap`, or
/// `None` when it falls in the padding.
#[inline]
fn forward_pos(out: usize, tap: usize, stride: usize, padding: usize, dilation: usize, len: usize) -> Option<usize> {
    let pos = (out * stride + tap * dilation).checked_sub(padding)?;
    (pos < len).then_some(pos)
}

/// Input coordinate feeding transposed-conv output `out` through kernel tap
/// `tap`: solves `in * stride = out + padding - tap * dilation`.
#[inline]
fn transposed_pos(out: usize, tap: usize, stride: usize, padding: usize, dilation: usize, len: usize) -> Option<usize> {
    let shifted = (out + padding).checked_sub(tap * dilation)?;
    if shifted % stride != 0 {
        return None;
    }
    let pos = shifted / stride;
    (pos < len).then_some(pos)
}

// ---------------------------------------------------------------------------
// Direct loops
// ---------------------------------------------------------------------------

pub fn conv1d<T: Element>(
    dims: &Conv1dDims,
    params: &Conv1dParams,
    src: &[T],
    kernel: &[T],
    dst: &mut [T],
) -> Result<()> {
    let l_out = params.out_len(dims.l_in, dims.k_size)?;
    conv1d_strided(
        dims,
        params,
        src,
        dims.src_strides(),
        kernel,
        dims.kernel_strides(),
        dst,
        dims.dst_strides(l_out),
    )
}

/// Direct 1D convolution with independent `[batch, channel, position]`
/// strides for source, kernel and destination.
#[allow(clippy::too_many_arguments)]
pub fn conv1d_strided<T: Element>(
    dims: &Conv1dDims,
    params: &Conv1dParams,
    src: &[T],
    src_strides: [usize; 3],
    kernel: &[T],
    kernel_strides: [usize; 3],
    dst: &mut [T],
    dst_strides: [usize; 3],
) -> Result<()> {
    let l_out = params.out_len(dims.l_in, dims.k_size)?;
    tracing::debug!(dtype = %T::DTYPE, ?dims, l_out, "conv1d");
    let &Conv1dParams { stride, padding, dilation, .. } = params;
    for b in 0..dims.batch {
        for co in 0..dims.c_out {
            for lo in 0..l_out {
                let mut sum = T::ZERO;
                for ci in 0..dims.c_in {
                    for k in 0..dims.k_size {
                        if let Some(li) = forward_pos(lo, k, stride, padding, dilation, dims.l_in) {
                            let prod = src[b * src_strides[0] + ci * src_strides[1] + li * src_strides[2]]
                                .mul_wrapping(kernel[co * kernel_strides[0] + ci * kernel_strides[1] + k * kernel_strides[2]]);
                            sum = sum.add_wrapping(prod);
                        }
                    }
                }
                dst[b * dst_strides[0] + co * dst_strides[1] + lo * dst_strides[2]] = sum;
            }
        }
    }
    Ok(())
}

/// Transposed 1D convolution. `kernel` is `[c_in, c_out, k_size]` and the
/// output length is `params.transposed_out_len(l_in, k_size)`.
pub fn conv_transpose1d<T: Element>(
    dims: &Conv1dDims,
    params: &Conv1dParams,
    src: &[T],
    kernel: &[T],
    dst: &mut [T],
) -> Result<()> {
    let l_out = params.transposed_out_len(dims.l_in, dims.k_size)?;
    conv_transpose1d_strided(
        dims,
        params,
        src,
        dims.src_strides(),
        kernel,
        dims.transposed_kernel_strides(),
        dst,
        dims.dst_strides(l_out),
    )
}

/// Transposed 1D convolution with strided operands. Kernel strides are
/// `[c_in, c_out, tap]`.
#[allow(clippy::too_many_arguments)]
pub fn conv_transpose1d_strided<T: Element>(
    dims: &Conv1dDims,
    params: &Conv1dParams,
    src: &[T],
    src_strides: [usize; 3],
    kernel: &[T],
    kernel_strides: [usize; 3],
    dst: &mut [T],
    dst_strides: [usize; 3],
) -> Result<()> {
    let l_out = params.transposed_out_len(dims.l_in, dims.k_size)?;
    tracing::debug!(dtype = %T::DTYPE, ?dims, l_out, "conv_transpose1d");
    let &Conv1dParams { stride, padding, dilation, .. } = params;
    for b in 0..dims.batch {
        for co in 0..dims.c_out {
            for lo in 0..l_out {
                let mut sum = T::ZERO;
                for ci in 0..dims.c_in {
                    for k in 0..dims.k_size {
                        if let Some(li) = transposed_pos(lo, k, stride, padding, dilation, dims.l_in) {
                            let prod = src[b * src_strides[0] + ci * src_strides[1] + li * src_strides[2]]
                                .mul_wrapping(kernel[ci * kernel_strides[0] + co * kernel_strides[1] + k * kernel_strides[2]]);
                            sum = sum.add_wrapping(prod);
                        }
                    }
                }
                dst[b * dst_strides[0] + co * dst_strides[1] + lo * dst_strides[2]] = sum;
            }
        }
    }
    Ok(())
}

pub fn conv2d<T: Element>(
    dims: &Conv2dDims,
    params: &Conv2dParams,
    src: &[T],
    kernel: &[T],
    dst: &mut [T],
) -> Result<()> {
    let (h_out, w_out) = params.out_hw(dims.h_in, dims.w_in, dims.h_k, dims.w_k)?;
    conv2d_strided(
        dims,
        params,
        src,
        dims.src_strides(),
        kernel,
        dims.kernel_strides(),
        dst,
        dims.dst_strides(h_out, w_out),
    )
}

/// Direct 2D convolution with `[batch, channel, row, col]` strides.
#[allow(clippy::too_many_arguments)]
pub fn conv2d_strided<T: Element>(
    dims: &Conv2dDims,
    params: &Conv2dParams,
    src: &[T],
    ss: [usize; 4],
    kernel: &[T],
    ks: [usize; 4],
    dst: &mut [T],
    ds: [usize; 4],
) -> Result<()> {
    let (h_out, w_out) = params.out_hw(dims.h_in, dims.w_in, dims.h_k, dims.w_k)?;
    tracing::debug!(dtype = %T::DTYPE, ?dims, h_out, w_out, "conv2d");
    let &Conv2dParams { stride, padding, dilation, .. } = params;
    for b in 0..dims.batch {
        for co in 0..dims.c_out {
            for ho in 0..h_out {
                for wo in 0..w_out {
                    let mut sum = T::ZERO;
                    for ci in 0..dims.c_in {
                        for hk in 0..dims.h_k {
                            let Some(hi) = forward_pos(ho, hk, stride, padding, dilation, dims.h_in) else {
                                continue;
                            };
                            for wk in 0..dims.w_k {
                                if let Some(wi) = forward_pos(wo, wk, stride, padding, dilation, dims.w_in) {
                                    let prod = src[b * ss[0] + ci * ss[1] + hi * ss[2] + wi * ss[3]]
                                        .mul_wrapping(kernel[co * ks[0] + ci * ks[1] + hk * ks[2] + wk * ks[3]]);
                                    sum = sum.add_wrapping(prod);
                                }
                            }
                        }
                    }
                    dst[b * ds[0] + co * ds[1] + ho * ds[2] + wo * ds[3]] = sum;
                }
            }
        }
    }
    Ok(())
}

/// Transposed 2D convolution, kernel `[c_in, c_out, h_k, w_k]`.
pub fn conv_transpose2d<T: Element>(
    dims: &Conv2dDims,
    params: &Conv2dParams,
    src: &[T],
    kernel: &[T],
    dst: &mut [T],
) -> Result<()> {
    let (h_out, w_out) = params.transposed_out_hw(dims.h_in, dims.w_in, dims.h_k, dims.w_k)?;
    conv_transpose2d_strided(
        dims,
        params,
        src,
        dims.src_strides(),
        kernel,
        dims.transposed_kernel_strides(),
        dst,
        dims.dst_strides(h_out, w_out),
    )
}

#[allow(clippy::too_many_arguments)]
pub fn conv_transpose2d_strided<T: Element>(
    dims: &Conv2dDims,
    params: &Conv2dParams,
    src: &[T],
    ss: [usize; 4],
    kernel: &[T],
    ks: [usize; 4],
    dst: &mut [T],
    ds: [usize; 4],
) -> Result<()> {
    let (h_out, w_out) = params.transposed_out_hw(dims.h_in, dims.w_in, dims.h_k, dims.w_k)?;
    tracing::debug!(dtype = %T::DTYPE, ?dims, h_out, w_out, "conv_transpose2d");
    let &Conv2dParams { stride, padding, dilation, .. } = params;
    for b in 0..dims.batch {
        for co in 0..dims.c_out {
            for ho in 0..h_out {
                for wo in 0..w_out {
                    let mut sum = T::ZERO;
                    for ci in 0..dims.c_in {
                        for hk in 0..dims.h_k {
                            let Some(hi) = transposed_pos(ho, hk, stride, padding, dilation, dims.h_in) else {
                                continue;
                            };
                            for wk in 0..dims.w_k {
                                if let Some(wi) = transposed_pos(wo, wk, stride, padding, dilation, dims.w_in) {
                                    let prod = src[b * ss[0] + ci * ss[1] + hi * ss[2] + wi * ss[3]]
                                        .mul_wrapping(kernel[ci * ks[0] + co * ks[1] + hk * ks[2] + wk * ks[3]]);
                                    sum = sum.add_wrapping(prod);
                                }
                            }
                        }
                    }
                    dst[b * ds[0] + co * ds[1] + ho * ds[2] + wo * ds[3]] = sum;
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// im2col / col2im
// ---------------------------------------------------------------------------

/// Unfold 1D input neighborhoods into `col`, laid out
/// `[batch, l_out, c_in * k_size]`. Padding positions are written as zero.
pub fn im2col1d<T: Element>(dims: &Conv1dDims, params: &Conv1dParams, src: &[T], col: &mut [T]) -> Result<()> {
    im2col1d_strided(dims, params, src, dims.src_strides(), col)
}

/// [`im2col1d`] reading `src` through `[batch, channel, position]` strides.
pub fn im2col1d_strided<T: Element>(
    dims: &Conv1dDims,
    params: &Conv1dParams,
    src: &[T],
    src_strides: [usize; 3],
    col: &mut [T],
) -> Result<()> {
    let l_out = params.out_len(dims.l_in, dims.k_size)?;
    let &Conv1dParams { stride, padding, dilation, .. } = params;
    let width = dims.col_width();
    for b in 0..dims.batch {
        for lo in 0..l_out {
            let row = &mut col[(b * l_out + lo) * width..][..width];
            for ci in 0..dims.c_in {
                for k in 0..dims.k_size {
                    row[ci * dims.k_size + k] = match forward_pos(lo, k, stride, padding, dilation, dims.l_in) {
                        Some(li) => src[b * src_strides[0] + ci * src_strides[1] + li * src_strides[2]],
                        None => T::ZERO,
                    };
                }
            }
        }
    }
    Ok(())
}

/// Unfold 2D input neighborhoods into `col`, laid out
/// `[batch, h_out, w_out, c_in * h_k * w_k]`.
pub fn im2col2d<T: Element>(dims: &Conv2dDims, params: &Conv2dParams, src: &[T], col: &mut [T]) -> Result<()> {
    im2col2d_strided(dims, params, src, dims.src_strides(), col)
}

pub fn im2col2d_strided<T: Element>(
    dims: &Conv2dDims,
    params: &Conv2dParams,
    src: &[T],
    ss: [usize; 4],
    col: &mut [T],
) -> Result<()> {
    let (h_out, w_out) = params.out_hw(dims.h_in, dims.w_in, dims.h_k, dims.w_k)?;
    let &Conv2dParams { stride, padding, dilation, .. } = params;
    let width = dims.col_width();
    let taps = dims.h_k * dims.w_k;
    for b in 0..dims.batch {
        for ho in 0..h_out {
            for wo in 0..w_out {
                let row = &mut col[((b * h_out + ho) * w_out + wo) * width..][..width];
                for ci in 0..dims.c_in {
                    for hk in 0..dims.h_k {
                        let hi = forward_pos(ho, hk, stride, padding, dilation, dims.h_in);
                        for wk in 0..dims.w_k {
                            let wi = forward_pos(wo, wk, stride, padding, dilation, dims.w_in);
                            row[ci * taps + hk * dims.w_k + wk] = match (hi, wi) {
                                (Some(hi), Some(wi)) => src[b * ss[0] + ci * ss[1] + hi * ss[2] + wi * ss[3]],
                                _ => T::ZERO,
                            };
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Fold a `[batch, l_out, c_in * k_size]` column matrix back onto the
/// `[batch, c_in, l_in]` input layout, summing overlapping taps.
///
/// `im` is zeroed first, then accumulated into.
pub fn col2im1d<T: Element>(dims: &Conv1dDims, params: &Conv1dParams, col: &[T], im: &mut [T]) -> Result<()> {
    col2im1d_strided(dims, params, col, im, dims.src_strides())
}

/// [`col2im1d`] writing `im` through `[batch, channel, position]` strides.
pub fn col2im1d_strided<T: Element>(
    dims: &Conv1dDims,
    params: &Conv1dParams,
    col: &[T],
    im: &mut [T],
    im_strides: [usize; 3],
) -> Result<()> {
    let l_out = params.out_len(dims.l_in, dims.k_size)?;
    let &Conv1dParams { stride, padding, dilation, .. } = params;
    let at = |b: usize, ci: usize, li: usize| b * im_strides[0] + ci * im_strides[1] + li * im_strides[2];

    for b in 0..dims.batch {
        for ci in 0..dims.c_in {
            for li in 0..dims.l_in {
                im[at(b, ci, li)] = T::ZERO;
            }
        }
    }

    let width = dims.col_width();
    for b in 0..dims.batch {
        for lo in 0..l_out {
            let row = &col[(b * l_out + lo) * width..][..width];
            for ci in 0..dims.c_in {
                for k in 0..dims.k_size {
                    if let Some(li) = forward_pos(lo, k, stride, padding, dilation, dims.l_in) {
                        let slot = at(b, ci, li);
                        im[slot] = im[slot].add_saturating(row[ci * dims.k_size + k]);
                    }
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// im2col + GEMM
// ---------------------------------------------------------------------------

/// Run one GEMM per batch entry over an unfolded column matrix:
/// `dst[b] (c_out x positions) = kernel (c_out x width) @ col[b]^T`.
#[allow(clippy::too_many_arguments)]
fn gemm_per_batch<T: Element, G: Gemm<T> + ?Sized>(
    gemm: &G,
    batch: usize,
    c_out: usize,
    positions: usize,
    width: usize,
    kernel: &[T],
    col: &[T],
    dst: &mut [T],
) {
    let dst_stride = c_out * positions;
    if dst_stride == 0 {
        return;
    }
    // No input channels: every dot product is empty.
    if width == 0 {
        dst[..batch * dst_stride].fill(T::ZERO);
        return;
    }
    let col_stride = positions * width;
    for (col_b, dst_b) in col.chunks_exact(col_stride).zip(dst.chunks_exact_mut(dst_stride)).take(batch) {
        gemm.gemm(
            Transpose::No,
            Transpose::Yes,
            c_out,
            positions,
            width,
            T::ONE,
            kernel,
            width,
            col_b,
            width,
            T::ZERO,
            dst_b,
            positions,
        );
    }
}

/// 1D convolution as im2col followed by GEMM. Produces the same
/// `[batch, c_out, l_out]` output as [`conv1d`].
pub fn conv1d_im2col<T: Element, G: Gemm<T> + ?Sized>(
    gemm: &G,
    dims: &Conv1dDims,
    params: &Conv1dParams,
    src: &[T],
    kernel: &[T],
    dst: &mut [T],
) -> Result<()> {
    let l_out = params.out_len(dims.l_in, dims.k_size)?;
    let width = dims.col_width();
    let col_len = dims.batch * l_out * width;
    tracing::debug!(
        dtype = %T::DTYPE,
        ?dims,
        l_out,
        col_bytes = T::DTYPE.storage_bytes(col_len),
        "conv1d_im2col"
    );
    let mut col = vec![T::ZERO; col_len];
    im2col1d(dims, params, src, &mut col)?;
    gemm_per_batch(gemm, dims.batch, dims.c_out, l_out, width, kernel, &col, dst);
    Ok(())
}

/// 2D convolution as im2col followed by GEMM. Output is
/// `[batch, c_out, h_out, w_out]`, matching [`conv2d`].
pub fn conv2d_im2col<T: Element, G: Gemm<T> + ?Sized>(
    gemm: &G,
    dims: &Conv2dDims,
    params: &Conv2dParams,
    src: &[T],
    kernel: &[T],
    dst: &mut [T],
) -> Result<()> {
    let (h_out, w_out) = params.out_hw(dims.h_in, dims.w_in, dims.h_k, dims.w_k)?;
    let width = dims.col_width();
    let positions = h_out * w_out;
    let col_len = dims.batch * positions * width;
    tracing::debug!(
        dtype = %T::DTYPE,
        ?dims,
        h_out,
        w_out,
        col_bytes = T::DTYPE.storage_bytes(col_len),
        "conv2d_im2col"
    );
    let mut col = vec![T::ZERO; col_len];
    im2col2d(dims, params, src, &mut col)?;
    gemm_per_batch(gemm, dims.batch, dims.c_out, positions, width, kernel, &col, dst);
    Ok(())
}
