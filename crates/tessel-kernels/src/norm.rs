//! Row-wise softmax and normalizations over the last axis.
//!
//! Each op makes a fixed number of passes over a row and writes the
//! destination row directly, with no intermediate allocation. Rows are
//! independent and run through [`for_each_row`].

use tessel_core::Float;

use crate::rows::for_each_row;

/// Numerically stable softmax over `ncols`-wide rows.
///
/// Pass 1 finds the row max, pass 2 writes `exp(x - max)` and accumulates
/// the sum, pass 3 scales by `1 / sum`.
pub fn softmax<T: Float>(ncols: usize, src: &[T], dst: &mut [T]) {
    tracing::trace!(dtype = %T::DTYPE, ncols, numel = src.len(), "softmax");
    let dst = &mut dst[..src.len()];
    for_each_row(dst, ncols, |row, out| {
        let x = &src[row * ncols..(row + 1) * ncols];

        let mut max = x[0];
        for &v in &x[1..] {
            if v > max {
                max = v;
            }
        }

        let mut sum = T::ZERO;
        for (o, &v) in out.iter_mut().zip(x) {
            let e = (v - max).exp();
            *o = e;
            sum += e;
        }

        let inv = sum.recip();
        for o in out.iter_mut() {
            *o *= inv;
        }
    });
}

/// RMS normalization: `x * 1/sqrt(mean(x^2) + eps) * alpha[col]`.
pub fn rms_norm<T: Float>(ncols: usize, eps: T, src: &[T], alpha: Option<&[T]>, dst: &mut [T]) {
    tracing::trace!(dtype = %T::DTYPE, ncols, numel = src.len(), "rms_norm");
    let n = T::from_usize(ncols);
    let dst = &mut dst[..src.len()];
    for_each_row(dst, ncols, |row, out| {
        let x = &src[row * ncols..(row + 1) * ncols];

        let mut sum_sq = T::ZERO;
        for &v in x {
            sum_sq += v * v;
        }
        let scale = (sum_sq / n + eps).sqrt().recip();

        match alpha {
            Some(alpha) => {
                for ((o, &v), &a) in out.iter_mut().zip(x).zip(alpha) {
                    *o = v * scale * a;
                }
            }
            None => {
                for (o, &v) in out.iter_mut().zip(x) {
                    *o = v * scale;
                }
            }
        }
    });
}

/// Layer normalization with biased variance.
///
/// Mean and mean-of-squares are accumulated together in one pass;
/// `var = E[x^2] - mean^2`. Output is `((x - mean) * scale) * alpha + beta`
/// with `alpha` and `beta` independently optional.
pub fn layer_norm<T: Float>(
    ncols: usize,
    eps: T,
    src: &[T],
    alpha: Option<&[T]>,
    beta: Option<&[T]>,
    dst: &mut [T],
) {
    tracing::trace!(dtype = %T::DTYPE, ncols, numel = src.len(), "layer_norm");
    let n = T::from_usize(ncols);
    let dst = &mut dst[..src.len()];
    for_each_row(dst, ncols, |row, out| {
        let x = &src[row * ncols..(row + 1) * ncols];

        let mut sum = T::ZERO;
        let mut sum_sq = T::ZERO;
        for &v in x {
            sum += v;
            sum_sq += v * v;
        }
        let mean = sum / n;
        let var = sum_sq / n - mean * mean;
        let scale = (var + eps).sqrt().recip();

        for (col, (o, &v)) in out.iter_mut().zip(x).enumerate() {
            let mut y = (v - mean) * scale;
            if let Some(alpha) = alpha {
                y = y * alpha[col];
            }
            if let Some(beta) = beta {
                y = y + beta[col];
            }
            *o = y;
        }
    });
}
