//! Reductions over the last axis and over arbitrary axis subsets.
//!
//! Last-axis reductions view the input as `(outer, inner)` rows where
//! `inner` is the last extent. Accumulation happens in the element type
//! itself, f32 rows reduce in f32.

use tessel_core::{Element, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgReduceOp {
    ArgMin,
    ArgMax,
}

fn fold_row<T: Element>(op: ReduceOp, mut row: impl Iterator<Item = T>) -> T {
    match op {
        ReduceOp::Sum => row.fold(T::ZERO, |acc, x| acc.add_wrapping(x)),
        ReduceOp::Min => {
            let first = row.next().unwrap_or(T::ZERO);
            row.fold(first, |acc, x| if x < acc { x } else { acc })
        }
        ReduceOp::Max => {
            let first = row.next().unwrap_or(T::ZERO);
            row.fold(first, |acc, x| if x > acc { x } else { acc })
        }
    }
}

/// Column of the first element reaching the extremum. Ties keep the
/// earliest column.
fn arg_row<T: Element>(op: ArgReduceOp, row: impl Iterator<Item = T>) -> u32 {
    let mut best: Option<(u32, T)> = None;
    for (col, x) in row.enumerate() {
        let better = match best {
            None => true,
            Some((_, b)) => match op {
                ArgReduceOp::ArgMin => x < b,
                ArgReduceOp::ArgMax => x > b,
            },
        };
        if better {
            best = Some((col as u32, x));
        }
    }
    best.map_or(0, |(col, _)| col)
}

/// Reduce each `ncols`-wide row of `src` into one value of `dst`.
pub fn reduce_last<T: Element>(op: ReduceOp, ncols: usize, src: &[T], dst: &mut [T]) {
    if ncols == 0 {
        return;
    }
    for (d, row) in dst.iter_mut().zip(src.chunks_exact(ncols)) {
        *d = fold_row(op, row.iter().copied());
    }
}

/// Last-axis reduction with `src` addressed through `view`.
pub fn reduce_last_strided<T: Element>(op: ReduceOp, view: View<'_>, src: &[T], dst: &mut [T]) {
    let numel = view.numel();
    let ncols = view.last_dim();
    if numel == 0 || ncols == 0 {
        return;
    }
    if view.is_contiguous() {
        tracing::trace!(?op, "reduce_last_strided: contiguous fast path");
        return reduce_last(op, ncols, &src[..numel], dst);
    }
    let rows = numel / ncols;
    let mut offsets = view.offsets();
    for d in dst[..rows].iter_mut() {
        *d = fold_row(op, offsets.by_ref().take(ncols).map(|o| src[o]));
    }
}

/// Column index of each row's minimum or maximum.
pub fn arg_reduce_last<T: Element>(op: ArgReduceOp, ncols: usize, src: &[T], dst: &mut [u32]) {
    if ncols == 0 {
        return;
    }
    for (d, row) in dst.iter_mut().zip(src.chunks_exact(ncols)) {
        *d = arg_row(op, row.iter().copied());
    }
}

pub fn arg_reduce_last_strided<T: Element>(
    op: ArgReduceOp,
    view: View<'_>,
    src: &[T],
    dst: &mut [u32],
) {
    let numel = view.numel();
    let ncols = view.last_dim();
    if numel == 0 || ncols == 0 {
        return;
    }
    if view.is_contiguous() {
        return arg_reduce_last(op, ncols, &src[..numel], dst);
    }
    let rows = numel / ncols;
    let mut offsets = view.offsets();
    for d in dst[..rows].iter_mut() {
        *d = arg_row(op, offsets.by_ref().take(ncols).map(|o| src[o]));
    }
}

/// Row-major strides of the output of reducing `axes` out of `dims`, with
/// zero strides on the reduced axes so that every input coordinate maps to
/// the output slot that keeps only its non-reduced coordinates.
fn reduced_strides(dims: &[usize], axes: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; dims.len()];
    let mut acc = 1;
    for axis in (0..dims.len()).rev() {
        if !axes.contains(&axis) {
            strides[axis] = acc;
            acc *= dims[axis];
        }
    }
    strides
}

/// Sum over an arbitrary set of axes: `dst[kept coords] += src[all coords]`.
///
/// `dst` has the row-major layout of `dims` with the reduced axes removed and
/// is accumulated into, so zero it first for a plain sum.
pub fn sum_axes<T: Element>(dims: &[usize], axes: &[usize], src: &[T], dst: &mut [T]) {
    let dst_strides = reduced_strides(dims, axes);
    let dst_view = View::new(dims, &dst_strides);
    let numel = dst_view.numel();
    for (&x, d) in src[..numel].iter().zip(dst_view.offsets()) {
        dst[d] = dst[d].add_wrapping(x);
    }
}

/// [`sum_axes`] with `src` addressed through `view`.
pub fn sum_axes_strided<T: Element>(view: View<'_>, axes: &[usize], src: &[T], dst: &mut [T]) {
    if view.is_contiguous() {
        return sum_axes(view.shape(), axes, src, dst);
    }
    let dst_strides = reduced_strides(view.shape(), axes);
    let dst_view = View::new(view.shape(), &dst_strides);
    for (s, d) in view.offsets().zip(dst_view.offsets()) {
        dst[d] = dst[d].add_wrapping(src[s]);
    }
}
