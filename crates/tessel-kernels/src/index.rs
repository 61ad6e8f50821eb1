//! Index kernels along one axis: index-select, gather, scatter, scatter-add
//! and index-add.
//!
//! Around the chosen axis a shape splits into `(left, dim, right)`: the
//! product of the extents before the axis, the axis extent and the product
//! after it. An id equal to [`IndexElement::SENTINEL`] marks an absent slot.
//! Selecting and gathering write zero there, scattering and adding skip it.
//!
//! Gather and the scatter/add family have data-dependent access patterns,
//! so their strided entry points reject non-contiguous operands with
//! [`KernelError::UnsupportedLayout`] instead of resolving strides.

use tessel_core::shape::split_at_axis;
use tessel_core::{Element, IndexElement, KernelError, Result, View};

fn require_contiguous(op: &'static str, views: &[View<'_>]) -> Result<()> {
    if views.iter().all(View::is_contiguous) {
        Ok(())
    } else {
        tracing::warn!(op, "rejecting strided operands");
        Err(KernelError::unsupported_layout(op))
    }
}

/// Select slices along `axis` with a 1-D id list.
///
/// `dst` has `src_shape` with the axis extent replaced by `ids.len()`:
/// `dst[l, i, r] = src[l, ids[i], r]`, or zero for a sentinel id.
pub fn index_select<I: IndexElement, T: Element>(
    ids: &[I],
    src: &[T],
    src_shape: &[usize],
    axis: usize,
    dst: &mut [T],
) {
    let (left, src_dim, right) = split_at_axis(src_shape, axis);
    if right == 0 {
        return;
    }
    let mut out = dst.chunks_exact_mut(right);
    for l in 0..left {
        for &id in ids {
            let Some(block) = out.next() else { return };
            if id.is_sentinel() {
                block.fill(T::ZERO);
            } else {
                let start = (l * src_dim + id.as_index()) * right;
                block.copy_from_slice(&src[start..start + right]);
            }
        }
    }
}

/// [`index_select`] with source and destination addressed through views.
/// `dst_view` has the logical destination shape.
pub fn index_select_strided<I: IndexElement, T: Element>(
    ids: &[I],
    src_view: View<'_>,
    src: &[T],
    axis: usize,
    dst_view: View<'_>,
    dst: &mut [T],
) {
    if src_view.is_contiguous() && dst_view.is_contiguous() {
        return index_select(ids, src, src_view.shape(), axis, dst);
    }
    let (left, src_dim, right) = split_at_axis(src_view.shape(), axis);
    let mut out = dst_view.offsets();
    for l in 0..left {
        for &id in ids {
            for r in 0..right {
                let Some(d) = out.next() else { return };
                dst[d] = if id.is_sentinel() {
                    T::ZERO
                } else {
                    src[src_view.offset((l * src_dim + id.as_index()) * right + r)]
                };
            }
        }
    }
}

/// Gather along `axis` with ids shaped like the destination:
/// `dst[l, i, r] = src[l, ids[l, i, r], r]`, or zero for a sentinel id.
pub fn gather<I: IndexElement, T: Element>(
    ids: &[I],
    src: &[T],
    src_shape: &[usize],
    axis: usize,
    dst: &mut [T],
) {
    let (left, src_dim, right) = split_at_axis(src_shape, axis);
    if left == 0 || right == 0 {
        return;
    }
    let ids_dim = ids.len() / (left * right);
    for l in 0..left {
        for i in 0..ids_dim {
            for r in 0..right {
                let pos = (l * ids_dim + i) * right + r;
                let id = ids[pos];
                dst[pos] = if id.is_sentinel() {
                    T::ZERO
                } else {
                    src[(l * src_dim + id.as_index()) * right + r]
                };
            }
        }
    }
}

/// Gather over views. Only contiguous operands are accepted.
pub fn gather_strided<I: IndexElement, T: Element>(
    ids_view: View<'_>,
    ids: &[I],
    src_view: View<'_>,
    src: &[T],
    axis: usize,
    dst_view: View<'_>,
    dst: &mut [T],
) -> Result<()> {
    require_contiguous("gather", &[ids_view, src_view, dst_view])?;
    gather(ids, src, src_view.shape(), axis, dst);
    Ok(())
}

fn scatter_with<I, T, F>(
    ids: &[I],
    src: &[T],
    src_shape: &[usize],
    axis: usize,
    dst: &mut [T],
    dst_dim: usize,
    mut write: F,
) where
    I: IndexElement,
    T: Element,
    F: FnMut(&mut T, T),
{
    let (left, src_dim, right) = split_at_axis(src_shape, axis);
    for l in 0..left {
        for i in 0..src_dim {
            for r in 0..right {
                let pos = (l * src_dim + i) * right + r;
                let id = ids[pos];
                if id.is_sentinel() {
                    continue;
                }
                write(&mut dst[(l * dst_dim + id.as_index()) * right + r], src[pos]);
            }
        }
    }
}

/// Inverse of [`gather`]: ids are shaped like the source, and
/// `dst[l, ids[l, i, r], r] = src[l, i, r]`. Colliding ids resolve to the
/// last write in iteration order; sentinel ids leave `dst` untouched.
pub fn scatter<I: IndexElement, T: Element>(
    ids: &[I],
    src: &[T],
    src_shape: &[usize],
    axis: usize,
    dst: &mut [T],
    dst_dim: usize,
) {
    scatter_with(ids, src, src_shape, axis, dst, dst_dim, |d, v| *d = v)
}

/// Like [`scatter`] but accumulates: `dst[l, ids[l, i, r], r] += src[l, i, r]`.
pub fn scatter_add<I: IndexElement, T: Element>(
    ids: &[I],
    src: &[T],
    src_shape: &[usize],
    axis: usize,
    dst: &mut [T],
    dst_dim: usize,
) {
    scatter_with(ids, src, src_shape, axis, dst, dst_dim, |d, v| *d = d.add_wrapping(v))
}

pub fn scatter_strided<I: IndexElement, T: Element>(
    ids_view: View<'_>,
    ids: &[I],
    src_view: View<'_>,
    src: &[T],
    axis: usize,
    dst_view: View<'_>,
    dst: &mut [T],
) -> Result<()> {
    require_contiguous("scatter", &[ids_view, src_view, dst_view])?;
    scatter(ids, src, src_view.shape(), axis, dst, dst_view.shape()[axis]);
    Ok(())
}

pub fn scatter_add_strided<I: IndexElement, T: Element>(
    ids_view: View<'_>,
    ids: &[I],
    src_view: View<'_>,
    src: &[T],
    axis: usize,
    dst_view: View<'_>,
    dst: &mut [T],
) -> Result<()> {
    require_contiguous("scatter_add", &[ids_view, src_view, dst_view])?;
    scatter_add(ids, src, src_view.shape(), axis, dst, dst_view.shape()[axis]);
    Ok(())
}

/// Accumulate source slices into destination slices chosen by a 1-D id
/// list of length `src_shape[axis]`: `dst[l, ids[j], r] += src[l, j, r]`.
/// Sentinel ids are skipped.
pub fn index_add<I: IndexElement, T: Element>(
    ids: &[I],
    src: &[T],
    src_shape: &[usize],
    axis: usize,
    dst: &mut [T],
    dst_dim: usize,
) {
    let (left, src_dim, right) = split_at_axis(src_shape, axis);
    for l in 0..left {
        for (j, &id) in ids.iter().enumerate().take(src_dim) {
            if id.is_sentinel() {
                continue;
            }
            let s = (l * src_dim + j) * right;
            let d = (l * dst_dim + id.as_index()) * right;
            for (out, &v) in dst[d..d + right].iter_mut().zip(&src[s..s + right]) {
                *out = out.add_wrapping(v);
            }
        }
    }
}

pub fn index_add_strided<I: IndexElement, T: Element>(
    ids: &[I],
    src_view: View<'_>,
    src: &[T],
    axis: usize,
    dst_view: View<'_>,
    dst: &mut [T],
) -> Result<()> {
    require_contiguous("index_add", &[src_view, dst_view])?;
    index_add(ids, src, src_view.shape(), axis, dst, dst_view.shape()[axis]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::Layout;

    #[test]
    fn test_index_select_rows_with_sentinel() {
        // Embedding-table lookup: [3, 2] table, ids pick rows.
        let table = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ids = [2u32, u32::MAX, 0];
        let mut dst = [9.0f32; 6];
        index_select(&ids, &table, &[3, 2], 0, &mut dst);
        assert_eq!(dst, [5.0, 6.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_index_select_inner_axis() {
        // [2, 3] selecting columns 2, 2, 1.
        let src = [1i64, 2, 3, 4, 5, 6];
        let mut dst = [0i64; 6];
        index_select(&[2u8, 2, 1], &src, &[2, 3], 1, &mut dst);
        assert_eq!(dst, [3, 3, 2, 6, 6, 5]);
    }

    #[test]
    fn test_index_select_strided_source() {
        // Source is the transpose of a [3, 2] buffer, so logically [2, 3].
        let buf = [1.0f64, 4.0, 2.0, 5.0, 3.0, 6.0];
        let src_l = Layout::contiguous([3, 2]).transpose(0, 1).unwrap();
        let dst_l = Layout::contiguous([2, 2]);
        let mut dst = [0.0f64; 4];
        index_select_strided(&[2i64, i64::MAX], src_l.view(), &buf, 1, dst_l.view(), &mut dst);
        assert_eq!(dst, [3.0, 0.0, 6.0, 0.0]);

        // Contiguous views agree with the dense kernel.
        let src = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let flat = Layout::contiguous([2, 3]);
        let mut a = [0.0f64; 4];
        let mut b = [0.0f64; 4];
        index_select(&[0u32, 2], &src, &[2, 3], 1, &mut a);
        index_select_strided(&[0u32, 2], flat.view(), &src, 1, dst_l.view(), &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_gather() {
        let src = [10.0f32, 11.0, 12.0, 20.0, 21.0, 22.0];
        let ids = [2u32, 0, u32::MAX, 1];
        let mut dst = [7.0f32; 4];
        gather(&ids, &src, &[2, 3], 1, &mut dst);
        assert_eq!(dst, [12.0, 10.0, 0.0, 21.0]);
    }

    #[test]
    fn test_gather_axis0() {
        let src = [1u32, 2, 3, 4, 5, 6]; // [3, 2]
        let ids = [2u8, 0]; // [1, 2]
        let mut dst = [0u32; 2];
        gather(&ids, &src, &[3, 2], 0, &mut dst);
        assert_eq!(dst, [5, 2]);
    }

    #[test]
    fn test_scatter_sentinel_keeps_destination() {
        let src = [1.0f32, 2.0, 3.0];
        let ids = [2u32, u32::MAX, 0];
        let mut dst = [-1.0f32; 4];
        scatter(&ids, &src, &[1, 3], 1, &mut dst, 4);
        assert_eq!(dst, [3.0, -1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_scatter_last_write_wins() {
        let src = [1i64, 2, 3];
        let ids = [0u8, 0, 0];
        let mut dst = [0i64; 2];
        scatter(&ids, &src, &[3], 0, &mut dst, 2);
        assert_eq!(dst, [3, 0]);
    }

    #[test]
    fn test_scatter_add_accumulates() {
        let src = [1.0f64, 2.0, 3.0, 4.0];
        let ids = [1i64, 1, i64::MAX, 0];
        let mut dst = [10.0f64, 20.0];
        scatter_add(&ids, &src, &[4], 0, &mut dst, 2);
        assert_eq!(dst, [14.0, 23.0]);
    }

    #[test]
    fn test_accumulating_index_ops_wrap() {
        let mut dst = [u32::MAX, 3];
        scatter_add(&[0u8, 1], &[2u32, 4], &[2], 0, &mut dst, 2);
        assert_eq!(dst, [1, 7]);

        let mut dst = [250u8, 0, 0, 9];
        index_add(&[1u32, 0], &[10u8, 20, 30, 40], &[2, 2], 0, &mut dst, 2);
        assert_eq!(dst, [24, 40, 10, 29]);

        let mut dst = [i64::MAX, 0];
        index_add(&[0i64], &[1i64, 5], &[1, 2], 0, &mut dst, 1);
        assert_eq!(dst, [i64::MIN, 5]);
    }

    #[test]
    fn test_index_add_rows() {
        // Accumulate rows of a [3, 2] source into a [2, 2] destination.
        let src = [1.0f32, 1.0, 2.0, 2.0, 4.0, 4.0];
        let ids = [1u32, u32::MAX, 1];
        let mut dst = [0.5f32; 4];
        index_add(&ids, &src, &[3, 2], 0, &mut dst, 2);
        assert_eq!(dst, [0.5, 0.5, 5.5, 5.5]);
    }

    #[test]
    fn test_strided_index_ops_reject_non_contiguous() {
        let src = [0.0f32; 6];
        let ids = [0u32; 6];
        let flat = Layout::contiguous([2, 3]);
        let t = Layout::contiguous([3, 2]).transpose(0, 1).unwrap();
        let mut dst = [0.0f32; 6];

        let err = gather_strided(flat.view(), &ids, t.view(), &src, 1, flat.view(), &mut dst);
        assert_eq!(err, Err(KernelError::unsupported_layout("gather")));

        let err = scatter_strided(t.view(), &ids, flat.view(), &src, 1, flat.view(), &mut dst);
        assert!(matches!(err, Err(KernelError::UnsupportedLayout { op: "scatter" })));

        let err = scatter_add_strided(flat.view(), &ids, flat.view(), &src, 1, t.view(), &mut dst);
        assert!(matches!(err, Err(KernelError::UnsupportedLayout { op: "scatter_add" })));

        let err = index_add_strided(&[0u32, 1], t.view(), &src, 0, flat.view(), &mut dst);
        assert!(matches!(err, Err(KernelError::UnsupportedLayout { op: "index_add" })));
    }

    #[test]
    fn test_strided_index_ops_accept_contiguous() {
        let src = [1.0f32, 2.0, 3.0];
        let ids = [2u32, 1, 0];
        let l = Layout::contiguous([3]);
        let mut dst = [0.0f32; 3];
        gather_strided(l.view(), &ids, l.view(), &src, 0, l.view(), &mut dst).unwrap();
        assert_eq!(dst, [3.0, 2.0, 1.0]);

        let mut dst = [0.0f32; 3];
        scatter_add_strided(l.view(), &ids, l.view(), &src, 0, l.view(), &mut dst).unwrap();
        assert_eq!(dst, [3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_empty_ids_are_noops() {
        let src = [1.0f32, 2.0];
        let mut dst: [f32; 0] = [];
        index_select::<u32, f32>(&[], &src, &[2], 0, &mut dst);
        gather::<u32, f32>(&[], &src, &[2], 0, &mut dst);
        let mut dst = [5.0f32; 2];
        index_add::<u32, f32>(&[], &src, &[0], 0, &mut dst, 2);
        assert_eq!(dst, [5.0, 5.0]);
    }
}
