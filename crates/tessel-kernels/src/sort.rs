//! Argsort along the last axis.
//!
//! Sorting is stable: equal values keep their original column order in
//! both directions. NaN ranks above every number, so it lands at the end of
//! an ascending row and at the front of a descending one.

use std::cmp::Ordering;

use tessel_core::{Element, View};

use crate::rows::for_each_row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    #[inline]
    fn compare<T: Element>(self, a: T, b: T) -> Ordering {
        let ord = a.cmp_nan_last(&b);
        match self {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    }
}

/// Write, for every `ncols`-wide row of `src`, the column permutation that
/// sorts it into the matching row of `dst`.
pub fn argsort<T: Element>(order: SortOrder, ncols: usize, src: &[T], dst: &mut [u32]) {
    tracing::debug!(dtype = %T::DTYPE, ?order, ncols, numel = src.len(), "argsort");
    let dst = &mut dst[..src.len()];
    for_each_row(dst, ncols, |row, perm| {
        let values = &src[row * ncols..(row + 1) * ncols];
        for (col, p) in perm.iter_mut().enumerate() {
            *p = col as u32;
        }
        perm.sort_by(|&a, &b| order.compare(values[a as usize], values[b as usize]));
    });
}

/// [`argsort`] with values read through `src_view` and the permutation
/// written through `dst_view`. Both views share the logical shape.
pub fn argsort_strided<T: Element>(
    order: SortOrder,
    src_view: View<'_>,
    src: &[T],
    dst_view: View<'_>,
    dst: &mut [u32],
) {
    let numel = src_view.numel();
    let ncols = src_view.last_dim();
    if numel == 0 || ncols == 0 {
        return;
    }
    if src_view.is_contiguous() && dst_view.is_contiguous() {
        tracing::trace!("argsort_strided: contiguous fast path");
        return argsort(order, ncols, &src[..numel], dst);
    }

    let mut perm: Vec<u32> = Vec::with_capacity(ncols);
    for start in (0..numel).step_by(ncols) {
        perm.clear();
        perm.extend(0..ncols as u32);
        perm.sort_by(|&a, &b| {
            order.compare(
                src[src_view.offset(start + a as usize)],
                src[src_view.offset(start + b as usize)],
            )
        });
        for (col, &p) in perm.iter().enumerate() {
            dst[dst_view.offset(start + col)] = p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::Layout;

    #[test]
    fn test_argsort_rows() {
        let src = [3.0f32, 1.0, 2.0, 0.5, 9.0, -1.0];
        let mut dst = [0u32; 6];
        argsort(SortOrder::Ascending, 3, &src, &mut dst);
        assert_eq!(dst, [1, 2, 0, 2, 0, 1]);
        argsort(SortOrder::Descending, 3, &src, &mut dst);
        assert_eq!(dst, [0, 2, 1, 1, 0, 2]);
    }

    #[test]
    fn test_argsort_stable_ties() {
        let src = [2i64, 1, 2, 1, 2];
        let mut dst = [0u32; 5];
        argsort(SortOrder::Ascending, 5, &src, &mut dst);
        assert_eq!(dst, [1, 3, 0, 2, 4]);
        argsort(SortOrder::Descending, 5, &src, &mut dst);
        assert_eq!(dst, [0, 2, 4, 1, 3]);
    }

    #[test]
    fn test_argsort_with_nan_is_total_order() {
        let src: Vec<f32> = (0..200)
            .map(|i| if i % 3 == 0 { f32::NAN } else { ((i * 37) % 101) as f32 - 50.0 })
            .collect();
        let nan_count = src.iter().filter(|v| v.is_nan()).count();

        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let mut dst = vec![0u32; 200];
            argsort(order, 200, &src, &mut dst);

            let mut seen = dst.clone();
            seen.sort_unstable();
            assert_eq!(seen, (0..200).collect::<Vec<u32>>(), "{order:?}: not a permutation");

            let sorted: Vec<f32> = dst.iter().map(|&i| src[i as usize]).collect();
            let (nans, numbers) = match order {
                SortOrder::Ascending => (&sorted[200 - nan_count..], &sorted[..200 - nan_count]),
                SortOrder::Descending => (&sorted[..nan_count], &sorted[nan_count..]),
            };
            assert!(nans.iter().all(|v| v.is_nan()), "{order:?}: NaN not grouped");
            assert!(numbers.iter().all(|v| !v.is_nan()));
            for pair in numbers.windows(2) {
                match order {
                    SortOrder::Ascending => assert!(pair[0] <= pair[1], "{order:?}: {pair:?}"),
                    SortOrder::Descending => assert!(pair[0] >= pair[1], "{order:?}: {pair:?}"),
                }
            }
        }
    }

    #[test]
    fn test_argsort_nan_ties_stay_stable() {
        let src = [f64::NAN, 1.0, f64::NAN, 0.0];
        let mut dst = [0u32; 4];
        argsort(SortOrder::Ascending, 4, &src, &mut dst);
        assert_eq!(dst, [3, 1, 0, 2]);
        argsort(SortOrder::Descending, 4, &src, &mut dst);
        assert_eq!(dst, [0, 2, 1, 3]);
    }

    #[test]
    fn test_argsort_strided_transposed_source() {
        // [2, 3] buffer read as its [3, 2] transpose; rows are the columns.
        let buf = [5.0f64, 1.0, 4.0, 2.0, 6.0, 0.0];
        let src_l = Layout::contiguous([2, 3]).transpose(0, 1).unwrap();
        let dst_l = Layout::contiguous([3, 2]);
        let mut dst = [9u32; 6];
        argsort_strided(SortOrder::Ascending, src_l.view(), &buf, dst_l.view(), &mut dst);
        // rows: [5, 2], [1, 6], [4, 0]
        assert_eq!(dst, [1, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_argsort_strided_transposed_destination() {
        let src = [3u32, 1, 2, 0];
        let src_l = Layout::contiguous([2, 2]);
        let dst_l = Layout::contiguous([2, 2]).transpose(0, 1).unwrap();
        let mut dst = [0u32; 4];
        argsort_strided(SortOrder::Ascending, src_l.view(), &src, dst_l.view(), &mut dst);
        // Row permutations [1, 0] and [1, 0], stored column-major.
        assert_eq!(dst, [1, 1, 0, 0]);
    }

    #[test]
    fn test_argsort_contiguous_views_match_dense() {
        let src = [0.3f32, -0.1, 0.2, 0.9, 0.0, 0.5];
        let l = Layout::contiguous([2, 3]);
        let mut a = [0u32; 6];
        let mut b = [0u32; 6];
        argsort(SortOrder::Descending, 3, &src, &mut a);
        argsort_strided(SortOrder::Descending, l.view(), &src, l.view(), &mut b);
        assert_eq!(a, b);
    }
}
