//! Where-select: `dst[i] = if mask[i] != 0 { on_true[i] } else { on_false[i] }`.

use tessel_core::{Element, IndexElement, View};

pub fn where_select<M, T>(mask: &[M], on_true: &[T], on_false: &[T], dst: &mut [T])
where
    M: IndexElement,
    T: Element,
{
    for (i, d) in dst.iter_mut().enumerate() {
        *d = if mask[i].is_nonzero() {
            on_true[i]
        } else {
            on_false[i]
        };
    }
}

/// Where-select with independent strides for the mask and both branches.
/// The destination is written densely.
pub fn where_select_strided<M, T>(
    mask_view: View<'_>,
    mask: &[M],
    true_view: View<'_>,
    on_true: &[T],
    false_view: View<'_>,
    on_false: &[T],
    dst: &mut [T],
) where
    M: IndexElement,
    T: Element,
{
    let numel = mask_view.numel();
    if mask_view.is_contiguous() && true_view.is_contiguous() && false_view.is_contiguous() {
        return where_select(&mask[..numel], &on_true[..numel], &on_false[..numel], &mut dst[..numel]);
    }

    let offsets = mask_view
        .offsets()
        .zip(true_view.offsets())
        .zip(false_view.offsets());
    for (d, ((m, t), f)) in dst[..numel].iter_mut().zip(offsets) {
        *d = if mask[m].is_nonzero() {
            on_true[t]
        } else {
            on_false[f]
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::{Layout, Shape};

    #[test]
    fn test_where_dense() {
        let mask = [1u8, 0, 2, 0];
        let t = [1.0f32, 2.0, 3.0, 4.0];
        let f = [-1.0f32, -2.0, -3.0, -4.0];
        let mut out = [0.0f32; 4];
        where_select(&mask, &t, &f, &mut out);
        assert_eq!(out, [1.0, -2.0, 3.0, -4.0]);
    }

    #[test]
    fn test_where_negative_mask_is_true() {
        let mask = [-1i64, 0];
        let mut out = [0u32; 2];
        where_select(&mask, &[7u32, 7], &[9u32, 9], &mut out);
        assert_eq!(out, [7, 9]);
    }

    #[test]
    fn test_where_strided_broadcast_branches() {
        // [2, 3] mask; true branch is a broadcast row, false branch a scalar.
        let shape = Shape::new(&[2, 3]);
        let mask = [1u32, 0, 1, 0, 1, 0];
        let row = [10.0f64, 20.0, 30.0];
        let zero = [0.0f64];
        let ml = Layout::contiguous(shape.clone());
        let tl = Layout::contiguous([3]).broadcast_as(&shape).unwrap();
        let fl = Layout::contiguous([1]).broadcast_as(&shape).unwrap();
        let mut out = [f64::NAN; 6];
        where_select_strided(ml.view(), &mask, tl.view(), &row, fl.view(), &zero, &mut out);
        assert_eq!(out, [10.0, 0.0, 30.0, 0.0, 20.0, 0.0]);
    }

    #[test]
    fn test_where_strided_transposed_mask() {
        let mask = [1u8, 0, 0, 1]; // [[1, 0], [0, 1]] read transposed is the same
        let l = Layout::contiguous([2, 2]);
        let mt = l.transpose(0, 1).unwrap();
        let t = [1i64, 2, 3, 4];
        let f = [5i64, 6, 7, 8];
        let mut out = [0i64; 4];
        where_select_strided(mt.view(), &mask, l.view(), &t, l.view(), &f, &mut out);
        assert_eq!(out, [1, 6, 7, 4]);
    }
}
