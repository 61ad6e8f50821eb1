//! Fill, const-set, affine and 2D block copy.

use tessel_core::{Element, View};

/// `dst[i] = value` for every element.
pub fn fill<T: Element>(value: T, dst: &mut [T]) {
    dst.fill(value);
}

/// `dst[view(i)] = value` for every logical index of `view`.
pub fn fill_strided<T: Element>(view: View<'_>, value: T, dst: &mut [T]) {
    if view.is_contiguous() {
        return fill(value, &mut dst[..view.numel()]);
    }
    for off in view.offsets() {
        dst[off] = value;
    }
}

/// `dst[ids[i]] = value` for every id.
pub fn const_set<T: Element>(value: T, ids: &[usize], dst: &mut [T]) {
    for &id in ids {
        dst[id] = value;
    }
}

/// Like [`const_set`], but `ids` are logical flat indices of `view` and are
/// mapped to physical offsets before the write.
pub fn const_set_strided<T: Element>(view: View<'_>, value: T, ids: &[usize], dst: &mut [T]) {
    if view.is_contiguous() {
        return const_set(value, ids, dst);
    }
    for &id in ids {
        dst[view.offset(id)] = value;
    }
}

/// `y[i] = a * x[i] + b`.
pub fn affine<T: Element>(a: T, b: T, x: &[T], y: &mut [T]) {
    for (out, &v) in y.iter_mut().zip(x) {
        *out = a.mul_wrapping(v).add_wrapping(b);
    }
}

/// Affine with `x` read through `view`; `y` is written densely.
pub fn affine_strided<T: Element>(view: View<'_>, a: T, b: T, x: &[T], y: &mut [T]) {
    let numel = view.numel();
    if view.is_contiguous() {
        return affine(a, b, &x[..numel], &mut y[..numel]);
    }
    for (out, off) in y[..numel].iter_mut().zip(view.offsets()) {
        *out = a.mul_wrapping(x[off]).add_wrapping(b);
    }
}

/// Copy a `rows x cols` block between row-pitched buffers.
///
/// Row `r` of the block starts at `r * src_pitch` in `src` and at
/// `r * dst_pitch` in `dst`. Callers slice the buffers to apply offsets.
pub fn copy2d<T: Element>(
    rows: usize,
    cols: usize,
    src_pitch: usize,
    dst_pitch: usize,
    src: &[T],
    dst: &mut [T],
) {
    if cols == 0 {
        return;
    }
    for r in 0..rows {
        let s = r * src_pitch;
        let d = r * dst_pitch;
        dst[d..d + cols].copy_from_slice(&src[s..s + cols]);
    }
}
