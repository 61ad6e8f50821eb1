//! Element kind conversion.
//!
//! Integer sources convert exactly through `i64`, saturating at the target
//! range. Float sources pass through `f64`, so float-to-integer conversion
//! truncates toward zero and saturates the same way.

use tessel_core::{Element, View};

#[inline]
fn convert<S: Element, D: Element>(v: S) -> D {
    match v.to_i64_exact() {
        Some(i) => D::from_i64(i),
        None => D::from_f64(v.to_f64()),
    }
}

pub fn cast<S: Element, D: Element>(src: &[S], dst: &mut [D]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = convert(s);
    }
}

/// Cast with independent source and destination strides over one logical shape.
pub fn cast_strided<S: Element, D: Element>(
    src_view: View<'_>,
    src: &[S],
    dst_view: View<'_>,
    dst: &mut [D],
) {
    debug_assert_eq!(src_view.shape(), dst_view.shape());
    let numel = src_view.numel();
    if src_view.is_contiguous() && dst_view.is_contiguous() {
        return cast(&src[..numel], &mut dst[..numel]);
    }
    for (so, d) in src_view.offsets().zip(dst_view.offsets()) {
        dst[d] = convert(src[so]);
    }
}
