//! Elementwise binary kernels: arithmetic, min/max, and comparisons.
//!
//! Strided forms take one [`View`] per operand. All views share the same
//! logical shape but carry independent strides, which is how broadcasting
//! (zero strides) and transposed operands are expressed. When every view
//! is contiguous the dense loop runs instead.

use tessel_core::{Element, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Maximum,
    Minimum,
}

impl BinaryOp {
    #[inline]
    pub fn apply<T: Element>(self, a: T, b: T) -> T {
        match self {
            BinaryOp::Add => a.add_wrapping(b),
            BinaryOp::Sub => a.sub_wrapping(b),
            BinaryOp::Mul => a.mul_wrapping(b),
            BinaryOp::Div => a / b,
            BinaryOp::Maximum => {
                if a > b {
                    a
                } else {
                    b
                }
            }
            BinaryOp::Minimum => {
                if a < b {
                    a
                } else {
                    b
                }
            }
        }
    }
}

/// Comparison ops. Results are written as `1`/`0` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    #[inline]
    pub fn apply<T: Element>(self, a: T, b: T) -> u8 {
        let hit = match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        };
        u8::from(hit)
    }
}

/// Dense driver: `dst[i] = f(lhs[i], rhs[i])`.
pub fn zip_map<T, U, F>(lhs: &[T], rhs: &[T], dst: &mut [U], f: F)
where
    T: Copy,
    F: Fn(T, T) -> U,
{
    for ((d, &a), &b) in dst.iter_mut().zip(lhs).zip(rhs) {
        *d = f(a, b);
    }
}

/// Strided driver: `dst[out(i)] = f(lhs[lv(i)], rhs[rv(i)])` for every
/// logical index `i` of the shared shape.
pub fn zip_map_strided<T, U, F>(
    lhs_view: View<'_>,
    lhs: &[T],
    rhs_view: View<'_>,
    rhs: &[T],
    dst_view: View<'_>,
    dst: &mut [U],
    f: F,
) where
    T: Copy,
    F: Fn(T, T) -> U,
{
    debug_assert_eq!(lhs_view.shape(), dst_view.shape());
    debug_assert_eq!(rhs_view.shape(), dst_view.shape());

    let numel = dst_view.numel();
    if lhs_view.is_contiguous() && rhs_view.is_contiguous() && dst_view.is_contiguous() {
        return zip_map(&lhs[..numel], &rhs[..numel], &mut dst[..numel], f);
    }

    let offsets = lhs_view
        .offsets()
        .zip(rhs_view.offsets())
        .zip(dst_view.offsets());
    for ((lo, ro), out) in offsets {
        dst[out] = f(lhs[lo], rhs[ro]);
    }
}

pub fn binary<T: Element>(op: BinaryOp, lhs: &[T], rhs: &[T], dst: &mut [T]) {
    zip_map(lhs, rhs, dst, |a, b| op.apply(a, b))
}

pub fn binary_strided<T: Element>(
    op: BinaryOp,
    lhs_view: View<'_>,
    lhs: &[T],
    rhs_view: View<'_>,
    rhs: &[T],
    dst_view: View<'_>,
    dst: &mut [T],
) {
    zip_map_strided(lhs_view, lhs, rhs_view, rhs, dst_view, dst, |a, b| {
        op.apply(a, b)
    })
}

pub fn compare<T: Element>(op: CmpOp, lhs: &[T], rhs: &[T], dst: &mut [u8]) {
    zip_map(lhs, rhs, dst, |a, b| op.apply(a, b))
}

pub fn compare_strided<T: Element>(
    op: CmpOp,
    lhs_view: View<'_>,
    lhs: &[T],
    rhs_view: View<'_>,
    rhs: &[T],
    dst_view: View<'_>,
    dst: &mut [u8],
) {
    zip_map_strided(lhs_view, lhs, rhs_view, rhs, dst_view, dst, |a, b| {
        op.apply(a, b)
    })
}
