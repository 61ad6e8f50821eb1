//! Elementwise unary kernels.
//!
//! Every op has a dense form over equal-length buffers and a strided form
//! whose source is addressed through a [`View`]. The source is either a
//! separate buffer or absent ([`UnarySource::InPlace`]), in which case the
//! destination is read, transformed and written back at the same address.

use tessel_core::{Element, Float, View};

/// Where a unary kernel reads its input from.
#[derive(Debug, Clone, Copy)]
pub enum UnarySource<'a, T> {
    OutOfPlace(&'a [T]),
    /// Read-modify-write the destination.
    InPlace,
}

/// Unary math ops for floating-point elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Copy,
    Neg,
    Recip,
    Exp,
    Log,
    Sin,
    Cos,
    Tanh,
    Erf,
    Ceil,
    Floor,
    /// Half away from zero.
    Round,
    Abs,
    Sqr,
    Sqrt,
    /// Tanh approximation: `0.5x(1 + tanh(sqrt(2/pi)(x + 0.044715x^3)))`.
    Gelu,
    /// Exact form: `0.5x(1 + erf(x/sqrt(2)))`.
    GeluErf,
    Relu,
    Elu(f64),
    Silu,
    Sigmoid,
    Powf(f64),
    Sign,
    /// Standard normal CDF: `0.5(1 + erf(x/sqrt(2)))`.
    NormCdf,
}

const SQRT_2_OVER_PI: f64 = 0.797_884_560_802_865_4;
const GELU_COEFF: f64 = 0.044_715;

impl UnaryOp {
    /// Apply this op to a single value.
    #[inline]
    pub fn apply<T: Float>(self, x: T) -> T {
        match self {
            UnaryOp::Copy => x,
            UnaryOp::Neg => -x,
            UnaryOp::Recip => x.recip(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Log => x.ln(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tanh => x.tanh(),
            UnaryOp::Erf => x.erf(),
            UnaryOp::Ceil => x.ceil(),
            UnaryOp::Floor => x.floor(),
            UnaryOp::Round => x.round(),
            UnaryOp::Abs => x.abs(),
            UnaryOp::Sqr => x * x,
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Gelu => {
                // Evaluated in f64 regardless of T.
                let v = x.to_f64();
                let inner = SQRT_2_OVER_PI * (v + GELU_COEFF * v * v * v);
                T::from_f64(0.5 * v * (1.0 + inner.tanh()))
            }
            UnaryOp::GeluErf => {
                let v = x.to_f64();
                T::from_f64(0.5 * v * (1.0 + Float::erf(v * std::f64::consts::FRAC_1_SQRT_2)))
            }
            UnaryOp::Relu => {
                if x < T::ZERO {
                    T::ZERO
                } else {
                    x
                }
            }
            UnaryOp::Elu(alpha) => {
                if x > T::ZERO {
                    x
                } else {
                    T::from_f64(alpha) * (x.exp() - T::ONE)
                }
            }
            UnaryOp::Silu => x / (T::ONE + (-x).exp()),
            UnaryOp::Sigmoid => T::ONE / (T::ONE + (-x).exp()),
            UnaryOp::Powf(e) => x.powf(T::from_f64(e)),
            UnaryOp::Sign => {
                if x > T::ZERO {
                    T::ONE
                } else if x < T::ZERO {
                    -T::ONE
                } else {
                    T::ZERO
                }
            }
            UnaryOp::NormCdf => {
                let v = x.to_f64();
                T::from_f64(0.5 * (1.0 + Float::erf(v * std::f64::consts::FRAC_1_SQRT_2)))
            }
        }
    }
}

/// Dense driver: `dst[i] = f(src[i])`, or `dst[i] = f(dst[i])` in place.
pub fn map<T, F>(src: UnarySource<'_, T>, dst: &mut [T], f: F)
where
    T: Element,
    F: Fn(T) -> T,
{
    match src {
        UnarySource::OutOfPlace(src) => {
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = f(s);
            }
        }
        UnarySource::InPlace => {
            for d in dst.iter_mut() {
                *d = f(*d);
            }
        }
    }
}

/// Strided driver over `view.numel()` logical elements.
///
/// Out of place, the source is read through `view` and the destination is
/// written densely. In place, each element is updated at its own physical
/// offset in `view`; views that alias (zero strides) are not supported in
/// place. Contiguous views take the dense path.
pub fn map_strided<T, F>(view: View<'_>, src: UnarySource<'_, T>, dst: &mut [T], f: F)
where
    T: Element,
    F: Fn(T) -> T,
{
    let numel = view.numel();
    if view.is_contiguous() {
        let dst = &mut dst[..numel];
        return map(src, dst, f);
    }
    match src {
        UnarySource::OutOfPlace(src) => {
            for (d, off) in dst[..numel].iter_mut().zip(view.offsets()) {
                *d = f(src[off]);
            }
        }
        UnarySource::InPlace => {
            for off in view.offsets() {
                dst[off] = f(dst[off]);
            }
        }
    }
}

/// Copy for any element kind. In place is a no-op.
pub fn copy<T: Element>(src: UnarySource<'_, T>, dst: &mut [T]) {
    if let UnarySource::OutOfPlace(src) = src {
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
    }
}

/// Gather a strided source into a dense destination. In place is a no-op.
pub fn copy_strided<T: Element>(view: View<'_>, src: UnarySource<'_, T>, dst: &mut [T]) {
    match src {
        UnarySource::OutOfPlace(s) if view.is_contiguous() => {
            let numel = view.numel();
            dst[..numel].copy_from_slice(&s[..numel]);
        }
        UnarySource::OutOfPlace(_) => map_strided(view, src, dst, |x| x),
        UnarySource::InPlace => {}
    }
}

/// Dense unary op.
pub fn unary<T: Float>(op: UnaryOp, src: UnarySource<'_, T>, dst: &mut [T]) {
    if op == UnaryOp::Copy {
        return copy(src, dst);
    }
    map(src, dst, |x| op.apply(x))
}

/// Strided unary op; see [`map_strided`] for addressing.
pub fn unary_strided<T: Float>(op: UnaryOp, view: View<'_>, src: UnarySource<'_, T>, dst: &mut [T]) {
    if op == UnaryOp::Copy {
        return copy_strided(view, src, dst);
    }
    map_strided(view, src, dst, |x| op.apply(x))
}
