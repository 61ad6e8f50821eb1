//! Element traits the kernels are generic over.
//!
//! - [`Element`]: anything a buffer can hold (floats and integers). Ordering,
//!   arithmetic and a zero/one value are enough for copy, fill, affine,
//!   binary ops, reductions, indexing and convolution. Kernels accumulate
//!   through the `*_wrapping` hooks so integer overflow wraps instead of
//!   panicking in debug builds.
//! - [`Float`]: transcendental math for the unary, normalization and rotary
//!   kernels.
//! - [`IndexElement`]: integer kinds usable as gather/scatter ids or where
//!   masks. The type maximum is reserved as the "skip this slot" sentinel.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub};

use half::{bf16, f16};

use crate::DType;

/// A numeric value a kernel buffer can hold.
pub trait Element:
    Copy
    + Debug
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + AddAssign
    + MulAssign
{
    const DTYPE: DType;
    const ZERO: Self;
    const ONE: Self;

    /// Convert from `f64`, saturating for integer kinds.
    fn from_f64(v: f64) -> Self;

    fn to_f64(self) -> f64;

    fn from_usize(v: usize) -> Self {
        Self::from_f64(v as f64)
    }

    /// Lossless `i64` view of an integer value; `None` for float kinds.
    #[inline]
    fn to_i64_exact(self) -> Option<i64> {
        None
    }

    /// Convert from `i64`, saturating for integer kinds.
    #[inline]
    fn from_i64(v: i64) -> Self {
        Self::from_f64(v as f64)
    }

    /// `self + rhs`, wrapping on integer overflow.
    fn add_wrapping(self, rhs: Self) -> Self;

    /// `self - rhs`, wrapping on integer overflow.
    fn sub_wrapping(self, rhs: Self) -> Self;

    /// `self * rhs`, wrapping on integer overflow.
    fn mul_wrapping(self, rhs: Self) -> Self;

    /// `self + rhs`, clamped to the type's range for integers.
    fn add_saturating(self, rhs: Self) -> Self;

    /// Total order for sorting: numbers by value, NaN after every number
    /// and equal to other NaNs.
    #[inline]
    fn cmp_nan_last(&self, other: &Self) -> Ordering {
        match self.partial_cmp(other) {
            Some(ord) => ord,
            None => {
                let self_nan = self.partial_cmp(self).is_none();
                let other_nan = other.partial_cmp(other).is_none();
                self_nan.cmp(&other_nan)
            }
        }
    }
}

macro_rules! impl_element_float {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;
                const ZERO: Self = 0.0;
                const ONE: Self = 1.0;

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $ty
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline] fn add_wrapping(self, rhs: Self) -> Self { self + rhs }
                #[inline] fn sub_wrapping(self, rhs: Self) -> Self { self - rhs }
                #[inline] fn mul_wrapping(self, rhs: Self) -> Self { self * rhs }
                #[inline] fn add_saturating(self, rhs: Self) -> Self { self + rhs }
            }
        )*
    };
}

impl_element_float!(f32 => F32, f64 => F64);

macro_rules! impl_element_int {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;
                const ZERO: Self = 0;
                const ONE: Self = 1;

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $ty
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn to_i64_exact(self) -> Option<i64> {
                    Some(self as i64)
                }

                #[inline]
                fn from_i64(v: i64) -> Self {
                    v.clamp(<$ty>::MIN as i64, <$ty>::MAX as i64) as $ty
                }

                #[inline] fn add_wrapping(self, rhs: Self) -> Self { <$ty>::wrapping_add(self, rhs) }
                #[inline] fn sub_wrapping(self, rhs: Self) -> Self { <$ty>::wrapping_sub(self, rhs) }
                #[inline] fn mul_wrapping(self, rhs: Self) -> Self { <$ty>::wrapping_mul(self, rhs) }
                #[inline] fn add_saturating(self, rhs: Self) -> Self { <$ty>::saturating_add(self, rhs) }
            }
        )*
    };
}

impl_element_int!(u8 => U8, u32 => U32, i64 => I64);

macro_rules! impl_element_half {
    ($($ty:ident => $dtype:ident),*) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;
                const ZERO: Self = $ty::ZERO;
                const ONE: Self = $ty::ONE;

                #[inline]
                fn from_f64(v: f64) -> Self {
                    $ty::from_f64(v)
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    $ty::to_f64(self)
                }

                #[inline] fn add_wrapping(self, rhs: Self) -> Self { self + rhs }
                #[inline] fn sub_wrapping(self, rhs: Self) -> Self { self - rhs }
                #[inline] fn mul_wrapping(self, rhs: Self) -> Self { self * rhs }
                #[inline] fn add_saturating(self, rhs: Self) -> Self { self + rhs }
            }
        )*
    };
}

impl_element_half!(f16 => F16, bf16 => BF16);

/// Floating-point elements with the math the unary and normalization kernels need.
pub trait Float: Element + Neg<Output = Self> {
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn tanh(self) -> Self;
    fn erf(self) -> Self;
    fn ceil(self) -> Self;
    fn floor(self) -> Self;
    /// Round half away from zero.
    fn round(self) -> Self;
    fn abs(self) -> Self;
    fn sqrt(self) -> Self;
    fn powf(self, exponent: Self) -> Self;

    fn recip(self) -> Self {
        Self::ONE / self
    }
}

macro_rules! impl_float_primitive {
    ($($ty:ident => $erf:path),*) => {
        $(
            impl Float for $ty {
                #[inline] fn exp(self) -> Self { $ty::exp(self) }
                #[inline] fn ln(self) -> Self { $ty::ln(self) }
                #[inline] fn sin(self) -> Self { $ty::sin(self) }
                #[inline] fn cos(self) -> Self { $ty::cos(self) }
                #[inline] fn tanh(self) -> Self { $ty::tanh(self) }
                #[inline] fn erf(self) -> Self { $erf(self) }
                #[inline] fn ceil(self) -> Self { $ty::ceil(self) }
                #[inline] fn floor(self) -> Self { $ty::floor(self) }
                #[inline] fn round(self) -> Self { $ty::round(self) }
                #[inline] fn abs(self) -> Self { $ty::abs(self) }
                #[inline] fn sqrt(self) -> Self { $ty::sqrt(self) }
                #[inline] fn powf(self, exponent: Self) -> Self { $ty::powf(self, exponent) }
                #[inline] fn recip(self) -> Self { $ty::recip(self) }
            }
        )*
    };
}

impl_float_primitive!(f32 => libm::erff, f64 => libm::erf);

// Half types compute in f32 and round back on store.
macro_rules! impl_float_half {
    ($($ty:ident),*) => {
        $(
            impl Float for $ty {
                #[inline] fn exp(self) -> Self { $ty::from_f32(self.to_f32().exp()) }
                #[inline] fn ln(self) -> Self { $ty::from_f32(self.to_f32().ln()) }
                #[inline] fn sin(self) -> Self { $ty::from_f32(self.to_f32().sin()) }
                #[inline] fn cos(self) -> Self { $ty::from_f32(self.to_f32().cos()) }
                #[inline] fn tanh(self) -> Self { $ty::from_f32(self.to_f32().tanh()) }
                #[inline] fn erf(self) -> Self { $ty::from_f32(libm::erff(self.to_f32())) }
                #[inline] fn ceil(self) -> Self { $ty::from_f32(self.to_f32().ceil()) }
                #[inline] fn floor(self) -> Self { $ty::from_f32(self.to_f32().floor()) }
                #[inline] fn round(self) -> Self { $ty::from_f32(self.to_f32().round()) }
                #[inline] fn abs(self) -> Self { $ty::from_f32(self.to_f32().abs()) }
                #[inline] fn sqrt(self) -> Self { $ty::from_f32(self.to_f32().sqrt()) }
                #[inline]
                fn powf(self, exponent: Self) -> Self {
                    $ty::from_f32(self.to_f32().powf(exponent.to_f32()))
                }
            }
        )*
    };
}

impl_float_half!(f16, bf16);

/// Integer element usable as an index or mask value.
///
/// `SENTINEL` (the type maximum) marks a slot that gather, scatter,
/// index-select and index-add must leave alone. Callers building index
/// buffers must never use it as a real coordinate.
pub trait IndexElement: Copy + Debug + PartialEq + Send + Sync + 'static {
    const DTYPE: DType;
    const ZERO: Self;
    const SENTINEL: Self;

    /// The coordinate this id addresses. Only meaningful for non-sentinel,
    /// non-negative values.
    fn as_index(self) -> usize;

    #[inline]
    fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }

    #[inline]
    fn is_nonzero(self) -> bool {
        self != Self::ZERO
    }
}

macro_rules! impl_index_element {
    ($($ty:ty => $dtype:ident),*) => {
        $(
            impl IndexElement for $ty {
                const DTYPE: DType = DType::$dtype;
                const ZERO: Self = 0;
                const SENTINEL: Self = <$ty>::MAX;

                #[inline]
                fn as_index(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

impl_index_element!(u8 => U8, u32 => U32, i64 => I64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_tags() {
        assert_eq!(<f32 as Element>::DTYPE, DType::F32);
        assert_eq!(<bf16 as Element>::DTYPE, DType::BF16);
        assert_eq!(<u32 as IndexElement>::DTYPE, DType::U32);
    }

    #[test]
    fn test_from_f64_saturates_integers() {
        assert_eq!(<u8 as Element>::from_f64(300.0), 255);
        assert_eq!(<u8 as Element>::from_f64(-4.0), 0);
        assert_eq!(<u32 as Element>::from_f64(3.9), 3);
        assert_eq!(<i64 as Element>::from_f64(-2.5), -2);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(Float::round(2.5f32), 3.0);
        assert_eq!(Float::round(-2.5f64), -3.0);
        assert_eq!(Float::round(f16::from_f32(0.5)).to_f32(), 1.0);
    }

    #[test]
    fn test_erf_values() {
        assert!(Float::erf(0.0f64).abs() < 1e-12);
        assert!((Float::erf(1.0f32) - 0.842_700_8).abs() < 1e-6);
        assert!((Float::erf(bf16::from_f32(1.0)).to_f32() - 0.8427).abs() < 1e-2);
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        assert_eq!(200u8.add_wrapping(100), 44);
        assert_eq!(3u8.sub_wrapping(5), 254);
        assert_eq!(16u8.mul_wrapping(17), 16);
        assert_eq!(u32::MAX.add_wrapping(2), 1);
        assert_eq!(0u32.sub_wrapping(1), u32::MAX);
        assert_eq!(i64::MAX.add_wrapping(1), i64::MIN);
        assert_eq!(i64::MIN.mul_wrapping(-1), i64::MIN);
        assert_eq!(1.5f32.add_wrapping(2.0), 3.5);
    }

    #[test]
    fn test_from_i64_saturates_integers() {
        assert_eq!(<u8 as Element>::from_i64(-3), 0);
        assert_eq!(<u8 as Element>::from_i64(4_000), u8::MAX);
        assert_eq!(<u32 as Element>::from_i64(i64::MAX), u32::MAX);
        assert_eq!(<i64 as Element>::from_i64(i64::MIN), i64::MIN);
        assert_eq!(i64::MAX.to_i64_exact(), Some(i64::MAX));
        assert_eq!(2.0f32.to_i64_exact(), None);
    }

    #[test]
    fn test_add_saturating() {
        assert_eq!(200u8.add_saturating(100), u8::MAX);
        assert_eq!(u32::MAX.add_saturating(7), u32::MAX);
        assert_eq!(i64::MIN.add_saturating(-1), i64::MIN);
        assert_eq!(f64::MAX.add_saturating(f64::MAX), f64::INFINITY);
    }

    #[test]
    fn test_cmp_nan_last() {
        assert_eq!(1.0f32.cmp_nan_last(&2.0), Ordering::Less);
        assert_eq!(f32::NAN.cmp_nan_last(&f32::INFINITY), Ordering::Greater);
        assert_eq!((-1.0f64).cmp_nan_last(&f64::NAN), Ordering::Less);
        assert_eq!(f64::NAN.cmp_nan_last(&-f64::NAN), Ordering::Equal);
        assert_eq!(f16::NAN.cmp_nan_last(&f16::from_f32(3.0)), Ordering::Greater);
        assert_eq!(7u8.cmp_nan_last(&7), Ordering::Equal);
    }

    #[test]
    fn test_sentinel_is_type_max() {
        assert_eq!(<u8 as IndexElement>::SENTINEL, u8::MAX);
        assert!(u32::MAX.is_sentinel());
        assert!(!0i64.is_sentinel());
        assert!(7i64.is_nonzero());
        assert!(!0u8.is_nonzero());
        assert_eq!(5u32.as_index(), 5);
    }
}
