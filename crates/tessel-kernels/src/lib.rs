//! # tessel-kernels
//!
//! CPU kernels over caller-owned, possibly strided N-d buffers.
//!
//! Provides:
//! - Elementwise unary/binary/compare/where, cast, fill, affine and copy kernels
//! - Last-axis and multi-axis reductions, softmax, RMS norm and layer norm
//! - Rotary position embedding in half-split, interleaved and THD layouts
//! - Index-select, gather, scatter, scatter-add and index-add with a MAX sentinel
//! - Direct and im2col + GEMM convolution (1D/2D, forward and transposed),
//!   pooling and nearest upsampling
//! - Stable argsort
//!
//! Every kernel has a dense entry point and, where layout matters, a
//! `_strided` twin that addresses operands through [`tessel_core::View`]s and
//! drops to the dense path when the views are contiguous. Rows are
//! data-independent; the `parallel` feature spreads them over rayon.

pub mod binary;
pub mod cast;
pub mod conv;
pub mod fill;
pub mod gemm;
pub mod index;
pub mod matmul;
pub mod norm;
pub mod pool;
pub mod reduce;
pub mod rope;
mod rows;
pub mod sort;
pub mod ternary;
pub mod unary;

pub use binary::{BinaryOp, CmpOp};
pub use conv::{Conv1dDims, Conv2dDims};
pub use gemm::{Gemm, TiledGemm, Transpose};
pub use pool::ImageDims;
pub use reduce::{ArgReduceOp, ReduceOp};
pub use rope::{RopeShape, RopeTable, RopeVariant};
pub use sort::SortOrder;
pub use unary::{UnaryOp, UnarySource};
