//! # tessel-core
//!
//! Foundations shared by the tessel CPU kernels.
//!
//! Provides:
//! - `Shape`, `Layout` and the borrowed `View` (shape + strides) pair
//! - The layout engine: `is_contiguous`, `physical_offset`, strided offset iteration
//! - Element traits (`Element`, `Float`, `IndexElement`) over f16, bf16, f32, f64, u8, u32, i64
//! - `KernelError` and kernel parameter structs

pub mod config;
pub mod dtype;
pub mod element;
pub mod error;
pub mod layout;
pub mod prelude;
pub mod shape;

pub use config::{Conv1dParams, Conv2dParams, Pool2dParams, RopeConfig};
pub use dtype::DType;
pub use element::{Element, Float, IndexElement};
pub use error::KernelError;
pub use layout::{is_contiguous, physical_offset, Layout, StridedOffsets, View};
pub use shape::{Shape, Strides};

pub type Result<T> = std::result::Result<T, KernelError>;
