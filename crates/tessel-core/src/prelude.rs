//! Convenience re-exports for kernel callers.
//!
//! ```ignore
//! use tessel_core::prelude::*;
//! ```

pub use crate::{
    is_contiguous, physical_offset, Conv1dParams, Conv2dParams, DType, Element, Float,
    IndexElement, KernelError, Layout, Pool2dParams, Result, RopeConfig, Shape, View,
};
