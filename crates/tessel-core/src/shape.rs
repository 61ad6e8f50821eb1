use smallvec::SmallVec;
use std::fmt;

/// Per-axis element displacements, stack-allocated for ≤4 dimensions.
pub type Strides = SmallVec<[usize; 4]>;

/// Logical extents of a buffer, one entry per axis.
///
/// Most kernel calls are 1D-4D, so dims live inline and avoid heap
/// allocation for the common case.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    /// Scalar shape (0 dimensions).
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    /// Number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements: 1 for a scalar, 0 if any axis is empty.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Get dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Get size of a specific dimension.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    /// Whether this is a scalar (0-dimensional).
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Canonical row-major strides: last axis 1, each earlier axis the
    /// product of the later extents.
    pub fn contiguous_strides(&self) -> Strides {
        contiguous_strides(&self.dims)
    }

    /// Attempt to broadcast this shape with another.
    /// Returns the broadcasted shape or None if incompatible.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let max_rank = self.rank().max(other.rank());
        let mut result = SmallVec::with_capacity(max_rank);

        for i in 0..max_rank {
            let a = if i < self.rank() {
                self.dims[self.rank() - 1 - i]
            } else {
                1
            };
            let b = if i < other.rank() {
                other.dims[other.rank() - 1 - i]
            } else {
                1
            };

            if a == b {
                result.push(a);
            } else if a == 1 {
                result.push(b);
            } else if b == 1 {
                result.push(a);
            } else {
                return None;
            }
        }

        result.reverse();
        Some(Shape { dims: result })
    }

    /// Split the shape around `axis` into `(left, dim, right)`: the product
    /// of extents before the axis, the axis extent, and the product after it.
    pub fn split_at_axis(&self, axis: usize) -> Option<(usize, usize, usize)> {
        (axis < self.rank()).then(|| split_at_axis(&self.dims, axis))
    }
}

/// `(left, dim, right)` split of `dims` around `axis`; see
/// [`Shape::split_at_axis`]. `axis` must be in range.
pub fn split_at_axis(dims: &[usize], axis: usize) -> (usize, usize, usize) {
    let left = dims[..axis].iter().product();
    let right = dims[axis + 1..].iter().product();
    (left, dims[axis], right)
}

/// Canonical row-major strides for `dims`.
pub fn contiguous_strides(dims: &[usize]) -> Strides {
    let rank = dims.len();
    if rank == 0 {
        return SmallVec::new();
    }
    let mut strides = SmallVec::from_elem(0usize, rank);
    strides[rank - 1] = 1;
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape {
            dims: SmallVec::from_vec(dims),
        }
    }
}

macro_rules! impl_shape_from_array {
    ($($n:expr),*) => {
        $(
            impl From<[usize; $n]> for Shape {
                fn from(dims: [usize; $n]) -> Self {
                    Shape::new(&dims)
                }
            }
        )*
    };
}

impl_shape_from_array!(0, 1, 2, 3, 4, 5, 6);
