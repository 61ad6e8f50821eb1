//! Layout engine: contiguity test and flat-index to physical-offset mapping.
//!
//! A [`View`] borrows a shape and a stride sequence of equal length. Base
//! offsets are the caller's business: a view always addresses the slice it
//! is paired with from element 0. Zero strides express broadcasting, swapped
//! strides express transposition.

use smallvec::SmallVec;

use crate::shape::{contiguous_strides, Shape, Strides};

/// Borrowed (shape, strides) pair describing how flat logical indices map
/// into a backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View<'a> {
    shape: &'a [usize],
    strides: &'a [usize],
}

impl<'a> View<'a> {
    pub fn new(shape: &'a [usize], strides: &'a [usize]) -> Self {
        debug_assert_eq!(
            shape.len(),
            strides.len(),
            "shape and strides must have the same rank"
        );
        Self { shape, strides }
    }

    pub fn shape(&self) -> &'a [usize] {
        self.shape
    }

    pub fn strides(&self) -> &'a [usize] {
        self.strides
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of logical elements (1 for rank 0).
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Extent of the last axis, 1 for a scalar.
    pub fn last_dim(&self) -> usize {
        self.shape.last().copied().unwrap_or(1)
    }

    pub fn is_contiguous(&self) -> bool {
        is_contiguous(*self)
    }

    #[inline]
    pub fn offset(&self, flat_index: usize) -> usize {
        physical_offset(flat_index, *self)
    }

    /// Physical offsets for flat indices `0..numel`, in order.
    pub fn offsets(&self) -> StridedOffsets<'a> {
        StridedOffsets::new(*self)
    }
}

/// Whether `view` has canonical row-major strides.
///
/// Walks axes from last to first with an expected stride starting at 1.
/// Rank 0 is contiguous.
pub fn is_contiguous(view: View<'_>) -> bool {
    let mut expected = 1usize;
    for (&dim, &stride) in view.shape.iter().zip(view.strides).rev() {
        if stride != expected {
            return false;
        }
        expected *= dim;
    }
    true
}

/// Physical offset of logical `flat_index` in `view`.
///
/// Row-major decomposition from the last axis backward, then the dot product
/// of coordinates with strides. `flat_index` must be in `[0, numel)`.
#[inline]
pub fn physical_offset(flat_index: usize, view: View<'_>) -> usize {
    let mut rem = flat_index;
    let mut offset = 0;
    for (&dim, &stride) in view.shape.iter().zip(view.strides).rev() {
        offset += (rem % dim) * stride;
        rem /= dim;
    }
    offset
}

/// Odometer over a view: yields the physical offset of each flat index
/// without re-running the div/mod decomposition per element.
#[derive(Debug, Clone)]
pub struct StridedOffsets<'a> {
    view: View<'a>,
    coords: SmallVec<[usize; 4]>,
    offset: usize,
    remaining: usize,
}

impl<'a> StridedOffsets<'a> {
    fn new(view: View<'a>) -> Self {
        Self {
            view,
            coords: SmallVec::from_elem(0, view.rank()),
            offset: 0,
            remaining: view.numel(),
        }
    }
}

impl Iterator for StridedOffsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.offset;
        self.remaining -= 1;

        // Increment coordinates rightmost first, carrying into earlier axes.
        for axis in (0..self.coords.len()).rev() {
            self.coords[axis] += 1;
            self.offset += self.view.strides[axis];
            if self.coords[axis] < self.view.shape[axis] {
                break;
            }
            self.offset -= self.coords[axis] * self.view.strides[axis];
            self.coords[axis] = 0;
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StridedOffsets<'_> {}

/// Owned (shape, strides) pair, for callers and tests that need to build
/// transposed or broadcast views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Shape,
    strides: Strides,
}

impl Layout {
    /// Row-major layout for `shape`.
    pub fn contiguous(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let strides = shape.contiguous_strides();
        Self { shape, strides }
    }

    pub fn new(shape: impl Into<Shape>, strides: &[usize]) -> Self {
        let shape = shape.into();
        debug_assert_eq!(shape.rank(), strides.len());
        Self {
            shape,
            strides: SmallVec::from_slice(strides),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn view(&self) -> View<'_> {
        View::new(self.shape.dims(), &self.strides)
    }

    pub fn is_contiguous(&self) -> bool {
        self.view().is_contiguous()
    }

    /// Swap two axes without moving data.
    pub fn transpose(&self, a: usize, b: usize) -> Option<Layout> {
        if a >= self.shape.rank() || b >= self.shape.rank() {
            return None;
        }
        let mut dims: SmallVec<[usize; 4]> = SmallVec::from_slice(self.shape.dims());
        let mut strides = self.strides.clone();
        dims.swap(a, b);
        strides.swap(a, b);
        Some(Layout {
            shape: Shape::new(&dims),
            strides,
        })
    }

    /// View this layout as `target` by giving broadcast axes a zero stride.
    ///
    /// Axes are aligned from the right; a missing or size-1 axis may stretch
    /// to any extent.
    pub fn broadcast_as(&self, target: &Shape) -> Option<Layout> {
        let rank = self.shape.rank();
        let target_rank = target.rank();
        if rank > target_rank {
            return None;
        }
        let mut strides: Strides = SmallVec::from_elem(0, target_rank);
        for i in 0..rank {
            let src_axis = rank - 1 - i;
            let dst_axis = target_rank - 1 - i;
            let src_dim = self.shape.dims()[src_axis];
            let dst_dim = target.dims()[dst_axis];
            if src_dim == dst_dim {
                strides[dst_axis] = self.strides[src_axis];
            } else if src_dim != 1 {
                return None;
            }
        }
        Some(Layout {
            shape: target.clone(),
            strides,
        })
    }
}

impl From<Shape> for Layout {
    fn from(shape: Shape) -> Self {
        let strides = contiguous_strides(shape.dims());
        Self { shape, strides }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_detection() {
        let l = Layout::contiguous([2, 3, 4]);
        assert!(l.is_contiguous());
        assert!(!l.transpose(0, 2).unwrap().is_contiguous());
        assert!(is_contiguous(View::new(&[], &[])));
        assert!(!is_contiguous(View::new(&[2, 3], &[1, 2])));
    }

    #[test]
    fn test_size_one_axis_stride_must_match() {
        // A size-1 axis still has to carry its canonical stride.
        assert!(is_contiguous(View::new(&[1, 3], &[3, 1])));
        assert!(!is_contiguous(View::new(&[1, 3], &[0, 1])));
    }

    #[test]
    fn test_offset_identity_when_contiguous() {
        for dims in [vec![5], vec![2, 3], vec![2, 3, 4], vec![1, 4, 1, 2]] {
            let l = Layout::contiguous(Shape::new(&dims));
            for i in 0..l.numel() {
                assert_eq!(physical_offset(i, l.view()), i);
            }
        }
    }

    #[test]
    fn test_offset_transposed() {
        // Logical [3, 2] view of a row-major [2, 3] buffer.
        let l = Layout::contiguous([2, 3]).transpose(0, 1).unwrap();
        let offsets: Vec<usize> = (0..6).map(|i| l.view().offset(i)).collect();
        assert_eq!(offsets, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_offset_broadcast() {
        let row = Layout::contiguous([3]);
        let b = row.broadcast_as(&Shape::new(&[2, 3])).unwrap();
        assert_eq!(b.strides(), &[0, 1]);
        let offsets: Vec<usize> = (0..6).map(|i| b.view().offset(i)).collect();
        assert_eq!(offsets, vec![0, 1, 2, 0, 1, 2]);

        let col = Layout::contiguous([2, 1]);
        let c = col.broadcast_as(&Shape::new(&[2, 3])).unwrap();
        assert_eq!(c.strides(), &[1, 0]);

        assert!(row.broadcast_as(&Shape::new(&[4])).is_none());
    }

    #[test]
    fn test_offsets_iterator_matches_physical_offset() {
        let base = Layout::contiguous([2, 3, 4]);
        let views = [
            base.clone(),
            base.transpose(0, 2).unwrap(),
            base.transpose(1, 2).unwrap(),
            Layout::contiguous([3, 1])
                .broadcast_as(&Shape::new(&[2, 3, 4]))
                .unwrap(),
        ];
        for l in &views {
            let fast: Vec<usize> = l.view().offsets().collect();
            let slow: Vec<usize> = (0..l.numel()).map(|i| l.view().offset(i)).collect();
            assert_eq!(fast, slow);
        }
    }

    #[test]
    fn test_offsets_scalar_and_empty() {
        let scalar = Layout::contiguous(Shape::scalar());
        assert_eq!(scalar.view().offsets().collect::<Vec<_>>(), vec![0]);

        let empty = Layout::contiguous([3, 0]);
        assert_eq!(empty.view().offsets().count(), 0);
    }
}
