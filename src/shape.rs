use std::{
    fmt,
    hash::Hash,
    ops::{Deref, DerefMut},
};

use serde::*;
use tinyvec::{tiny_vec, TinyVec};

/// Strata's array shape type
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: TinyVec<[usize; 3]>,
}

impl Shape {
    /// Create a new shape with no dimensions
    pub fn scalar() -> Self {
        Shape { dims: tiny_vec![] }
    }
    /// Create a new scalar shape with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Shape {
            dims: TinyVec::with_capacity(capacity),
        }
    }
    /// Add a trailing dimension
    pub fn push(&mut self, dim: usize) {
        self.dims.push(dim);
    }
    /// Insert a dimension at the given index
    pub fn insert(&mut self, index: usize, dim: usize) {
        self.dims.insert(index, dim);
    }
    /// Prepend a dimension
    pub fn prepend(&mut self, dim: usize) {
        self.dims.insert(0, dim);
    }
    /// Get the row count
    ///
    /// A scalar has one row.
    pub fn row_count(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }
    /// Get the row shape
    pub fn row(&self) -> Shape {
        let mut shape = self.clone();
        shape.make_row();
        shape
    }
    /// Get the number of elements in one row
    pub fn row_len(&self) -> usize {
        checked_product(self.iter().skip(1)).unwrap_or(usize::MAX)
    }
    /// Get the number of elements
    ///
    /// Saturates at `usize::MAX` if the count overflows.
    pub fn elements(&self) -> usize {
        self.checked_elements().unwrap_or(usize::MAX)
    }
    /// Get the number of elements, or `None` if the count overflows
    pub fn checked_elements(&self) -> Option<usize> {
        checked_product(self.iter())
    }
    /// Make the shape its row shape
    pub fn make_row(&mut self) {
        if !self.dims.is_empty() {
            self.dims.remove(0);
        }
    }
    /// Get a reference to the dimensions
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }
    /// Convert a flat index into one index per axis
    pub(crate) fn flat_to_dims(&self, flat: usize, index: &mut Vec<usize>) {
        index.clear();
        let mut flat = flat;
        for &dim in self.dims.iter().rev() {
            index.push(flat % dim);
            flat /= dim;
        }
        index.reverse();
    }
    /// Convert one index per axis into a flat index
    ///
    /// Returns `None` if any index is out of bounds.
    pub(crate) fn dims_to_flat(&self, index: &[usize]) -> Option<usize> {
        let mut flat = 0;
        for (&dim, &i) in self.dims.iter().zip(index) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        Some(flat)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, " × ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<usize> for Shape {
    fn from(dim: usize) -> Self {
        Self::from([dim])
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self {
            dims: dims.iter().copied().collect(),
        }
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        dims.as_slice().into()
    }
}

impl Deref for Shape {
    type Target = [usize];
    fn deref(&self) -> &Self::Target {
        &self.dims
    }
}

impl DerefMut for Shape {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dims
    }
}

impl<'a> IntoIterator for &'a Shape {
    type Item = &'a usize;
    type IntoIter = <&'a [usize] as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        self.dims.iter()
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            dims: iter.into_iter().collect(),
        }
    }
}

impl Extend<usize> for Shape {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        self.dims.extend(iter);
    }
}

impl<const N: usize> PartialEq<[usize; N]> for Shape {
    fn eq(&self, other: &[usize; N]) -> bool {
        self.dims() == other.as_slice()
    }
}

impl PartialEq<[usize]> for Shape {
    fn eq(&self, other: &[usize]) -> bool {
        self.dims() == other
    }
}

/// A product that is zero if any factor is, even when the rest overflow
fn checked_product<'a>(mut dims: impl Iterator<Item = &'a usize> + Clone) -> Option<usize> {
    if dims.clone().any(|&dim| dim == 0) {
        return Some(0);
    }
    dims.try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_has_one_element() {
        let scalar = Shape::scalar();
        assert_eq!(scalar.elements(), 1);
        assert_eq!(scalar.row_count(), 1);
        assert_eq!(Shape::from([2, 0, 3]).elements(), 0);
    }

    #[test]
    fn element_counts_do_not_overflow() {
        let huge = Shape::from([1 << 40, 1 << 40, 2]);
        assert_eq!(huge.checked_elements(), None);
        assert_eq!(huge.elements(), usize::MAX);
        assert_eq!(Shape::from([1 << 40, 1 << 40, 0]).checked_elements(), Some(0));
        assert_eq!(Shape::from([2, 3]).checked_elements(), Some(6));
    }

    #[test]
    fn rows() {
        let shape = Shape::from([2, 3, 4]);
        assert_eq!(shape.row(), [3, 4]);
        assert_eq!(shape.row_len(), 12);
        assert_eq!(shape.to_string(), "[2 × 3 × 4]");
    }

    #[test]
    fn flat_indices() {
        let shape = Shape::from([2, 3]);
        let mut index = Vec::new();
        shape.flat_to_dims(4, &mut index);
        assert_eq!(index, [1, 1]);
        assert_eq!(shape.dims_to_flat(&index), Some(4));
        assert_eq!(shape.dims_to_flat(&[2, 0]), None);
    }
}
