use std::{cmp::Ordering, fmt};

use ecow::{eco_vec, EcoVec};

use crate::{algorithm::validate_size, Complex, RuntimeErrorKind, RuntimeResult, Shape};

/// A Strata array
///
/// The data is stored flat in row-major order. The number of elements is
/// always the product of the shape's dimensions.
#[derive(Clone)]
pub struct Array<T> {
    /// The dimensions
    pub shape: Shape,
    /// The elements
    pub data: EcoVec<T>,
}

/// A type that can be the element of an [`Array`]
pub trait ArrayValue: Clone + fmt::Debug + Send + Sync + 'static {
    /// A name for the element type, used in error messages
    const NAME: &'static str;
    /// A total order used for sorting and matching
    fn array_cmp(&self, other: &Self) -> Ordering;
    /// Check two elements for exact equality
    fn array_eq(&self, other: &Self) -> bool {
        self.array_cmp(other).is_eq()
    }
    /// Format the element for display
    fn format_elem(&self) -> String;
}

impl ArrayValue for bool {
    const NAME: &'static str = "boolean";
    fn array_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn format_elem(&self) -> String {
        (*self as u8).to_string()
    }
}

impl ArrayValue for i64 {
    const NAME: &'static str = "integer";
    fn array_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn format_elem(&self) -> String {
        if *self < 0 {
            format!("¯{}", self.unsigned_abs())
        } else {
            self.to_string()
        }
    }
}

impl ArrayValue for f64 {
    const NAME: &'static str = "real";
    fn array_cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other)
            .unwrap_or_else(|| self.is_nan().cmp(&other.is_nan()))
    }
    fn format_elem(&self) -> String {
        format_real(*self)
    }
}

pub(crate) fn format_real(x: f64) -> String {
    if x.is_nan() {
        "NaN".into()
    } else if x == f64::INFINITY {
        "∞".into()
    } else if x == f64::NEG_INFINITY {
        "¯∞".into()
    } else if x < 0.0 {
        format!("¯{}", -x)
    } else {
        x.to_string()
    }
}

impl ArrayValue for Complex {
    const NAME: &'static str = "complex";
    fn array_cmp(&self, other: &Self) -> Ordering {
        self.re
            .array_cmp(&other.re)
            .then_with(|| self.im.array_cmp(&other.im))
    }
    fn format_elem(&self) -> String {
        format!("{}r{}i", format_real(self.re), format_real(self.im))
    }
}

impl ArrayValue for char {
    const NAME: &'static str = "character";
    fn array_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
    fn format_elem(&self) -> String {
        format!("@{}", self.escape_debug())
    }
}

impl<T: ArrayValue> Array<T> {
    /// Create an array from a shape and data
    pub fn new(shape: impl Into<Shape>, data: impl Into<EcoVec<T>>) -> Self {
        let shape = shape.into();
        let data = data.into();
        debug_assert_eq!(shape.elements(), data.len(), "{shape} does not fit the data");
        Array { shape, data }
    }
    /// Create a scalar array
    pub fn scalar(value: T) -> Self {
        Array::new(Shape::scalar(), eco_vec![value])
    }
    /// Create a list
    pub fn list(data: impl Into<EcoVec<T>>) -> Self {
        let data = data.into();
        Array::new(data.len(), data)
    }
    /// Get the number of dimensions
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.shape.row_count()
    }
    /// Get the number of elements in a row
    pub fn row_len(&self) -> usize {
        self.shape.row_len()
    }
    /// Get the number of elements
    pub fn element_count(&self) -> usize {
        self.data.len()
    }
    /// Get the only element of a scalar array
    pub fn as_scalar(&self) -> Option<&T> {
        if self.rank() == 0 {
            self.data.first()
        } else {
            None
        }
    }
    /// Get the row at the given index
    ///
    /// The index must be in bounds. A scalar is its own only row.
    pub fn row(&self, index: usize) -> Self {
        if self.rank() == 0 {
            return self.clone();
        }
        let row_len = self.row_len();
        let start = index * row_len;
        Array::new(
            self.shape.row(),
            self.data[start..start + row_len]
                .iter()
                .cloned()
                .collect::<EcoVec<_>>(),
        )
    }
    /// Iterate over the rows
    pub fn rows(&self) -> impl ExactSizeIterator<Item = Self> + '_ {
        (0..self.row_count()).map(|i| self.row(i))
    }
    /// Combine arrays of the same shape as the rows of a new array
    pub fn from_row_arrays(rows: impl IntoIterator<Item = Self>) -> RuntimeResult<Self> {
        let mut rows = rows.into_iter();
        let Some(first) = rows.next() else {
            return Ok(Array::new(0, EcoVec::new()));
        };
        let row_shape = first.shape;
        let mut data = first.data;
        let mut count = 1;
        for row in rows {
            if row.shape != row_shape {
                return Err(RuntimeErrorKind::ShapeMismatch {
                    a: row_shape,
                    b: row.shape,
                });
            }
            data.extend_from_slice(&row.data);
            count += 1;
        }
        let mut shape = row_shape;
        shape.prepend(count);
        Ok(Array::new(shape, data))
    }
    /// Map each element to a new type
    pub fn convert<U: ArrayValue>(self, f: impl Fn(T) -> U) -> Array<U> {
        Array {
            shape: self.shape,
            data: self.data.iter().cloned().map(f).collect(),
        }
    }
    /// Check that two arrays have the same shape and elements
    pub fn array_matches(&self, other: &Self) -> bool {
        self.shape == other.shape
            && (self.data.iter())
                .zip(other.data.iter())
                .all(|(a, b)| a.array_eq(b))
    }
    pub(crate) fn row_slice(&self, index: usize) -> &[T] {
        let row_len = self.row_len();
        &self.data[index * row_len..(index + 1) * row_len]
    }
    fn rows_from_indices(&self, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut shape = self.shape.clone();
        let mut data = EcoVec::new();
        let mut count = 0;
        for i in indices {
            data.extend_from_slice(self.row_slice(i));
            count += 1;
        }
        if let Some(first) = shape.first_mut() {
            *first = count;
        }
        Array::new(shape, data)
    }
    /// Reverse the order of the rows
    pub fn reverse(self) -> Self {
        if self.rank() == 0 {
            return self;
        }
        let count = self.row_count();
        self.rows_from_indices((0..count).rev())
    }
    /// Make the array one-dimensional
    pub fn deshape(mut self) -> Self {
        self.shape = Shape::from(self.data.len());
        self
    }
    /// Move the first axis to the end
    pub fn transpose(self) -> Self {
        if self.rank() < 2 {
            return self;
        }
        let rows = self.row_count();
        let row_len = self.row_len();
        let mut data = EcoVec::with_capacity(self.data.len());
        for k in 0..row_len {
            for i in 0..rows {
                data.push(self.data[i * row_len + k].clone());
            }
        }
        let mut shape: Shape = self.shape.iter().skip(1).copied().collect();
        shape.push(rows);
        Array::new(shape, data)
    }
    /// Get the first row
    pub fn first(self) -> RuntimeResult<Self> {
        if self.rank() == 0 {
            return Ok(self);
        }
        if self.row_count() == 0 {
            return Err(RuntimeErrorKind::IndexOutOfBounds { index: 0, len: 0 });
        }
        Ok(self.row(0))
    }
    /// Change the shape, cycling or truncating the data to fit
    pub fn reshape(self, shape: Shape) -> RuntimeResult<Self> {
        let count = validate_size::<T>(&shape)?;
        if count == 0 {
            return Ok(Array::new(shape, EcoVec::new()));
        }
        if self.data.is_empty() {
            return Err(RuntimeErrorKind::Domain(
                format!("Cannot reshape an empty array into shape {shape}").into(),
            ));
        }
        let data: EcoVec<T> = self.data.iter().cycle().take(count).cloned().collect();
        Ok(Array::new(shape, data))
    }
    fn count_in_bounds(&self, n: i64) -> RuntimeResult<usize> {
        let len = self.row_count();
        let abs = n.unsigned_abs();
        if self.rank() == 0 || abs > len as u64 {
            return Err(RuntimeErrorKind::IndexOutOfBounds {
                index: n,
                len: if self.rank() == 0 { 0 } else { len },
            });
        }
        Ok(abs as usize)
    }
    /// Take rows from the front, or from the back if `n` is negative
    pub fn take(self, n: i64) -> RuntimeResult<Self> {
        let abs = self.count_in_bounds(n)?;
        let len = self.row_count();
        Ok(if n >= 0 {
            self.rows_from_indices(0..abs)
        } else {
            self.rows_from_indices(len - abs..len)
        })
    }
    /// Drop rows from the front, or from the back if `n` is negative
    pub fn drop(self, n: i64) -> RuntimeResult<Self> {
        let abs = self.count_in_bounds(n)?;
        let len = self.row_count();
        Ok(if n >= 0 {
            self.rows_from_indices(abs..len)
        } else {
            self.rows_from_indices(0..len - abs)
        })
    }
    /// Rotate the rows so that row `n` comes first
    pub fn rotate(self, n: i64) -> Self {
        let len = self.row_count();
        if self.rank() == 0 || len == 0 {
            return self;
        }
        let shift = n.rem_euclid(len as i64) as usize;
        self.rows_from_indices((shift..len).chain(0..shift))
    }
    /// Select rows by index
    ///
    /// The result has the shape of the indices followed by the row shape.
    pub fn select(&self, indices: &Array<i64>) -> RuntimeResult<Self> {
        if self.rank() == 0 {
            return Err(RuntimeErrorKind::Domain("Cannot select from a scalar".into()));
        }
        let len = self.row_count();
        let mut rows = Vec::with_capacity(indices.data.len());
        for &i in indices.data.iter() {
            rows.push(checked_index(i, len)?);
        }
        let mut selected = self.rows_from_indices(rows);
        let mut shape = indices.shape.clone();
        shape.extend(self.shape.iter().skip(1).copied());
        selected.shape = shape;
        Ok(selected)
    }
    /// Pick a row or element at a multidimensional index
    pub fn pick(&self, index: &[i64]) -> RuntimeResult<Self> {
        if index.len() > self.rank() {
            return Err(RuntimeErrorKind::Domain(
                format!(
                    "Cannot pick with an index of length {} from a rank {} array",
                    index.len(),
                    self.rank()
                )
                .into(),
            ));
        }
        let mut start = 0;
        let mut stride = self.data.len();
        for (&i, &dim) in index.iter().zip(self.shape.iter()) {
            let i = checked_index(i, dim)?;
            stride /= dim;
            start += i * stride;
        }
        let shape: Shape = self.shape.iter().skip(index.len()).copied().collect();
        let data: EcoVec<T> = self.data[start..start + stride].iter().cloned().collect();
        Ok(Array::new(shape, data))
    }
    /// Join two arrays end to end
    ///
    /// Arrays of the same rank join along the first axis. An array whose rank
    /// is one less than the other's is joined as a single row.
    pub fn join(self, other: Self) -> RuntimeResult<Self> {
        let mismatch = |a: &Self, b: &Self| RuntimeErrorKind::ShapeMismatch {
            a: a.shape.clone(),
            b: b.shape.clone(),
        };
        match self.rank().cmp(&other.rank()) {
            Ordering::Equal if self.rank() == 0 => {
                let mut data = self.data;
                data.extend_from_slice(&other.data);
                Ok(Array::list(data))
            }
            Ordering::Equal => {
                if self.shape[1..] != other.shape[1..] {
                    return Err(mismatch(&self, &other));
                }
                let mut shape = self.shape.clone();
                shape[0] += other.row_count();
                let mut data = self.data;
                data.extend_from_slice(&other.data);
                Ok(Array::new(shape, data))
            }
            Ordering::Less => {
                if self.shape.dims() != &other.shape[1..] {
                    return Err(mismatch(&self, &other));
                }
                let mut shape = other.shape.clone();
                shape[0] += 1;
                let mut data = self.data;
                data.extend_from_slice(&other.data);
                Ok(Array::new(shape, data))
            }
            Ordering::Greater => {
                if &self.shape[1..] != other.shape.dims() {
                    return Err(mismatch(&self, &other));
                }
                let mut shape = self.shape.clone();
                shape[0] += 1;
                let mut data = self.data;
                data.extend_from_slice(&other.data);
                Ok(Array::new(shape, data))
            }
        }
    }
    /// Make two arrays of the same shape the rows of a new array
    pub fn couple(self, other: Self) -> RuntimeResult<Self> {
        Array::from_row_arrays([self, other])
    }
    /// Get the indices that would sort the rows
    pub fn rise(&self) -> Array<i64> {
        let mut indices: Vec<usize> = (0..self.row_count()).collect();
        if self.rank() > 0 {
            indices.sort_by(|&a, &b| self.cmp_rows(a, b));
        }
        Array::list(indices.into_iter().map(|i| i as i64).collect::<EcoVec<_>>())
    }
    /// Get the indices that would sort the rows descending
    pub fn fall(&self) -> Array<i64> {
        let mut indices: Vec<usize> = (0..self.row_count()).collect();
        if self.rank() > 0 {
            indices.sort_by(|&a, &b| self.cmp_rows(b, a));
        }
        Array::list(indices.into_iter().map(|i| i as i64).collect::<EcoVec<_>>())
    }
    /// Repeat each row by its count
    ///
    /// There must be one count per row. A scalar counts as one row and
    /// becomes a list.
    pub fn keep(&self, counts: &[usize]) -> RuntimeResult<Self> {
        let rows = if self.rank() == 0 { 1 } else { self.row_count() };
        if counts.len() != rows {
            return Err(RuntimeErrorKind::ShapeMismatch {
                a: Shape::from(counts.len()),
                b: self.shape.clone(),
            });
        }
        let total = (counts.iter())
            .try_fold(0usize, |acc, &n| acc.checked_add(n))
            .ok_or_else(|| RuntimeErrorKind::Domain("Keep's counts are too large".into()))?;
        let mut shape = self.shape.row();
        shape.prepend(total);
        let elements = validate_size::<T>(&shape)?;
        let mut data = EcoVec::with_capacity(elements);
        if elements > 0 {
            for (i, &n) in counts.iter().enumerate() {
                for _ in 0..n {
                    data.extend_from_slice(self.row_slice(i));
                }
            }
        }
        Ok(Array::new(shape, data))
    }
    /// Get every run of `size` consecutive rows
    ///
    /// A negative size counts back from one more than the row count. A size
    /// larger than the row count gives no windows.
    pub fn windows(&self, size: i64) -> RuntimeResult<Self> {
        if self.rank() == 0 {
            return Err(RuntimeErrorKind::Domain(
                "Cannot get the windows of a scalar".into(),
            ));
        }
        if size == 0 {
            return Err(RuntimeErrorKind::Domain("Window size cannot be zero".into()));
        }
        let len = self.row_count();
        let size = if size > 0 {
            usize::try_from(size).unwrap_or(usize::MAX)
        } else {
            let back = usize::try_from(size.unsigned_abs()).unwrap_or(usize::MAX);
            (len + 1).saturating_sub(back)
        };
        let count = if size == 0 || size > len { 0 } else { len - size + 1 };
        let mut shape = self.shape.row();
        shape.prepend(size);
        shape.prepend(count);
        let elements = validate_size::<T>(&shape)?;
        let row_len = self.row_len();
        let mut data = EcoVec::with_capacity(elements);
        for start in 0..count {
            data.extend_from_slice(&self.data[start * row_len..(start + size) * row_len]);
        }
        Ok(Array::new(shape, data))
    }
    fn cmp_rows(&self, a: usize, b: usize) -> Ordering {
        (self.row_slice(a).iter())
            .zip(self.row_slice(b))
            .map(|(a, b)| a.array_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// Check that an index is within `0..len`
pub(crate) fn checked_index(index: i64, len: usize) -> RuntimeResult<usize> {
    if index < 0 || index as u64 >= len as u64 {
        return Err(RuntimeErrorKind::IndexOutOfBounds { index, len });
    }
    Ok(index as usize)
}

impl<T: ArrayValue> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        self.array_matches(other)
    }
}

impl<T: ArrayValue> Eq for Array<T> {}

impl<T: ArrayValue> PartialOrd for Array<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ArrayValue> Ord for Array<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.shape.cmp(&other.shape).then_with(|| {
            (self.data.iter())
                .zip(other.data.iter())
                .map(|(a, b)| a.array_cmp(b))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }
}

impl<T: ArrayValue> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_nested())
    }
}

impl<T: ArrayValue> Array<T> {
    pub(crate) fn format_nested(&self) -> String {
        if self.rank() == 0 {
            return self.data.first().map(T::format_elem).unwrap_or_default();
        }
        let rows: Vec<String> = self.rows().map(|row| row.format_nested()).collect();
        format!("[{}]", rows.join(" "))
    }
}

impl<T: ArrayValue> From<T> for Array<T> {
    fn from(value: T) -> Self {
        Array::scalar(value)
    }
}

impl<T: ArrayValue> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Array::list(iter.into_iter().collect::<EcoVec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iota(shape: impl Into<Shape>) -> Array<i64> {
        let shape = shape.into();
        let data: EcoVec<i64> = (0..shape.elements() as i64).collect();
        Array::new(shape, data)
    }

    #[test]
    fn transpose_moves_first_axis_last() {
        let arr = iota([2, 3]).transpose();
        assert_eq!(arr.shape, [3, 2]);
        assert_eq!(arr.data.as_slice(), [0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn reshape_cycles_and_truncates() {
        let arr = iota(4).reshape(Shape::from([2, 3])).unwrap();
        assert_eq!(arr.data.as_slice(), [0, 1, 2, 3, 0, 1]);
        let arr = iota(6).reshape(Shape::from(2)).unwrap();
        assert_eq!(arr.data.as_slice(), [0, 1]);
        let empty = Array::<i64>::new(0, EcoVec::new());
        assert!(matches!(
            empty.reshape(Shape::from(3)),
            Err(RuntimeErrorKind::Domain(_))
        ));
    }

    #[test]
    fn keep_repeats_rows() {
        let list = Array::list([7i64, 8, 9].as_slice());
        assert_eq!(list.keep(&[1, 0, 2]).unwrap().data.as_slice(), [7, 9, 9]);
        let matrix = iota([2, 2]).keep(&[0, 3]).unwrap();
        assert_eq!(matrix.shape, [3, 2]);
        assert_eq!(matrix.data.as_slice(), [2, 3, 2, 3, 2, 3]);
        let scalar = Array::scalar(5i64).keep(&[3]).unwrap();
        assert_eq!(scalar.shape, [3]);
        assert!(matches!(
            list.keep(&[1, 2]),
            Err(RuntimeErrorKind::ShapeMismatch { .. })
        ));
        assert!(matches!(
            list.keep(&[usize::MAX, 1, 0]),
            Err(RuntimeErrorKind::Domain(_))
        ));
    }

    #[test]
    fn windows_of_rows() {
        let windows = iota(4).windows(2).unwrap();
        assert_eq!(windows.shape, [3, 2]);
        assert_eq!(windows.data.as_slice(), [0, 1, 1, 2, 2, 3]);
        assert_eq!(iota(4).windows(-2).unwrap().shape, [2, 3]);
        assert_eq!(iota(4).windows(-1).unwrap().shape, [1, 4]);
        let matrix = iota([3, 2]).windows(3).unwrap();
        assert_eq!(matrix.shape, [1, 3, 2]);
        let none = iota(2).windows(5).unwrap();
        assert_eq!(none.shape, [0, 5]);
        assert!(none.data.is_empty());
        assert!(iota(4).windows(0).is_err());
        assert!(Array::scalar(1i64).windows(1).is_err());
    }

    #[test]
    fn reshape_refuses_huge_shapes() {
        let overflowing = Shape::from([1 << 32, 1 << 32, 2]);
        assert!(matches!(
            iota(2).reshape(overflowing),
            Err(RuntimeErrorKind::Domain(_))
        ));
        assert!(matches!(
            iota(2).reshape(Shape::from([100_000, 100_000])),
            Err(RuntimeErrorKind::Domain(_))
        ));
        let empty = iota(2).reshape(Shape::from([1 << 40, 1 << 40, 0])).unwrap();
        assert!(empty.data.is_empty());
    }

    #[test]
    fn take_and_drop_are_strict() {
        let arr = iota(5);
        assert_eq!(arr.clone().take(-2).unwrap().data.as_slice(), [3, 4]);
        assert_eq!(arr.clone().drop(2).unwrap().data.as_slice(), [2, 3, 4]);
        assert_eq!(
            arr.take(6).unwrap_err(),
            RuntimeErrorKind::IndexOutOfBounds { index: 6, len: 5 }
        );
    }

    #[test]
    fn pick_and_select() {
        let arr = iota([2, 3]);
        assert_eq!(arr.pick(&[1, 2]).unwrap().as_scalar(), Some(&5));
        assert_eq!(arr.pick(&[1]).unwrap().data.as_slice(), [3, 4, 5]);
        assert!(matches!(
            arr.pick(&[-1]),
            Err(RuntimeErrorKind::IndexOutOfBounds { index: -1, len: 2 })
        ));
        let picked = arr.select(&Array::list([1i64, 0, 1].as_slice())).unwrap();
        assert_eq!(picked.shape, [3, 3]);
    }

    #[test]
    fn join_ranks() {
        let joined = Array::scalar(1i64).join(Array::list([2i64, 3].as_slice())).unwrap();
        assert_eq!(joined.data.as_slice(), [1, 2, 3]);
        let joined = iota([2, 3]).join(iota([1, 3])).unwrap();
        assert_eq!(joined.shape, [3, 3]);
        assert!(matches!(
            iota([2, 3]).join(iota([2, 2])),
            Err(RuntimeErrorKind::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rise_and_fall() {
        let arr = Array::list([3i64, 1, 2].as_slice());
        assert_eq!(arr.rise().data.as_slice(), [1, 2, 0]);
        assert_eq!(arr.fall().data.as_slice(), [0, 2, 1]);
        assert_eq!(arr.rotate(1).data.as_slice(), [1, 2, 3]);
    }
}
