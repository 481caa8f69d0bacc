//! Algorithms for looking for arrays in other arrays

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

use ecow::EcoVec;

use crate::{
    array::{Array, ArrayValue},
    RuntimeErrorKind, RuntimeResult, Shape,
};

/// A row ordered by its elements, then by its length
struct RowKey<'a, T>(&'a [T]);

impl<T: ArrayValue> Ord for RowKey<'_, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.iter())
            .zip(other.0)
            .map(|(a, b)| a.array_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

impl<T: ArrayValue> PartialOrd for RowKey<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ArrayValue> PartialEq for RowKey<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl<T: ArrayValue> Eq for RowKey<'_, T> {}

impl<T: ArrayValue> Array<T> {
    fn row_keys(&self) -> impl Iterator<Item = RowKey<'_, T>> {
        (0..self.row_count()).map(|i| RowKey(self.row_slice(i)))
    }
    /// Mark where this array occurs in `haystack`
    ///
    /// The result has the haystack's shape, with a 1 at each position where
    /// a copy of this array starts. Missing leading axes of this array count
    /// as length 1. An empty array is never found.
    pub fn find(&self, haystack: &Self) -> Array<bool> {
        let mut found = EcoVec::from_elem(false, haystack.element_count());
        let rank = haystack.rank();
        if self.rank() > rank || self.data.is_empty() {
            return Array::new(haystack.shape.clone(), found);
        }
        let mut needle_shape = self.shape.clone();
        while needle_shape.len() < rank {
            needle_shape.prepend(1);
        }
        let mut corner = Vec::with_capacity(rank);
        let mut offset = Vec::with_capacity(rank);
        let mut index = Vec::with_capacity(rank);
        for (flat, found) in found.make_mut().iter_mut().enumerate() {
            haystack.shape.flat_to_dims(flat, &mut corner);
            *found = self.data.iter().enumerate().all(|(i, elem)| {
                needle_shape.flat_to_dims(i, &mut offset);
                index.clear();
                index.extend(corner.iter().zip(&offset).map(|(c, o)| c + o));
                (haystack.shape.dims_to_flat(&index))
                    .is_some_and(|j| haystack.data[j].array_eq(elem))
            });
        }
        Array::new(haystack.shape.clone(), found)
    }
    /// Check which rows of this array are rows of `of`
    ///
    /// If this array has a higher rank, each of its rows is checked. If it
    /// has a lower rank, it is checked against each row of `of`.
    pub fn member(&self, of: &Self) -> RuntimeResult<Array<bool>> {
        match self.rank().cmp(&of.rank()) {
            Ordering::Equal => {
                let members: BTreeSet<RowKey<T>> = of.row_keys().collect();
                let found: EcoVec<bool> =
                    (self.row_keys()).map(|row| members.contains(&row)).collect();
                Ok(Array::new(leading_axis(&self.shape), found))
            }
            Ordering::Greater => {
                let rows = self.rows().map(|row| row.member(of));
                Array::from_row_arrays(rows.collect::<RuntimeResult<Vec<_>>>()?)
            }
            Ordering::Less => {
                self.check_within(of)?;
                if of.rank() - self.rank() == 1 {
                    let this = RowKey(self.data.as_slice());
                    return Ok(Array::scalar(of.row_keys().any(|row| row == this)));
                }
                let rows = of.rows().map(|row| self.member(&row));
                Array::from_row_arrays(rows.collect::<RuntimeResult<Vec<_>>>()?)
            }
        }
    }
    /// Find the index of each row of this array in `of`
    ///
    /// Rows that are missing get the row count of `of`. Ranks are handled
    /// as in [`Array::member`].
    pub fn index_of(&self, of: &Self) -> RuntimeResult<Array<i64>> {
        let missing = of.row_count() as i64;
        match self.rank().cmp(&of.rank()) {
            Ordering::Equal => {
                let mut indices = BTreeMap::new();
                for (i, row) in of.row_keys().enumerate() {
                    indices.entry(row).or_insert(i as i64);
                }
                let found: EcoVec<i64> = (self.row_keys())
                    .map(|row| indices.get(&row).copied().unwrap_or(missing))
                    .collect();
                Ok(Array::new(leading_axis(&self.shape), found))
            }
            Ordering::Greater => {
                let rows = self.rows().map(|row| row.index_of(of));
                Array::from_row_arrays(rows.collect::<RuntimeResult<Vec<_>>>()?)
            }
            Ordering::Less => {
                self.check_within(of)?;
                if of.rank() - self.rank() == 1 {
                    let this = RowKey(self.data.as_slice());
                    let index = of.row_keys().position(|row| row == this);
                    return Ok(Array::scalar(index.map_or(missing, |i| i as i64)));
                }
                let rows = of.rows().map(|row| self.index_of(&row));
                Array::from_row_arrays(rows.collect::<RuntimeResult<Vec<_>>>()?)
            }
        }
    }
    /// Check that this array could be a cell of `of`
    fn check_within(&self, of: &Self) -> RuntimeResult<()> {
        if of.shape.ends_with(&self.shape) {
            Ok(())
        } else {
            Err(RuntimeErrorKind::ShapeMismatch {
                a: self.shape.clone(),
                b: of.shape.clone(),
            })
        }
    }
}

/// The shape of one result per row
fn leading_axis(shape: &Shape) -> Shape {
    shape.iter().copied().take(1).collect()
}
