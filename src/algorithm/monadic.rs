//! Algorithms for monadic array operations

use ecow::EcoVec;

use crate::{
    algorithm::validate_size, array::Array, val_as_arr, Boxed, RuntimeErrorKind, RuntimeResult,
    Value,
};

impl Value {
    /// `⧻` the number of rows
    pub fn len_value(&self) -> Value {
        Value::from(self.row_count() as i64)
    }
    /// `△` the shape as a list
    pub fn shape_value(&self) -> Value {
        let dims: EcoVec<i64> = self.shape().iter().map(|&d| d as i64).collect();
        Array::list(dims).into()
    }
    /// `⇡` the natural numbers below a number
    pub fn range(&self) -> RuntimeResult<Value> {
        let n = self.as_nat("Range's argument")?;
        validate_size::<i64>(&[n])?;
        let data: EcoVec<i64> = (0..n as i64).collect();
        Ok(Array::list(data).into())
    }
    /// `⊢` the first row
    pub fn first(self) -> RuntimeResult<Value> {
        val_as_arr!(self, |arr| arr.first().map(Into::into))
    }
    /// `⇌` reverse the rows
    pub fn reverse(self) -> Value {
        val_as_arr!(self, |arr| arr.reverse().into())
    }
    /// `♭` make the value one-dimensional
    pub fn deshape(self) -> Value {
        val_as_arr!(self, |arr| arr.deshape().into())
    }
    /// `⍉` move the first axis to the end
    pub fn transpose(self) -> Value {
        val_as_arr!(self, |arr| arr.transpose().into())
    }
    /// `⍏` the indices that sort the rows ascending
    pub fn rise(&self) -> Value {
        val_as_arr!(self, |arr| arr.rise().into())
    }
    /// `⍖` the indices that sort the rows descending
    pub fn fall(&self) -> Value {
        val_as_arr!(self, |arr| arr.fall().into())
    }
    /// `□` put the value in a box
    pub fn boxed(self) -> Value {
        Boxed(self).into()
    }
    /// `⊔` take the value out of its box
    ///
    /// Values that are not boxes are returned unchanged.
    pub fn unboxed(self) -> RuntimeResult<Value> {
        match self {
            Value::Box(arr) => match arr.as_scalar() {
                Some(boxed) => Ok(boxed.as_value().clone()),
                None => Err(RuntimeErrorKind::Domain(
                    format!("Cannot unbox an array of shape {}", arr.shape).into(),
                )),
            },
            value => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_and_shape() {
        let range = Value::from(4i64).range().unwrap();
        assert_eq!(range, Value::from([0i64, 1, 2, 3]));
        assert_eq!(range.shape_value(), Value::from([4i64]));
        assert!(Value::from(-1i64).range().is_err());
        assert!(matches!(
            Value::from(1i64 << 40).range(),
            Err(RuntimeErrorKind::Domain(_))
        ));
    }

    #[test]
    fn first_of_empty_is_out_of_bounds() {
        let empty = Value::from_row_values(Vec::new()).unwrap();
        assert_eq!(
            empty.first(),
            Err(RuntimeErrorKind::IndexOutOfBounds { index: 0, len: 0 })
        );
    }

    #[test]
    fn boxing() {
        let value = Value::from([1i64, 2]);
        let boxed = value.clone().boxed();
        assert_eq!(boxed.rank(), 0);
        assert_eq!(boxed.unboxed(), Ok(value.clone()));
        assert_eq!(value.clone().unboxed(), Ok(value));
    }
}
