//! Algorithms for dyadic array operations
//!
//! As with pervasive operations, `self` is the value that was on top of the
//! stack and `other` is the one below it.

use crate::{val_as_arr, RuntimeErrorKind, RuntimeResult, Shape, Value};

macro_rules! same_type {
    ($a:expr, $b:expr, |$x:ident, $y:ident| $body:expr) => {
        match Value::unify_pair($a, $b)? {
            (Value::Bool($x), Value::Bool($y)) => $body,
            (Value::Int($x), Value::Int($y)) => $body,
            (Value::Real($x), Value::Real($y)) => $body,
            (Value::Complex($x), Value::Complex($y)) => $body,
            (Value::Char($x), Value::Char($y)) => $body,
            (Value::Box($x), Value::Box($y)) => $body,
            (a, b) => {
                return Err(RuntimeErrorKind::Type(
                    format!("Cannot combine {} and {} arrays", a.type_name(), b.type_name())
                        .into(),
                ))
            }
        }
    };
}

impl Value {
    /// `≍` check whether two values are the same
    pub fn match_value(&self, other: &Value) -> Value {
        self.matches(other).into()
    }
    /// `⊟` make two values the rows of a new array
    pub fn couple(self, other: Value) -> RuntimeResult<Value> {
        same_type!(self, other, |a, b| a.couple(b).map(Into::into))
    }
    /// `⊂` join two values end to end, `self` first
    pub fn join(self, other: Value) -> RuntimeResult<Value> {
        same_type!(self, other, |a, b| a.join(b).map(Into::into))
    }
    /// `⊏` select rows of `other` by the indices in `self`
    pub fn select(&self, other: &Value) -> RuntimeResult<Value> {
        let indices = self.as_index_array("Select's indices")?;
        val_as_arr!(other, |arr| arr.select(&indices).map(Into::into))
    }
    /// `⊡` pick the row or element of `other` at the index in `self`
    pub fn pick(&self, other: &Value) -> RuntimeResult<Value> {
        let index = self.as_ints("Pick's index")?;
        val_as_arr!(other, |arr| arr.pick(&index).map(Into::into))
    }
    /// `↯` give `other` the shape in `self`
    pub fn reshape(&self, other: Value) -> RuntimeResult<Value> {
        let dims = self.as_ints("Reshape's shape")?;
        let mut shape = Shape::with_capacity(dims.len());
        for dim in dims {
            let dim = usize::try_from(dim).map_err(|_| {
                RuntimeErrorKind::Domain(format!("Cannot reshape to negative dimension {dim}").into())
            })?;
            shape.push(dim);
        }
        val_as_arr!(other, |arr| arr.reshape(shape).map(Into::into))
    }
    /// `↙` take rows from `other`
    pub fn take(&self, other: Value) -> RuntimeResult<Value> {
        let n = self.as_int("Take's count")?;
        val_as_arr!(other, |arr| arr.take(n).map(Into::into))
    }
    /// `↘` drop rows from `other`
    pub fn drop(&self, other: Value) -> RuntimeResult<Value> {
        let n = self.as_int("Drop's count")?;
        val_as_arr!(other, |arr| arr.drop(n).map(Into::into))
    }
    /// `↻` rotate the rows of `other`
    pub fn rotate(&self, other: Value) -> RuntimeResult<Value> {
        let n = self.as_int("Rotation amount")?;
        Ok(val_as_arr!(other, |arr| arr.rotate(n).into()))
    }
    /// `▽` repeat the rows of `other` by the counts in `self`
    ///
    /// A scalar count applies to every row.
    pub fn keep(&self, other: Value) -> RuntimeResult<Value> {
        let counts = if self.rank() == 0 {
            vec![self.as_nat("Keep's count")?; other.row_count()]
        } else {
            let counts = self.as_ints("Keep's counts")?;
            (counts.into_iter())
                .map(|n| {
                    usize::try_from(n).map_err(|_| {
                        RuntimeErrorKind::Domain(
                            format!("Keep's counts must be natural numbers, but one is {n}")
                                .into(),
                        )
                    })
                })
                .collect::<RuntimeResult<Vec<_>>>()?
        };
        val_as_arr!(other, |arr| arr.keep(&counts).map(Into::into))
    }
    /// `◫` get the windows of `other` with the size in `self`
    pub fn windows(&self, other: &Value) -> RuntimeResult<Value> {
        let size = self.as_int("Window size")?;
        val_as_arr!(other, |arr| arr.windows(size).map(Into::into))
    }
    /// `⌕` mark where `self` occurs in `other`
    pub fn find(self, other: Value) -> RuntimeResult<Value> {
        same_type!(self, other, |a, b| Ok(a.find(&b).into()))
    }
    /// `∊` check whether the rows of `self` are rows of `other`
    pub fn member(self, other: Value) -> RuntimeResult<Value> {
        same_type!(self, other, |a, b| a.member(&b).map(Into::into))
    }
    /// `⊗` find the indices of the rows of `self` in `other`
    pub fn index_of(self, other: Value) -> RuntimeResult<Value> {
        same_type!(self, other, |a, b| a.index_of(&b).map(Into::into))
    }
}
