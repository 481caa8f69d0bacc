use std::{cmp::Ordering, fmt};

use ecow::EcoVec;

use crate::{
    array::{Array, ArrayValue},
    Boxed, Complex, RuntimeErrorKind, RuntimeResult, Shape,
};

/// A Strata value
///
/// Every value is an array. Scalars are arrays with an empty shape.
#[derive(Clone)]
pub enum Value {
    /// Booleans, which are the results of comparisons
    Bool(Array<bool>),
    /// 64-bit integers
    Int(Array<i64>),
    /// 64-bit floating point numbers
    Real(Array<f64>),
    /// Complex numbers
    Complex(Array<Complex>),
    /// Unicode characters
    Char(Array<char>),
    /// Boxed values
    Box(Array<Boxed>),
}

/// Run the same code on a value's array, whatever its element type
#[doc(hidden)]
#[macro_export]
macro_rules! val_as_arr {
    ($value:expr, |$arr:ident| $body:expr) => {
        match $value {
            $crate::Value::Bool($arr) => $body,
            $crate::Value::Int($arr) => $body,
            $crate::Value::Real($arr) => $body,
            $crate::Value::Complex($arr) => $body,
            $crate::Value::Char($arr) => $body,
            $crate::Value::Box($arr) => $body,
        }
    };
}

macro_rules! collect_rows {
    ($rows:expr, $variant:ident) => {{
        let mut arrays = Vec::with_capacity($rows.len());
        for row in $rows {
            match row {
                Value::$variant(arr) => arrays.push(arr),
                other => {
                    return Err(RuntimeErrorKind::Type(
                        format!("Cannot combine {} arrays with other types", other.type_name())
                            .into(),
                    ))
                }
            }
        }
        Value::$variant(Array::from_row_arrays(arrays)?)
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Bool,
    Int,
    Real,
    Complex,
    Char,
    Box,
}

impl Kind {
    fn is_numeric(self) -> bool {
        self <= Kind::Complex
    }
    fn unify(self, other: Kind) -> Option<Kind> {
        if self == other {
            Some(self)
        } else if self.is_numeric() && other.is_numeric() {
            Some(self.max(other))
        } else {
            None
        }
    }
}

impl Value {
    fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Real(_) => Kind::Real,
            Value::Complex(_) => Kind::Complex,
            Value::Char(_) => Kind::Char,
            Value::Box(_) => Kind::Box,
        }
    }
    /// Get the shape
    pub fn shape(&self) -> &Shape {
        val_as_arr!(self, |arr| &arr.shape)
    }
    /// Get the number of dimensions
    pub fn rank(&self) -> usize {
        self.shape().len()
    }
    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.shape().row_count()
    }
    /// Get the number of elements
    pub fn element_count(&self) -> usize {
        val_as_arr!(self, |arr| arr.element_count())
    }
    /// Get the name of the element type
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => bool::NAME,
            Value::Int(_) => i64::NAME,
            Value::Real(_) => f64::NAME,
            Value::Complex(_) => Complex::NAME,
            Value::Char(_) => char::NAME,
            Value::Box(_) => Boxed::NAME,
        }
    }
    /// Whether the element type is a number type
    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }
    /// Get the row at the given index
    pub fn row(&self, index: usize) -> Value {
        val_as_arr!(self, |arr| arr.row(index).into())
    }
    /// Get all the rows
    pub fn rows(&self) -> Vec<Value> {
        val_as_arr!(self, |arr| arr.rows().map(Value::from).collect())
    }
    /// Combine values as the rows of a new array
    ///
    /// Numbers are promoted to a common type. Rows must all have the same shape.
    pub fn from_row_values(rows: Vec<Value>) -> RuntimeResult<Value> {
        let Some(first) = rows.first() else {
            return Ok(Array::<i64>::new(0, EcoVec::new()).into());
        };
        let mut kind = first.kind();
        for row in &rows[1..] {
            kind = kind.unify(row.kind()).ok_or_else(|| combine_error(kind, row.kind()))?;
        }
        let rows: Vec<Value> = rows.into_iter().map(|row| row.into_kind(kind)).collect();
        Ok(match kind {
            Kind::Bool => collect_rows!(rows, Bool),
            Kind::Int => collect_rows!(rows, Int),
            Kind::Real => collect_rows!(rows, Real),
            Kind::Complex => collect_rows!(rows, Complex),
            Kind::Char => collect_rows!(rows, Char),
            Kind::Box => collect_rows!(rows, Box),
        })
    }
    /// Promote two values to a common element type
    pub(crate) fn unify_pair(a: Value, b: Value) -> RuntimeResult<(Value, Value)> {
        let kind = (a.kind().unify(b.kind())).ok_or_else(|| combine_error(a.kind(), b.kind()))?;
        Ok((a.into_kind(kind), b.into_kind(kind)))
    }
    fn into_kind(self, kind: Kind) -> Value {
        if self.kind() == kind || !self.is_numeric() {
            return self;
        }
        match kind {
            Kind::Int => match self {
                Value::Bool(arr) => arr.convert(i64::from).into(),
                value => value,
            },
            Kind::Real => match self {
                Value::Bool(arr) => arr.convert(|b| b as u8 as f64).into(),
                Value::Int(arr) => arr.convert(|i| i as f64).into(),
                value => value,
            },
            Kind::Complex => match self {
                Value::Bool(arr) => arr.convert(|b| Complex::from(b as u8 as f64)).into(),
                Value::Int(arr) => arr.convert(Complex::from).into(),
                Value::Real(arr) => arr.convert(Complex::from).into(),
                value => value,
            },
            _ => self,
        }
    }
    /// Convert a boolean or integer array to integers
    pub(crate) fn into_ints(self) -> Option<Array<i64>> {
        match self {
            Value::Bool(arr) => Some(arr.convert(i64::from)),
            Value::Int(arr) => Some(arr),
            _ => None,
        }
    }
    /// Convert a boolean, integer, or real array to reals
    pub(crate) fn into_reals(self) -> Option<Array<f64>> {
        match self {
            Value::Bool(arr) => Some(arr.convert(|b| b as u8 as f64)),
            Value::Int(arr) => Some(arr.convert(|i| i as f64)),
            Value::Real(arr) => Some(arr),
            _ => None,
        }
    }
    /// Convert any number array to complex numbers
    pub(crate) fn into_complexes(self) -> Option<Array<Complex>> {
        match self {
            Value::Complex(arr) => Some(arr),
            value => value.into_reals().map(|arr| arr.convert(Complex::from)),
        }
    }
    /// Get the value as an integer scalar
    pub fn as_int(&self, what: &str) -> RuntimeResult<i64> {
        if self.rank() != 0 {
            return Err(RuntimeErrorKind::Type(
                format!("{what} must be a scalar, but it has shape {}", self.shape()).into(),
            ));
        }
        self.as_ints(what)?
            .first()
            .copied()
            .ok_or_else(|| RuntimeErrorKind::Type(format!("{what} is empty").into()))
    }
    /// Get the value as a natural number scalar
    pub fn as_nat(&self, what: &str) -> RuntimeResult<usize> {
        let n = self.as_int(what)?;
        usize::try_from(n).map_err(|_| {
            RuntimeErrorKind::Domain(
                format!("{what} must be a natural number, but it is {n}").into(),
            )
        })
    }
    /// Get the value as a list of integers
    ///
    /// Scalars count as lists of one.
    pub fn as_ints(&self, what: &str) -> RuntimeResult<Vec<i64>> {
        if self.rank() > 1 {
            return Err(RuntimeErrorKind::Type(
                format!("{what} must be a list, but it has rank {}", self.rank()).into(),
            ));
        }
        Ok(self.as_index_array(what)?.data.to_vec())
    }
    /// Get the value as an array of integers of any shape
    pub(crate) fn as_index_array(&self, what: &str) -> RuntimeResult<Array<i64>> {
        match self {
            Value::Bool(arr) => Ok(arr.clone().convert(i64::from)),
            Value::Int(arr) => Ok(arr.clone()),
            Value::Real(arr) => {
                let mut data = EcoVec::with_capacity(arr.data.len());
                for &x in arr.data.iter() {
                    if x.fract() != 0.0 || !x.is_finite() || x.abs() > i64::MAX as f64 {
                        return Err(RuntimeErrorKind::Type(
                            format!("{what} must be integers, but it contains {x}").into(),
                        ));
                    }
                    data.push(x as i64);
                }
                Ok(Array::new(arr.shape.clone(), data))
            }
            value => Err(RuntimeErrorKind::Type(
                format!("{what} must be integers, but it is {}", value.type_name()).into(),
            )),
        }
    }
    /// Get the value as a string, if it is a character list
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Char(arr) if arr.rank() <= 1 => Some(arr.data.iter().collect()),
            _ => None,
        }
    }
    /// Check that two values have the same shape and elements
    ///
    /// Numbers of different types are compared by value.
    pub fn matches(&self, other: &Self) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Complex(a), Value::Complex(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Box(a), Value::Box(b)) => (a.data.iter())
                .zip(b.data.iter())
                .all(|(a, b)| a.0.matches(&b.0)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match Value::unify_pair(a.clone(), b.clone()) {
                    Ok((a, b)) => a.matches(&b),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }
}

fn combine_error(a: Kind, b: Kind) -> RuntimeErrorKind {
    let name = |kind: Kind| match kind {
        Kind::Bool | Kind::Int | Kind::Real | Kind::Complex => "number",
        Kind::Char => "character",
        Kind::Box => "box",
    };
    RuntimeErrorKind::Type(format!("Cannot combine {} and {} arrays", name(a), name(b)).into())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => a.cmp(b),
            (Value::Complex(a), Value::Complex(b)) => a.cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (Value::Box(a), Value::Box(b)) => a.cmp(b),
            (a, b) => a.kind().cmp(&b.kind()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Char(arr) if arr.rank() == 1 => {
                let s: String = arr.data.iter().collect();
                write!(f, "{s:?}")
            }
            Value::Char(arr) if arr.rank() > 1 => {
                write!(f, "[")?;
                for (i, row) in arr.rows().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", Value::Char(row))?;
                }
                write!(f, "]")
            }
            value => write!(f, "{}", val_as_arr!(value, |arr| arr.format_nested())),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

macro_rules! value_from {
    ($ty:ty, $variant:ident) => {
        impl From<Array<$ty>> for Value {
            fn from(arr: Array<$ty>) -> Self {
                Value::$variant(arr)
            }
        }
        impl From<$ty> for Value {
            fn from(x: $ty) -> Self {
                Value::$variant(Array::scalar(x))
            }
        }
    };
}

value_from!(bool, Bool);
value_from!(i64, Int);
value_from!(f64, Real);
value_from!(Complex, Complex);
value_from!(char, Char);
value_from!(Boxed, Box);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Char(s.chars().collect())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl<const N: usize> From<[i64; N]> for Value {
    fn from(data: [i64; N]) -> Self {
        Value::Int(Array::list(data.as_slice()))
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(data: [f64; N]) -> Self {
        Value::Real(Array::list(data.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_promote_to_common_type() {
        let value =
            Value::from_row_values(vec![Value::from(true), 2i64.into(), 1.5.into()]).unwrap();
        assert_eq!(value, Value::from([1.0, 2.0, 1.5]));
        let err = Value::from_row_values(vec![Value::from('a'), 1i64.into()]).unwrap_err();
        assert!(matches!(err, RuntimeErrorKind::Type(_)), "{err}");
    }

    #[test]
    fn rows_must_share_a_shape() {
        let err = Value::from_row_values(vec![Value::from([1i64, 2]), Value::from([1i64, 2, 3])])
            .unwrap_err();
        assert!(matches!(err, RuntimeErrorKind::ShapeMismatch { .. }));
    }

    #[test]
    fn matching_ignores_number_type() {
        assert!(Value::from([1i64, 2]).matches(&Value::from([1.0, 2.0])));
        assert!(!Value::from([1i64, 2]).matches(&Value::from([1i64, 2, 3])));
        assert!(!Value::from("ab").matches(&Value::from([97i64, 98])));
    }

    #[test]
    fn integer_conversion() {
        assert_eq!(Value::from(3.0).as_int("the count"), Ok(3));
        assert!(Value::from(2.5).as_int("the count").is_err());
        assert!(matches!(
            Value::from(-1i64).as_nat("the count"),
            Err(RuntimeErrorKind::Domain(_))
        ));
    }

    #[test]
    fn display() {
        let matrix = Value::Int(Array::new([2, 2], [1, -2, 3, 4].as_slice()));
        assert_eq!(matrix.to_string(), "[[1 ¯2] [3 4]]");
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
        assert_eq!(Value::from(Boxed(Value::from(1i64))).to_string(), "□1");
    }
}
