//! Algorithms for pervasive array operations
//!
//! Binary operations take their arguments in stack order: `a` is the value
//! that was on top of the stack. `- a b` computes `b - a`.

use std::cmp::Ordering;

use ecow::EcoVec;

use crate::{
    array::{Array, ArrayValue},
    Complex, ComplexOrdering, ComplexRounding, ComplexSemantics, Primitive, RuntimeErrorKind,
    RuntimeResult, Value,
};

/// Apply a function to every element of an array
pub fn mon_pervade<A, C>(
    a: Array<A>,
    f: impl Fn(A) -> RuntimeResult<C>,
) -> RuntimeResult<Array<C>>
where
    A: ArrayValue,
    C: ArrayValue,
{
    let data: EcoVec<C> = a.data.iter().cloned().map(f).collect::<RuntimeResult<_>>()?;
    Ok(Array::new(a.shape, data))
}

/// Apply a function to corresponding elements of two arrays
///
/// The arrays must have the same shape, or one of them must be a scalar.
pub fn bin_pervade<A, B, C>(
    a: Array<A>,
    b: Array<B>,
    f: impl Fn(A, B) -> RuntimeResult<C>,
) -> RuntimeResult<Array<C>>
where
    A: ArrayValue,
    B: ArrayValue,
    C: ArrayValue,
{
    if a.shape == b.shape {
        let data: EcoVec<C> = (a.data.iter().cloned())
            .zip(b.data.iter().cloned())
            .map(|(x, y)| f(x, y))
            .collect::<RuntimeResult<_>>()?;
        Ok(Array::new(a.shape, data))
    } else if let Some(x) = a.as_scalar() {
        let data: EcoVec<C> = (b.data.iter().cloned())
            .map(|y| f(x.clone(), y))
            .collect::<RuntimeResult<_>>()?;
        Ok(Array::new(b.shape, data))
    } else if let Some(y) = b.as_scalar() {
        let data: EcoVec<C> = (a.data.iter().cloned())
            .map(|x| f(x, y.clone()))
            .collect::<RuntimeResult<_>>()?;
        Ok(Array::new(a.shape, data))
    } else {
        Err(RuntimeErrorKind::ShapeMismatch {
            a: a.shape,
            b: b.shape,
        })
    }
}

/// Two number arrays promoted to a common type
enum Nums {
    Int(Array<i64>, Array<i64>),
    Real(Array<f64>, Array<f64>),
    Complex(Array<Complex>, Array<Complex>),
}

fn nums(a: Value, b: Value, prim: Primitive) -> RuntimeResult<Nums> {
    if !a.is_numeric() || !b.is_numeric() {
        return Err(type_error2(prim, &a, &b));
    }
    Ok(match Value::unify_pair(a, b)? {
        (Value::Bool(a), Value::Bool(b)) => Nums::Int(a.convert(i64::from), b.convert(i64::from)),
        (Value::Int(a), Value::Int(b)) => Nums::Int(a, b),
        (Value::Real(a), Value::Real(b)) => Nums::Real(a, b),
        (Value::Complex(a), Value::Complex(b)) => Nums::Complex(a, b),
        (a, b) => return Err(type_error2(prim, &a, &b)),
    })
}

fn type_error1(prim: Primitive, a: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::Type(
        format!("Cannot {} a {} array", prim.name(), a.type_name()).into(),
    )
}

fn type_error2(prim: Primitive, a: &Value, b: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::Type(
        format!(
            "Cannot {} {} and {} arrays",
            prim.name(),
            b.type_name(),
            a.type_name()
        )
        .into(),
    )
}

fn overflow(b: i64, glyph: char, a: i64) -> RuntimeErrorKind {
    RuntimeErrorKind::Arithmetic(format!("{b} {glyph} {a} overflows").into())
}

fn division_by_zero() -> RuntimeErrorKind {
    RuntimeErrorKind::Arithmetic("division by zero".into())
}

fn complex_order(sem: ComplexSemantics, prim: Primitive) -> RuntimeResult {
    match sem.ordering {
        ComplexOrdering::Lexicographic => Ok(()),
        ComplexOrdering::Reject => Err(RuntimeErrorKind::Domain(
            format!("Complex numbers cannot be compared with {}", prim.format()).into(),
        )),
    }
}

/* Monadic */

pub fn not(a: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    Ok(match a {
        Value::Bool(a) => a.convert(|b| !b).into(),
        Value::Int(a) => {
            mon_pervade(a, |x| 1i64.checked_sub(x).ok_or_else(|| overflow(1, '-', x)))?.into()
        }
        Value::Real(a) => a.convert(|x| 1.0 - x).into(),
        Value::Complex(a) => a.convert(|z| Complex::ONE - z).into(),
        a => return Err(type_error1(Primitive::Not, &a)),
    })
}

pub fn sign(a: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    Ok(match a {
        Value::Bool(a) => a.into(),
        Value::Int(a) => a.convert(i64::signum).into(),
        Value::Real(a) => a
            .convert(|x| if x == 0.0 || x.is_nan() { x } else { x.signum() })
            .into(),
        Value::Complex(a) => a.convert(Complex::normalize).into(),
        a => return Err(type_error1(Primitive::Sign, &a)),
    })
}

pub fn neg(a: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    Ok(match a {
        Value::Bool(a) => a.convert(|b| -(b as i64)).into(),
        Value::Int(a) => mon_pervade(a, |x| {
            x.checked_neg().ok_or_else(|| {
                RuntimeErrorKind::Arithmetic(format!("negating {x} overflows").into())
            })
        })?
        .into(),
        Value::Real(a) => a.convert(|x| -x).into(),
        Value::Complex(a) => a.convert(|z| -z).into(),
        a => return Err(type_error1(Primitive::Neg, &a)),
    })
}

pub fn abs(a: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    Ok(match a {
        Value::Bool(a) => a.into(),
        Value::Int(a) => mon_pervade(a, |x| {
            x.checked_abs().ok_or_else(|| {
                RuntimeErrorKind::Arithmetic(format!("the absolute value of {x} overflows").into())
            })
        })?
        .into(),
        Value::Real(a) => a.convert(f64::abs).into(),
        Value::Complex(a) => a.convert(Complex::abs).into(),
        a => return Err(type_error1(Primitive::Abs, &a)),
    })
}

pub fn sqrt(a: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    Ok(match a {
        Value::Complex(a) => a.convert(Complex::sqrt).into(),
        a if a.is_numeric() => match a.into_reals() {
            Some(a) => a.convert(f64::sqrt).into(),
            None => return Err(RuntimeErrorKind::Type("Cannot take a square root".into())),
        },
        a => return Err(type_error1(Primitive::Sqrt, &a)),
    })
}

fn rounding(
    a: Value,
    sem: ComplexSemantics,
    prim: Primitive,
    real: fn(f64) -> f64,
    complex: fn(Complex) -> Complex,
) -> RuntimeResult<Value> {
    Ok(match a {
        Value::Bool(_) | Value::Int(_) => a,
        Value::Real(a) => a.convert(real).into(),
        Value::Complex(a) => match sem.rounding {
            ComplexRounding::Componentwise => a.convert(complex).into(),
            ComplexRounding::Reject => {
                return Err(RuntimeErrorKind::Domain(
                    format!("Complex numbers cannot be rounded with {}", prim.format()).into(),
                ))
            }
        },
        a => return Err(type_error1(prim, &a)),
    })
}

pub fn floor(a: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    rounding(a, sem, Primitive::Floor, f64::floor, Complex::floor)
}

pub fn ceil(a: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    rounding(a, sem, Primitive::Ceil, f64::ceil, Complex::ceil)
}

pub fn round(a: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    rounding(a, sem, Primitive::Round, f64::round, Complex::round)
}

/* Dyadic */

pub fn add(a: Value, b: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    let prim = Primitive::Add;
    Ok(match (a, b) {
        (Value::Char(a), b @ (Value::Int(_) | Value::Bool(_))) => {
            let b = b.into_ints().ok_or_else(|| type_error1(prim, &Value::Char(a.clone())))?;
            bin_pervade(a, b, |c, n| shift_char(c, n))?.into()
        }
        (a @ (Value::Int(_) | Value::Bool(_)), Value::Char(b)) => {
            let a = a.into_ints().ok_or_else(|| type_error1(prim, &Value::Char(b.clone())))?;
            bin_pervade(a, b, |n, c| shift_char(c, n))?.into()
        }
        (a, b) => match nums(a, b, prim)? {
            Nums::Int(a, b) => {
                bin_pervade(a, b, |x, y| y.checked_add(x).ok_or_else(|| overflow(y, '+', x)))?
                    .into()
            }
            Nums::Real(a, b) => bin_pervade(a, b, |x, y| Ok(y + x))?.into(),
            Nums::Complex(a, b) => bin_pervade(a, b, |x, y| Ok(y + x))?.into(),
        },
    })
}

fn shift_char(c: char, n: i64) -> RuntimeResult<char> {
    (c as i64)
        .checked_add(n)
        .and_then(|code| u32::try_from(code).ok())
        .and_then(char::from_u32)
        .ok_or_else(|| {
            RuntimeErrorKind::Domain(
                format!("{} shifted by {n} is not a valid character", c.escape_debug()).into(),
            )
        })
}

pub fn sub(a: Value, b: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    let prim = Primitive::Sub;
    Ok(match (a, b) {
        (Value::Char(a), Value::Char(b)) => {
            bin_pervade(a, b, |x, y| Ok(y as i64 - x as i64))?.into()
        }
        (a @ (Value::Int(_) | Value::Bool(_)), Value::Char(b)) => {
            let a = a.into_ints().ok_or_else(|| type_error1(prim, &Value::Char(b.clone())))?;
            bin_pervade(a, b, |n, c| match n.checked_neg() {
                Some(n) => shift_char(c, n),
                None => Err(overflow(c as i64, '-', n)),
            })?
            .into()
        }
        (a, b) => match nums(a, b, prim)? {
            Nums::Int(a, b) => {
                bin_pervade(a, b, |x, y| y.checked_sub(x).ok_or_else(|| overflow(y, '-', x)))?
                    .into()
            }
            Nums::Real(a, b) => bin_pervade(a, b, |x, y| Ok(y - x))?.into(),
            Nums::Complex(a, b) => bin_pervade(a, b, |x, y| Ok(y - x))?.into(),
        },
    })
}

pub fn mul(a: Value, b: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    Ok(match nums(a, b, Primitive::Mul)? {
        Nums::Int(a, b) => {
            bin_pervade(a, b, |x, y| y.checked_mul(x).ok_or_else(|| overflow(y, '×', x)))?.into()
        }
        Nums::Real(a, b) => bin_pervade(a, b, |x, y| Ok(y * x))?.into(),
        Nums::Complex(a, b) => bin_pervade(a, b, |x, y| Ok(y * x))?.into(),
    })
}

pub fn div(a: Value, b: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    let real = |x: f64, y: f64| {
        if x == 0.0 {
            Err(division_by_zero())
        } else {
            Ok(y / x)
        }
    };
    Ok(match nums(a, b, Primitive::Div)? {
        Nums::Int(a, b) => bin_pervade(
            a.convert(|i| i as f64),
            b.convert(|i| i as f64),
            real,
        )?
        .into(),
        Nums::Real(a, b) => bin_pervade(a, b, real)?.into(),
        Nums::Complex(a, b) => bin_pervade(a, b, |x, y| {
            if x.is_zero() {
                Err(division_by_zero())
            } else {
                Ok(y / x)
            }
        })?
        .into(),
    })
}

pub fn modulus(a: Value, b: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    Ok(match nums(a, b, Primitive::Modulus)? {
        Nums::Int(a, b) => bin_pervade(a, b, |x, y| {
            if x == 0 {
                return Err(division_by_zero());
            }
            y.checked_rem_euclid(x).ok_or_else(|| overflow(y, '◿', x))
        })?
        .into(),
        Nums::Real(a, b) => bin_pervade(a, b, |x, y| {
            if x == 0.0 {
                Err(division_by_zero())
            } else {
                Ok(y.rem_euclid(x))
            }
        })?
        .into(),
        Nums::Complex(..) => {
            return Err(RuntimeErrorKind::Domain(
                "Complex numbers have no modulus".into(),
            ))
        }
    })
}

pub fn pow(a: Value, b: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    Ok(match nums(a, b, Primitive::Pow)? {
        Nums::Int(a, b) if a.data.iter().all(|&x| x >= 0) => bin_pervade(a, b, |x, y| {
            u32::try_from(x)
                .ok()
                .and_then(|x| y.checked_pow(x))
                .ok_or_else(|| overflow(y, 'ⁿ', x))
        })?
        .into(),
        Nums::Int(a, b) => bin_pervade(
            a.convert(|i| i as f64),
            b.convert(|i| i as f64),
            |x, y| Ok(y.powf(x)),
        )?
        .into(),
        Nums::Real(a, b) => bin_pervade(a, b, |x, y| Ok(y.powf(x)))?.into(),
        Nums::Complex(a, b) => bin_pervade(a, b, |x, y| Ok(y.powc(x)))?.into(),
    })
}

fn compare(
    a: Value,
    b: Value,
    sem: ComplexSemantics,
    prim: Primitive,
    f: fn(Ordering) -> bool,
) -> RuntimeResult<Value> {
    let equality = matches!(prim, Primitive::Eq | Primitive::Ne);
    // Unordered reals are only unequal
    let unordered = prim == Primitive::Ne;
    Ok(match (a, b) {
        (Value::Char(a), Value::Char(b)) => bin_pervade(a, b, |x, y| Ok(f(y.cmp(&x))))?.into(),
        (Value::Box(a), Value::Box(b)) => bin_pervade(a, b, |x, y| Ok(f(y.cmp(&x))))?.into(),
        (a, b) => match nums(a, b, prim)? {
            Nums::Int(a, b) => bin_pervade(a, b, |x, y| Ok(f(y.cmp(&x))))?.into(),
            Nums::Real(a, b) => {
                bin_pervade(a, b, |x, y| Ok(y.partial_cmp(&x).map_or(unordered, f)))?.into()
            }
            Nums::Complex(a, b) if equality => bin_pervade(a, b, |x, y| {
                Ok(f(if x == y { Ordering::Equal } else { Ordering::Less }))
            })?
            .into(),
            Nums::Complex(a, b) => {
                complex_order(sem, prim)?;
                bin_pervade(a, b, |x, y| Ok(f(y.lexicographic_cmp(&x))))?.into()
            }
        },
    })
}

pub fn is_eq(a: Value, b: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    compare(a, b, sem, Primitive::Eq, Ordering::is_eq)
}

pub fn is_ne(a: Value, b: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    compare(a, b, sem, Primitive::Ne, Ordering::is_ne)
}

pub fn is_lt(a: Value, b: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    compare(a, b, sem, Primitive::Lt, Ordering::is_lt)
}

pub fn is_le(a: Value, b: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    compare(a, b, sem, Primitive::Le, Ordering::is_le)
}

pub fn is_gt(a: Value, b: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    compare(a, b, sem, Primitive::Gt, Ordering::is_gt)
}

pub fn is_ge(a: Value, b: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    compare(a, b, sem, Primitive::Ge, Ordering::is_ge)
}

fn extremum(
    a: Value,
    b: Value,
    sem: ComplexSemantics,
    prim: Primitive,
    pick: Ordering,
) -> RuntimeResult<Value> {
    let choose = |o: Ordering| o == pick;
    Ok(match (a, b) {
        (Value::Char(a), Value::Char(b)) => {
            bin_pervade(a, b, |x, y| Ok(if choose(y.cmp(&x)) { y } else { x }))?.into()
        }
        (a, b) => match nums(a, b, prim)? {
            Nums::Int(a, b) => {
                bin_pervade(a, b, |x, y| Ok(if choose(y.cmp(&x)) { y } else { x }))?.into()
            }
            Nums::Real(a, b) => bin_pervade(a, b, |x, y| {
                Ok(if pick == Ordering::Greater { y.max(x) } else { y.min(x) })
            })?
            .into(),
            Nums::Complex(a, b) => {
                complex_order(sem, prim)?;
                bin_pervade(a, b, |x, y| {
                    Ok(if choose(y.lexicographic_cmp(&x)) { y } else { x })
                })?
                .into()
            }
        },
    })
}

pub fn max(a: Value, b: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    extremum(a, b, sem, Primitive::Max, Ordering::Greater)
}

pub fn min(a: Value, b: Value, sem: ComplexSemantics) -> RuntimeResult<Value> {
    extremum(a, b, sem, Primitive::Min, Ordering::Less)
}

/// Make complex numbers from an imaginary part `a` and a real part `b`
pub fn complex(a: Value, b: Value, _: ComplexSemantics) -> RuntimeResult<Value> {
    if !a.is_numeric() || !b.is_numeric() {
        return Err(type_error2(Primitive::Complex, &a, &b));
    }
    let (Some(im), Some(re)) = (a.into_complexes(), b.into_complexes()) else {
        return Err(RuntimeErrorKind::Type("Cannot make complex numbers".into()));
    };
    Ok(bin_pervade(im, re, |im, re| Ok(re + im * Complex::I))?.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEM: ComplexSemantics = ComplexSemantics {
        rounding: ComplexRounding::Componentwise,
        ordering: ComplexOrdering::Reject,
    };

    fn matrix() -> Value {
        Value::Int(Array::new([2, 3], [1i64, 2, 3, 4, 5, 6].as_slice()))
    }

    #[test]
    fn scalar_broadcasts() {
        let sum = add(Value::from(10i64), matrix(), SEM).unwrap();
        assert_eq!(
            sum,
            Value::Int(Array::new([2, 3], [11i64, 12, 13, 14, 15, 16].as_slice()))
        );
    }

    #[test]
    fn mismatched_shapes_are_an_error() {
        let transposed = Value::Int(Array::new([3, 2], [1i64, 2, 3, 4, 5, 6].as_slice()));
        let err = add(transposed, matrix(), SEM).unwrap_err();
        assert_eq!(
            err,
            RuntimeErrorKind::ShapeMismatch {
                a: [3, 2].into(),
                b: [2, 3].into()
            }
        );
    }

    #[test]
    fn argument_order() {
        assert_eq!(sub(1i64.into(), 5i64.into(), SEM), Ok(Value::from(4i64)));
        assert_eq!(div(2i64.into(), 5i64.into(), SEM), Ok(Value::from(2.5)));
        assert_eq!(modulus(3i64.into(), (-1i64).into(), SEM), Ok(Value::from(2i64)));
        assert_eq!(pow(2i64.into(), 3i64.into(), SEM), Ok(Value::from(9i64)));
        assert_eq!(is_lt(2i64.into(), 1i64.into(), SEM), Ok(Value::from(true)));
    }

    #[test]
    fn checked_integer_arithmetic() {
        let err = add(1i64.into(), i64::MAX.into(), SEM).unwrap_err();
        assert!(matches!(err, RuntimeErrorKind::Arithmetic(_)), "{err}");
        let err = div(0i64.into(), 1i64.into(), SEM).unwrap_err();
        assert!(matches!(err, RuntimeErrorKind::Arithmetic(_)), "{err}");
        let err = modulus(0.0.into(), 1.0.into(), SEM).unwrap_err();
        assert!(matches!(err, RuntimeErrorKind::Arithmetic(_)), "{err}");
        assert_eq!(pow((-1i64).into(), 2i64.into(), SEM), Ok(Value::from(0.5)));
    }

    #[test]
    fn nan_is_unequal_to_everything() {
        let nan = || Value::from(f64::NAN);
        assert_eq!(is_eq(nan(), nan(), SEM), Ok(Value::from(false)));
        assert_eq!(is_ne(nan(), nan(), SEM), Ok(Value::from(true)));
        assert_eq!(is_ne(1i64.into(), nan(), SEM), Ok(Value::from(true)));
        assert_eq!(is_lt(nan(), 1.0.into(), SEM), Ok(Value::from(false)));
        assert_eq!(is_ge(nan(), 1.0.into(), SEM), Ok(Value::from(false)));
    }

    #[test]
    fn booleans_promote() {
        assert_eq!(add(true.into(), true.into(), SEM), Ok(Value::from(2i64)));
        assert_eq!(not(true.into(), SEM), Ok(Value::from(false)));
    }

    #[test]
    fn characters() {
        assert_eq!(add(1i64.into(), 'a'.into(), SEM), Ok(Value::from('b')));
        assert_eq!(sub(1i64.into(), 'b'.into(), SEM), Ok(Value::from('a')));
        assert_eq!(sub('a'.into(), 'c'.into(), SEM), Ok(Value::from(2i64)));
        assert_eq!(max('a'.into(), 'c'.into(), SEM), Ok(Value::from('c')));
        assert!(matches!(
            mul(2i64.into(), 'a'.into(), SEM),
            Err(RuntimeErrorKind::Type(_))
        ));
    }

    #[test]
    fn complex_rounding_is_configurable() {
        let z = || Value::from(Complex::new(1.5, -0.5));
        assert_eq!(floor(z(), SEM), Ok(Value::from(Complex::new(1.0, -1.0))));
        let reject = ComplexSemantics {
            rounding: ComplexRounding::Reject,
            ..SEM
        };
        assert!(matches!(floor(z(), reject), Err(RuntimeErrorKind::Domain(_))));
    }

    #[test]
    fn complex_ordering_is_configurable() {
        let a = || Value::from(Complex::new(1.0, 5.0));
        let b = || Value::from(Complex::new(2.0, 0.0));
        assert!(matches!(is_lt(a(), b(), SEM), Err(RuntimeErrorKind::Domain(_))));
        let lex = ComplexSemantics {
            ordering: ComplexOrdering::Lexicographic,
            ..SEM
        };
        assert_eq!(is_lt(a(), b(), lex), Ok(Value::from(false)));
        assert_eq!(max(a(), b(), lex), Ok(Value::from(Complex::new(2.0, 0.0))));
        assert_eq!(is_eq(a(), a(), SEM), Ok(Value::from(true)));
        assert!(matches!(
            modulus(a(), b(), lex),
            Err(RuntimeErrorKind::Domain(_))
        ));
    }

    #[test]
    fn complex_construction() {
        assert_eq!(
            complex(3i64.into(), 4i64.into(), SEM),
            Ok(Value::from(Complex::new(4.0, 3.0)))
        );
    }
}
