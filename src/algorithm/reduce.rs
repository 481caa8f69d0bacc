//! Algorithms for reducing modifiers

use std::vec;

use crate::{
    algorithm::{loops::Continuation, pervade, validate_size, with_shape},
    vm::{Env, Site, VmResult},
    ComplexSemantics, Instr, Primitive, RuntimeErrorKind, RuntimeResult, Shape, Value,
};

type DyadicFn = fn(Value, Value, ComplexSemantics) -> RuntimeResult<Value>;

/// `/` fold the rows of an array with a dyadic function
///
/// The accumulator starts as the first row. For each later row, the row is
/// pushed, then the accumulator, so `/-[1 2 3]` is `- 2 1` then `- 3 1`.
pub(crate) fn reduce(env: &mut Env, func: usize, site: Site) -> VmResult {
    let xs = env.pop((Primitive::Reduce, 1), site)?;
    let prim = match env.function_instrs(func) {
        [Instr::Prim(prim, _)] => Some(*prim),
        _ => None,
    };
    if xs.row_count() == 0 && xs.rank() > 0 {
        let identity = env.check(site, reduce_identity(prim, xs.shape()))?;
        env.push(identity);
        return Ok(());
    }
    let mut rows = xs.rows().into_iter();
    let Some(mut acc) = rows.next() else {
        env.push(xs);
        return Ok(());
    };
    let Some(f) = prim.and_then(dyadic_fn) else {
        return Fold { func, rows }.step(env, acc, site);
    };
    let sem = env.complex();
    for row in rows {
        acc = env.check(site, f(acc, row, sem))?;
    }
    env.push(acc);
    Ok(())
}

/// A reduction that calls its function once per remaining row
#[derive(Debug)]
pub(crate) struct Fold {
    func: usize,
    rows: vec::IntoIter<Value>,
}

impl Fold {
    pub(crate) fn resume(self, env: &mut Env, site: Site) -> VmResult {
        let acc = env.pop("reduced value", site)?;
        self.step(env, acc, site)
    }
    fn step(mut self, env: &mut Env, acc: Value, site: Site) -> VmResult {
        let Some(row) = self.rows.next() else {
            env.push(acc);
            return Ok(());
        };
        env.push(row);
        env.push(acc);
        let func = self.func;
        env.then(Continuation::Reduce(self), site);
        env.call(func, site)
    }
}

fn dyadic_fn(prim: Primitive) -> Option<DyadicFn> {
    use Primitive::*;
    Some(match prim {
        Add => pervade::add,
        Sub => pervade::sub,
        Mul => pervade::mul,
        Div => pervade::div,
        Modulus => pervade::modulus,
        Pow => pervade::pow,
        Min => pervade::min,
        Max => pervade::max,
        Eq => pervade::is_eq,
        Ne => pervade::is_ne,
        Lt => pervade::is_lt,
        Le => pervade::is_le,
        Gt => pervade::is_gt,
        Ge => pervade::is_ge,
        _ => return None,
    })
}

/// The result of reducing an empty array
///
/// Only functions with an identity element can reduce an empty array. The
/// identity is repeated to the shape of a row.
fn reduce_identity(prim: Option<Primitive>, shape: &Shape) -> RuntimeResult<Value> {
    let identity = match prim {
        Some(Primitive::Add | Primitive::Sub) => Value::from(0i64),
        Some(Primitive::Mul | Primitive::Div) => Value::from(1i64),
        Some(Primitive::Max) => Value::from(f64::NEG_INFINITY),
        Some(Primitive::Min) => Value::from(f64::INFINITY),
        _ => {
            return Err(RuntimeErrorKind::Domain(
                "Cannot reduce an empty array with a function that has no identity".into(),
            ))
        }
    };
    let row_shape = shape.row();
    if row_shape.is_empty() {
        return Ok(identity);
    }
    let count = validate_size::<Value>(&row_shape)?;
    let rows: Vec<Value> = (0..count).map(|_| identity.clone()).collect();
    let flat = Value::from_row_values(rows)?;
    Ok(with_shape(flat, row_shape))
}
