//! Algorithms for looping and stack-shaping modifiers
//!
//! Operands never run to completion inside these functions. A modifier
//! schedules its operand with [`Env::call`] and, if it has more to do once
//! the operand returns, a [`Continuation`] beneath the call.

use crate::{
    algorithm::{reduce::Fold, with_shape},
    array::checked_index,
    vm::{Env, Site, VmResult},
    Primitive, RuntimeErrorKind, Shape, Value,
};

/// The rest of a modifier, waiting for an operand to return
#[derive(Debug)]
pub(crate) enum Continuation {
    /// Gather the output of a call on one row
    Collect(Collect),
    /// Call the function `remaining` more times
    Repeat { func: usize, remaining: usize },
    /// A do loop's condition has pushed its result
    DoCondition { body: usize, cond: usize },
    /// A do loop's body has returned
    DoBody { body: usize, cond: usize },
    /// Push back the value dipped under the call
    Dip(Value),
    /// The second function of a fork has returned
    Fork { f: usize, args: Vec<Value> },
    /// Fold the next row into the accumulator
    Reduce(Fold),
}

impl Continuation {
    pub(crate) fn resume(self, env: &mut Env, site: Site) -> VmResult {
        match self {
            Continuation::Collect(collect) => collect.resume(env, site),
            Continuation::Repeat { func, remaining } => repeat_times(env, func, remaining, site),
            Continuation::DoCondition { body, cond } => {
                let condition = env.pop("loop condition", site)?;
                if !env.check(site, as_bool(&condition, "Do's condition"))? {
                    return Ok(());
                }
                env.then(Continuation::DoBody { body, cond }, site);
                env.call(body, site)
            }
            Continuation::DoBody { body, cond } => do_while(env, body, cond, site),
            Continuation::Dip(value) => {
                env.push(value);
                Ok(())
            }
            Continuation::Fork { f, args } => {
                for arg in args.into_iter().rev() {
                    env.push(arg);
                }
                env.call(f, site)
            }
            Continuation::Reduce(fold) => fold.resume(env, site),
        }
    }
}

/// `∵` call a function on every element of its arguments
///
/// Arguments must have the same shape, except that scalars are reused for
/// every element.
pub(crate) fn each(env: &mut Env, func: usize, site: Site) -> VmResult {
    let sig = env.function_sig(func, site)?;
    let args = env.pop_n(sig.args(), Primitive::Each, site)?;
    let mut shape: Option<&Shape> = None;
    for arg in args.iter().filter(|arg| arg.rank() > 0) {
        match shape {
            None => shape = Some(arg.shape()),
            Some(shape) if shape != arg.shape() => {
                let kind = RuntimeErrorKind::ShapeMismatch {
                    a: shape.clone(),
                    b: arg.shape().clone(),
                };
                return Err(env.error(site, kind));
            }
            Some(_) => {}
        }
    }
    let Some(shape) = shape.cloned() else {
        push_args(env, &args);
        return env.call(func, site);
    };
    let args: Vec<Value> = (args.into_iter())
        .map(|arg| if arg.rank() == 0 { arg } else { arg.deshape() })
        .collect();
    Collect::new(func, args, shape.elements(), Some(shape)).step(env, site)
}

/// `≡` call a function on every row of its arguments
///
/// Arguments must have the same number of rows, except that scalars are
/// reused for every row.
pub(crate) fn rows(env: &mut Env, func: usize, site: Site) -> VmResult {
    let sig = env.function_sig(func, site)?;
    let args = env.pop_n(sig.args(), Primitive::Rows, site)?;
    let mut counted: Option<&Value> = None;
    for arg in args.iter().filter(|arg| arg.rank() > 0) {
        match counted {
            None => counted = Some(arg),
            Some(first) if first.row_count() != arg.row_count() => {
                let kind = RuntimeErrorKind::ShapeMismatch {
                    a: first.shape().clone(),
                    b: arg.shape().clone(),
                };
                return Err(env.error(site, kind));
            }
            Some(_) => {}
        }
    }
    let Some(count) = counted.map(Value::row_count) else {
        push_args(env, &args);
        return env.call(func, site);
    };
    Collect::new(func, args, count, None).step(env, site)
}

/// Push arguments so that the first one ends up on top
fn push_args(env: &mut Env, args: &[Value]) {
    for arg in args.iter().rev() {
        env.push(arg.clone());
    }
}

/// A function called once per row, with the outputs combined as rows
#[derive(Debug)]
pub(crate) struct Collect {
    func: usize,
    args: Vec<Value>,
    count: usize,
    outputs: Vec<Value>,
    /// The shape each's outputs are arranged in
    shape: Option<Shape>,
}

impl Collect {
    fn new(func: usize, args: Vec<Value>, count: usize, shape: Option<Shape>) -> Self {
        Collect {
            func,
            args,
            count,
            outputs: Vec::with_capacity(count),
            shape,
        }
    }
    fn resume(mut self, env: &mut Env, site: Site) -> VmResult {
        let output = env.pop("iteration result", site)?;
        self.outputs.push(output);
        self.step(env, site)
    }
    /// Call the function on the next row, or push the combined outputs
    fn step(self, env: &mut Env, site: Site) -> VmResult {
        let i = self.outputs.len();
        if i < self.count {
            for arg in self.args.iter().rev() {
                env.push(arg.row(i));
            }
            let func = self.func;
            env.then(Continuation::Collect(self), site);
            return env.call(func, site);
        }
        let outputs = env.check(site, Value::from_row_values(self.outputs))?;
        let Some(mut shape) = self.shape else {
            env.push(outputs);
            return Ok(());
        };
        shape.extend(outputs.shape().row().iter().copied());
        env.push(with_shape(outputs, shape));
        Ok(())
    }
}

/// `⍥` call a function a number of times
pub(crate) fn repeat(env: &mut Env, func: usize, site: Site) -> VmResult {
    let n = env.pop((Primitive::Repeat, 1), site)?;
    let n = env.check(site, n.as_nat("Repetition count"))?;
    repeat_times(env, func, n, site)
}

fn repeat_times(env: &mut Env, func: usize, remaining: usize, site: Site) -> VmResult {
    match remaining {
        0 => Ok(()),
        1 => env.call(func, site),
        _ => {
            let remaining = remaining - 1;
            env.then(Continuation::Repeat { func, remaining }, site);
            env.call(func, site)
        }
    }
}

/// `⍢` call the body while the condition returns true
///
/// The condition runs before each iteration and pushes one boolean on top
/// of the values it takes.
pub(crate) fn do_while(env: &mut Env, body: usize, cond: usize, site: Site) -> VmResult {
    env.then(Continuation::DoCondition { body, cond }, site);
    env.call(cond, site)
}

/// `⨬` call the branch at the given index
pub(crate) fn switch(env: &mut Env, branches: &[usize], site: Site) -> VmResult {
    let index = env.pop((Primitive::Switch, 1), site)?;
    let index = env.check(site, index.as_int("Switch's index"))?;
    let branch = env.check(site, checked_index(index, branches.len()))?;
    env.call(branches[branch], site)
}

/// `⊙` call a function below the top value
pub(crate) fn dip(env: &mut Env, func: usize, site: Site) -> VmResult {
    let top = env.pop((Primitive::Dip, 1), site)?;
    env.then(Continuation::Dip(top), site);
    env.call(func, site)
}

/// `⊃` call two functions on the same arguments
///
/// The second function runs first, so the first function's outputs end up on
/// top.
pub(crate) fn fork(env: &mut Env, f: usize, g: usize, site: Site) -> VmResult {
    let f_args = env.function_sig(f, site)?.args();
    let g_args = env.function_sig(g, site)?.args();
    let mut args = env.pop_n(f_args.max(g_args), Primitive::Fork, site)?;
    push_args(env, &args[..g_args]);
    args.truncate(f_args);
    env.then(Continuation::Fork { f, args }, site);
    env.call(g, site)
}

fn as_bool(value: &Value, what: &str) -> Result<bool, RuntimeErrorKind> {
    match value.as_int(what)? {
        0 => Ok(false),
        1 => Ok(true),
        n => Err(RuntimeErrorKind::Domain(
            format!("{what} must be a boolean, but it is {n}").into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_must_be_booleans() {
        assert_eq!(as_bool(&Value::from(true), "c"), Ok(true));
        assert_eq!(as_bool(&Value::from(0i64), "c"), Ok(false));
        assert!(matches!(
            as_bool(&Value::from(2i64), "c"),
            Err(RuntimeErrorKind::Domain(_))
        ));
        assert!(as_bool(&Value::from([1i64, 0]), "c").is_err());
    }
}
