//! Strata is a stack-based array programming language written with glyphs
//!
//! Source text is compiled into an [`Assembly`], which a [`Vm`] runs against
//! a stack of [`Value`]s.
//!
//! ```
//! let asm = strata::compile("× 2 [1 2 3]").unwrap();
//! let stack = strata::execute(&asm, Vec::new()).unwrap();
//! assert_eq!(stack, [strata::Value::from([2i64, 4, 6])]);
//! ```
//!
//! Use [`Compiler`] and [`Vm`] directly for control over macro depth, call
//! depth, cancellation, system functions, and complex number semantics.

#![warn(missing_docs)]

mod algorithm;
mod array;
mod assembly;
mod boxed;
pub mod compile;
mod complex;
mod error;
mod instr;
mod shape;
mod sys;
mod value;
mod vm;

pub use strata_parser::*;

pub use self::{
    algorithm::pervade,
    array::{Array, ArrayValue},
    assembly::Assembly,
    boxed::Boxed,
    compile::{CompileOptions, Compiler},
    complex::{Complex, ComplexOrdering, ComplexRounding, ComplexSemantics},
    error::{
        FormatError, RuntimeError, RuntimeErrorKind, RuntimeResult, StrataError, TraceFrame,
    },
    instr::{FuncSlice, Function, Instr},
    shape::Shape,
    sys::{NativeSys, SafeSys, SysBackend, SysFn, SysHandler, SysRegistry},
    value::Value,
    vm::{RunOptions, Vm, DEFAULT_MAX_CALL_DEPTH},
};

/// Compile source text with the default options
pub fn compile(source: &str) -> Result<Assembly, CompileError> {
    Compiler::default().load_str(source)
}

/// Run an assembly with the default options
///
/// The last value of `stack` is the top of the stack. On failure, nothing
/// but the error is returned.
pub fn execute(asm: &Assembly, stack: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
    Vm::default().run(asm, stack)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn shareable_between_threads() {
        assert_send_sync::<Assembly>();
        assert_send_sync::<Vm>();
        assert_send_sync::<SysRegistry>();
    }

    #[test]
    fn compile_and_execute() {
        let asm = compile("+ 1 2").unwrap();
        assert_eq!(execute(&asm, Vec::new()), Ok(vec![Value::from(3i64)]));
        let asm = compile("- 1").unwrap();
        assert_eq!(
            execute(&asm, vec![Value::from(5i64)]),
            Ok(vec![Value::from(4i64)])
        );
    }
}
