//! The Strata virtual machine
//!
//! A [`Vm`] runs an [`Assembly`] against a stack of values. Plain calls and
//! modifier operands push a frame onto the frame stack and are run by the
//! same loop as the caller. A modifier with work left after its operand
//! returns leaves a continuation frame beneath the call, so the depth of a
//! program's recursion never reaches the native stack.

use std::{
    f64::consts::{FRAC_PI_2, PI, TAU},
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    algorithm::{
        loops::{self, Continuation},
        pervade, reduce,
    },
    Assembly, ComplexSemantics, FuncSlice, Ident, Instr, Primitive, RuntimeError,
    RuntimeErrorKind, RuntimeResult, Signature, Span, SysRegistry, TraceFrame, Value,
};

/// The default maximum number of nested function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 4096;

pub(crate) type VmResult<T = ()> = Result<T, RuntimeError>;

/// Options that control execution
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// The maximum number of nested function calls
    pub max_call_depth: usize,
    /// The maximum number of instructions to execute, if any
    pub instruction_limit: Option<usize>,
    /// A flag that stops execution when it is set
    pub cancel: Option<Arc<AtomicBool>>,
    /// How complex numbers are rounded and ordered
    pub complex: ComplexSemantics,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            instruction_limit: None,
            cancel: None,
            complex: ComplexSemantics::default(),
        }
    }
}

/// The Strata virtual machine
///
/// A `Vm` can run any number of assemblies. Each run starts with a fresh
/// frame stack, and a failed run hands back nothing but the error.
#[derive(Debug, Clone, Default)]
pub struct Vm {
    options: RunOptions,
    sys: Arc<SysRegistry>,
}

impl Vm {
    /// Create a new virtual machine with the default system functions
    pub fn new(options: RunOptions) -> Self {
        Vm {
            options,
            sys: Arc::new(SysRegistry::default()),
        }
    }
    /// Set the system function registry
    pub fn with_sys(mut self, sys: Arc<SysRegistry>) -> Self {
        self.sys = sys;
        self
    }
    /// Set the maximum number of nested function calls
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.options.max_call_depth = depth;
        self
    }
    /// Set the maximum number of instructions to execute
    pub fn instruction_limit(mut self, limit: usize) -> Self {
        self.options.instruction_limit = Some(limit);
        self
    }
    /// Set a flag that cancels execution when it is set
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.options.cancel = Some(flag);
        self
    }
    /// Set how complex numbers are rounded and ordered
    pub fn complex(mut self, complex: ComplexSemantics) -> Self {
        self.options.complex = complex;
        self
    }
    /// Get the run options
    pub fn options(&self) -> &RunOptions {
        &self.options
    }
    /// Get the system function registry
    pub fn sys(&self) -> &SysRegistry {
        &self.sys
    }
    /// Run an assembly's top-level code
    ///
    /// The last value of `stack` is the top of the stack.
    pub fn run(&self, asm: &Assembly, stack: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        tracing::debug!(
            instrs = asm.instrs.len(),
            functions = asm.functions.len(),
            "running assembly"
        );
        let mut env = Env::new(asm, &self.options, &self.sys, stack);
        env.frames.push(Frame::Code(CodeFrame {
            func: None,
            slice: asm.root,
            pc: 0,
            call_span: None,
        }));
        env.run_frames()?;
        Ok(env.stack)
    }
    /// Call an exported function
    pub fn call_export(
        &self,
        asm: &Assembly,
        name: &str,
        stack: Vec<Value>,
    ) -> Result<Vec<Value>, RuntimeError> {
        let mut env = Env::new(asm, &self.options, &self.sys, stack);
        let site = Site {
            offset: 0,
            span: None,
        };
        let Some(&func) = asm.exports.get(name) else {
            return Err(env.error(site, RuntimeErrorKind::UnresolvedReference(name.into())));
        };
        env.call(func, site)?;
        env.run_frames()?;
        Ok(env.stack)
    }
}

/// Where an instruction is, for error reporting
#[derive(Debug, Clone, Copy)]
pub(crate) struct Site {
    pub offset: usize,
    pub span: Option<usize>,
}

#[derive(Debug)]
enum Frame {
    Code(CodeFrame),
    /// Resume a modifier once the frames above it are finished
    Resume(Continuation, Site),
}

#[derive(Debug, Clone)]
struct CodeFrame {
    /// `None` for the top-level code
    func: Option<usize>,
    slice: FuncSlice,
    pc: usize,
    call_span: Option<usize>,
}

/// The state of a single run
pub(crate) struct Env<'a> {
    asm: &'a Assembly,
    options: &'a RunOptions,
    sys: &'a SysRegistry,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    /// The number of function frames
    call_depth: usize,
    array_bases: Vec<usize>,
    executed: usize,
}

impl<'a> Env<'a> {
    fn new(
        asm: &'a Assembly,
        options: &'a RunOptions,
        sys: &'a SysRegistry,
        stack: Vec<Value>,
    ) -> Self {
        Env {
            asm,
            options,
            sys,
            stack,
            frames: Vec::new(),
            call_depth: 0,
            array_bases: Vec::new(),
            executed: 0,
        }
    }
    /// Build an error with the current call trace
    pub fn error(&self, site: Site, kind: RuntimeErrorKind) -> RuntimeError {
        let span_at = |index: Option<usize>| {
            (index.and_then(|i| self.asm.spans.get(i)))
                .cloned()
                .unwrap_or(Span::Builtin)
        };
        let trace = (self.frames.iter().rev())
            .filter_map(|frame| {
                let Frame::Code(frame) = frame else {
                    return None;
                };
                let func = self.asm.functions.get(frame.func?)?;
                Some(TraceFrame {
                    id: func.id.clone(),
                    span: span_at(frame.call_span),
                })
            })
            .collect();
        RuntimeError {
            kind,
            span: span_at(site.span),
            offset: site.offset,
            trace,
        }
    }
    /// Attach the site to an operation's error
    pub fn check<T>(&self, site: Site, result: RuntimeResult<T>) -> VmResult<T> {
        result.map_err(|kind| self.error(site, kind))
    }
    pub fn complex(&self) -> ComplexSemantics {
        self.options.complex
    }
    pub fn push(&mut self, value: impl Into<Value>) {
        self.stack.push(value.into());
    }
    pub fn pop(&mut self, arg: impl StackArg, site: Site) -> VmResult<Value> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.error(site, RuntimeErrorKind::EmptyStack(arg.arg_name().into()))),
        }
    }
    /// Pop `n` values, with the top of the stack first
    pub fn pop_n(&mut self, n: usize, modifier: Primitive, site: Site) -> VmResult<Vec<Value>> {
        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            values.push(self.pop((modifier, i + 1), site)?);
        }
        Ok(values)
    }
    /// Get the signature of a function
    pub fn function_sig(&self, func: usize, site: Site) -> VmResult<Signature> {
        match self.asm.functions.get(func) {
            Some(f) => Ok(f.sig),
            None => Err(self.error(site, unresolved_function(func))),
        }
    }
    /// Get the instructions of a function
    pub fn function_instrs(&self, func: usize) -> &'a [Instr] {
        let asm = self.asm;
        match asm.functions.get(func) {
            Some(f) => asm.instrs.get(f.slice.start..f.slice.end()).unwrap_or_default(),
            None => &[],
        }
    }
    /// Call a function
    ///
    /// The function starts running once the current instruction or
    /// continuation returns. Work that needs its outputs goes in a
    /// continuation scheduled with [`Env::then`] before the call.
    pub fn call(&mut self, func: usize, site: Site) -> VmResult {
        let Some(function) = self.asm.functions.get(func) else {
            return Err(self.error(site, unresolved_function(func)));
        };
        if self.call_depth >= self.options.max_call_depth {
            return Err(self.error(
                site,
                RuntimeErrorKind::StackOverflow {
                    limit: self.options.max_call_depth,
                },
            ));
        }
        self.call_depth += 1;
        tracing::debug!(function = %function.id, depth = self.call_depth, "call");
        self.frames.push(Frame::Code(CodeFrame {
            func: Some(func),
            slice: function.slice,
            pc: 0,
            call_span: site.span,
        }));
        Ok(())
    }
    /// Continue a modifier once the calls scheduled after this return
    pub fn then(&mut self, cont: Continuation, site: Site) {
        self.frames.push(Frame::Resume(cont, site));
    }
    /// Run until the frame stack is empty
    fn run_frames(&mut self) -> VmResult {
        let asm = self.asm;
        loop {
            let offset = match self.frames.last_mut() {
                None => return Ok(()),
                Some(Frame::Code(frame)) if frame.pc < frame.slice.len => {
                    let offset = frame.slice.start.saturating_add(frame.pc);
                    frame.pc += 1;
                    offset
                }
                Some(_) => {
                    self.finish_frame()?;
                    continue;
                }
            };
            let Some(instr) = asm.instrs.get(offset) else {
                let site = Site { offset, span: None };
                return Err(self.error(
                    site,
                    RuntimeErrorKind::UnresolvedReference(format!("instruction {offset}").into()),
                ));
            };
            let site = Site {
                offset,
                span: instr.span(),
            };
            self.poll(site)?;
            tracing::trace!(offset, %instr, stack = self.stack.len(), "executing");
            self.instr(instr, site)?;
        }
    }
    /// Pop a frame that has nothing left to run
    fn finish_frame(&mut self) -> VmResult {
        match self.frames.pop() {
            Some(Frame::Code(frame)) => {
                if frame.func.is_some() {
                    self.call_depth -= 1;
                }
                Ok(())
            }
            Some(Frame::Resume(cont, site)) => {
                self.check_cancelled(site)?;
                cont.resume(self, site)
            }
            None => Ok(()),
        }
    }
    fn check_cancelled(&self, site: Site) -> VmResult {
        match &self.options.cancel {
            Some(cancel) if cancel.load(Ordering::Relaxed) => {
                Err(self.error(site, RuntimeErrorKind::Cancelled))
            }
            _ => Ok(()),
        }
    }
    fn poll(&mut self, site: Site) -> VmResult {
        self.check_cancelled(site)?;
        self.executed += 1;
        if let Some(limit) = self.options.instruction_limit {
            if self.executed > limit {
                return Err(self.error(site, RuntimeErrorKind::InstructionLimit(limit)));
            }
        }
        Ok(())
    }
    fn instr(&mut self, instr: &'a Instr, site: Site) -> VmResult {
        match instr {
            Instr::Push(index) => {
                let Some(value) = self.asm.constants.get(*index) else {
                    return Err(self.error(
                        site,
                        RuntimeErrorKind::UnresolvedReference(format!("constant {index}").into()),
                    ));
                };
                self.push(value.clone());
            }
            Instr::Prim(prim, _) => self.prim(*prim, site)?,
            Instr::Call(func, _) => self.call(*func, site)?,
            Instr::Sys {
                name,
                args,
                outputs,
                ..
            } => self.sys_call(name, Signature::new(*args, *outputs), site)?,
            Instr::BeginArray { args } => {
                let Some(base) = self.stack.len().checked_sub(*args) else {
                    return Err(self.error(
                        site,
                        RuntimeErrorKind::EmptyStack("array element".into()),
                    ));
                };
                self.array_bases.push(base);
            }
            Instr::EndArray { boxed, .. } => {
                let base = match self.array_bases.pop() {
                    Some(base) if base <= self.stack.len() => base,
                    _ => {
                        return Err(self.error(
                            site,
                            RuntimeErrorKind::EmptyStack("array element".into()),
                        ))
                    }
                };
                let mut rows: Vec<Value> = self.stack.drain(base..).rev().collect();
                if *boxed {
                    rows = rows.into_iter().map(Value::boxed).collect();
                }
                let array = self.check(site, Value::from_row_values(rows))?;
                self.push(array);
            }
            Instr::Reduce { func, .. } => reduce::reduce(self, *func, site)?,
            Instr::Each { func, .. } => loops::each(self, *func, site)?,
            Instr::Rows { func, .. } => loops::rows(self, *func, site)?,
            Instr::Repeat { func, .. } => loops::repeat(self, *func, site)?,
            Instr::Do { body, cond, .. } => loops::do_while(self, *body, *cond, site)?,
            Instr::Switch { branches, .. } => loops::switch(self, branches, site)?,
            Instr::Dip { func, .. } => loops::dip(self, *func, site)?,
            Instr::Fork { f, g, .. } => loops::fork(self, *f, *g, site)?,
        }
        Ok(())
    }
    fn sys_call(&mut self, name: &Ident, sig: Signature, site: Site) -> VmResult {
        let sys = self.sys;
        let Some(sys_fn) = sys.get(name) else {
            return Err(self.error(
                site,
                RuntimeErrorKind::UnresolvedReference(format!("&{name}").into()),
            ));
        };
        let system_error = |message: String| RuntimeErrorKind::System {
            name: name.clone(),
            message,
        };
        if sys_fn.sig() != sig {
            return Err(self.error(
                site,
                system_error(format!(
                    "it is registered as {}, but the program expects {sig}",
                    sys_fn.sig()
                )),
            ));
        }
        let mut args = Vec::with_capacity(sig.args());
        for i in 0..sig.args() {
            args.push(self.pop(format!("argument {} of &{name}", i + 1), site)?);
        }
        tracing::debug!(name = %name, "system call");
        let outputs = (sys_fn.handler)(sys.backend(), args)
            .map_err(|message| self.error(site, system_error(message)))?;
        if outputs.len() != sig.outputs() {
            return Err(self.error(
                site,
                system_error(format!(
                    "it returned {} values instead of {}",
                    outputs.len(),
                    sig.outputs()
                )),
            ));
        }
        self.stack.extend(outputs);
        Ok(())
    }
    fn monadic(
        &mut self,
        prim: Primitive,
        site: Site,
        f: impl FnOnce(Value) -> RuntimeResult<Value>,
    ) -> VmResult {
        let a = self.pop((prim, 1), site)?;
        let out = self.check(site, f(a))?;
        self.push(out);
        Ok(())
    }
    fn dyadic(
        &mut self,
        prim: Primitive,
        site: Site,
        f: impl FnOnce(Value, Value) -> RuntimeResult<Value>,
    ) -> VmResult {
        let a = self.pop((prim, 1), site)?;
        let b = self.pop((prim, 2), site)?;
        let out = self.check(site, f(a, b))?;
        self.push(out);
        Ok(())
    }
    fn prim(&mut self, prim: Primitive, site: Site) -> VmResult {
        use Primitive::*;
        let sem = self.options.complex;
        match prim {
            Dup => {
                let a = self.pop((prim, 1), site)?;
                self.push(a.clone());
                self.push(a);
            }
            Over => {
                let a = self.pop((prim, 1), site)?;
                let b = self.pop((prim, 2), site)?;
                self.push(b.clone());
                self.push(a);
                self.push(b);
            }
            Flip => {
                let a = self.pop((prim, 1), site)?;
                let b = self.pop((prim, 2), site)?;
                self.push(a);
                self.push(b);
            }
            Pop => {
                self.pop((prim, 1), site)?;
            }
            Identity => self.monadic(prim, site, Ok)?,
            Eta => self.push(FRAC_PI_2),
            Pi => self.push(PI),
            Tau => self.push(TAU),
            Infinity => self.push(f64::INFINITY),
            Not => self.monadic(prim, site, |a| pervade::not(a, sem))?,
            Sign => self.monadic(prim, site, |a| pervade::sign(a, sem))?,
            Neg => self.monadic(prim, site, |a| pervade::neg(a, sem))?,
            Abs => self.monadic(prim, site, |a| pervade::abs(a, sem))?,
            Sqrt => self.monadic(prim, site, |a| pervade::sqrt(a, sem))?,
            Floor => self.monadic(prim, site, |a| pervade::floor(a, sem))?,
            Ceil => self.monadic(prim, site, |a| pervade::ceil(a, sem))?,
            Round => self.monadic(prim, site, |a| pervade::round(a, sem))?,
            Eq => self.dyadic(prim, site, |a, b| pervade::is_eq(a, b, sem))?,
            Ne => self.dyadic(prim, site, |a, b| pervade::is_ne(a, b, sem))?,
            Lt => self.dyadic(prim, site, |a, b| pervade::is_lt(a, b, sem))?,
            Le => self.dyadic(prim, site, |a, b| pervade::is_le(a, b, sem))?,
            Gt => self.dyadic(prim, site, |a, b| pervade::is_gt(a, b, sem))?,
            Ge => self.dyadic(prim, site, |a, b| pervade::is_ge(a, b, sem))?,
            Add => self.dyadic(prim, site, |a, b| pervade::add(a, b, sem))?,
            Sub => self.dyadic(prim, site, |a, b| pervade::sub(a, b, sem))?,
            Mul => self.dyadic(prim, site, |a, b| pervade::mul(a, b, sem))?,
            Div => self.dyadic(prim, site, |a, b| pervade::div(a, b, sem))?,
            Modulus => self.dyadic(prim, site, |a, b| pervade::modulus(a, b, sem))?,
            Pow => self.dyadic(prim, site, |a, b| pervade::pow(a, b, sem))?,
            Min => self.dyadic(prim, site, |a, b| pervade::min(a, b, sem))?,
            Max => self.dyadic(prim, site, |a, b| pervade::max(a, b, sem))?,
            Complex => self.dyadic(prim, site, |a, b| pervade::complex(a, b, sem))?,
            Len => self.monadic(prim, site, |a| Ok(a.len_value()))?,
            Shape => self.monadic(prim, site, |a| Ok(a.shape_value()))?,
            Range => self.monadic(prim, site, |a| a.range())?,
            First => self.monadic(prim, site, Value::first)?,
            Reverse => self.monadic(prim, site, |a| Ok(a.reverse()))?,
            Deshape => self.monadic(prim, site, |a| Ok(a.deshape()))?,
            Transpose => self.monadic(prim, site, |a| Ok(a.transpose()))?,
            Rise => self.monadic(prim, site, |a| Ok(a.rise()))?,
            Fall => self.monadic(prim, site, |a| Ok(a.fall()))?,
            Box => self.monadic(prim, site, |a| Ok(a.boxed()))?,
            Unbox => self.monadic(prim, site, Value::unboxed)?,
            Match => self.dyadic(prim, site, |a, b| Ok(a.match_value(&b)))?,
            Couple => self.dyadic(prim, site, Value::couple)?,
            Join => self.dyadic(prim, site, Value::join)?,
            Select => self.dyadic(prim, site, |a, b| a.select(&b))?,
            Pick => self.dyadic(prim, site, |a, b| a.pick(&b))?,
            Reshape => self.dyadic(prim, site, |a, b| a.reshape(b))?,
            Take => self.dyadic(prim, site, |a, b| a.take(b))?,
            Drop => self.dyadic(prim, site, |a, b| a.drop(b))?,
            Rotate => self.dyadic(prim, site, |a, b| a.rotate(b))?,
            Keep => self.dyadic(prim, site, |a, b| a.keep(b))?,
            Windows => self.dyadic(prim, site, |a, b| a.windows(&b))?,
            Find => self.dyadic(prim, site, |a, b| a.find(b))?,
            Member => self.dyadic(prim, site, |a, b| a.member(b))?,
            IndexOf => self.dyadic(prim, site, |a, b| a.index_of(b))?,
            Reduce | Each | Rows | Repeat | Do | Dip | Fork | Switch => {
                return Err(self.error(
                    site,
                    RuntimeErrorKind::Domain(
                        format!("{} cannot be called without operands", prim.format()).into(),
                    ),
                ))
            }
        }
        Ok(())
    }
}

fn unresolved_function(func: usize) -> RuntimeErrorKind {
    RuntimeErrorKind::UnresolvedReference(format!("function {func}").into())
}

/// Something that names a value popped from the stack
pub(crate) trait StackArg {
    fn arg_name(self) -> String;
}

impl StackArg for &str {
    fn arg_name(self) -> String {
        self.into()
    }
}

impl StackArg for String {
    fn arg_name(self) -> String {
        self
    }
}

impl StackArg for (Primitive, usize) {
    fn arg_name(self) -> String {
        format!("argument {} of {}", self.1, self.0.format())
    }
}

impl fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("stack", &self.stack)
            .field("frames", &self.frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Function, FunctionId, SafeSys, SysFn};

    fn asm(root: Vec<Instr>, constants: Vec<Value>) -> Assembly {
        let len = root.len();
        let span_count = root.iter().filter_map(Instr::span).max().map_or(0, |i| i + 1);
        Assembly {
            instrs: root.into_iter().collect(),
            constants: constants.into_iter().collect(),
            root: FuncSlice { start: 0, len },
            spans: (0..span_count).map(|_| Span::Builtin).collect(),
            ..Assembly::default()
        }
    }

    #[test]
    fn stack_primitives() {
        let asm = asm(
            vec![Instr::Prim(Primitive::Over, 0), Instr::Prim(Primitive::Flip, 0)],
            Vec::new(),
        );
        let stack = vec![Value::from(1i64), Value::from(2i64)];
        let out = Vm::default().run(&asm, stack).unwrap();
        assert_eq!(out, vec![Value::from(1i64), Value::from(1i64), Value::from(2i64)]);
    }

    #[test]
    fn empty_stack_names_the_argument() {
        let asm = asm(vec![Instr::Prim(Primitive::Add, 0)], Vec::new());
        let err = Vm::default().run(&asm, vec![Value::from(1i64)]).unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(
            matches!(&err.kind, RuntimeErrorKind::EmptyStack(name) if name.contains("argument 2")),
            "{err}"
        );
    }

    #[test]
    fn arrays_are_built_from_pushed_values() {
        let asm = asm(
            vec![
                Instr::BeginArray { args: 0 },
                Instr::Push(0),
                Instr::Push(1),
                Instr::EndArray {
                    boxed: false,
                    span: 0,
                },
            ],
            vec![Value::from(3i64), Value::from(2i64)],
        );
        let out = Vm::default().run(&asm, Vec::new()).unwrap();
        assert_eq!(out, vec![Value::from([2i64, 3])]);
    }

    #[test]
    fn missing_functions_are_unresolved() {
        let asm = asm(vec![Instr::Call(3, 0)], Vec::new());
        let err = Vm::default().run(&asm, Vec::new()).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::UnresolvedReference(_)));
        let err = Vm::default().call_export(&asm, "F", Vec::new()).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UnresolvedReference("F".into()));
    }

    #[test]
    fn recursion_overflows() {
        let mut asm = asm(vec![Instr::Call(0, 0)], Vec::new());
        asm.instrs.push(Instr::Call(0, 0));
        asm.functions.push(Function {
            id: FunctionId::Named("F".into()),
            sig: Signature::new(0, 0),
            slice: FuncSlice { start: 1, len: 1 },
        });
        let err = Vm::default().max_call_depth(16).run(&asm, Vec::new()).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::StackOverflow { limit: 16 });
        assert_eq!(err.trace.len(), 16);
        assert_eq!(err.trace[0].id, FunctionId::Named("F".into()));
    }

    #[test]
    fn cancellation_and_limits() {
        let program = asm(vec![Instr::Push(0), Instr::Push(0), Instr::Push(0)], vec![Value::from(1i64)]);
        let err = Vm::default().instruction_limit(2).run(&program, Vec::new()).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::InstructionLimit(2));
        assert_eq!(err.offset, 2);

        let flag = Arc::new(AtomicBool::new(true));
        let err = Vm::default().cancel_flag(flag.clone()).run(&program, Vec::new()).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Cancelled);
        flag.store(false, Ordering::Relaxed);
        let out = Vm::default().cancel_flag(flag).run(&program, Vec::new()).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn system_calls_go_through_the_registry() {
        let sys = SafeSys::new();
        let mut registry = SysRegistry::with_builtins(sys.clone());
        registry.register(SysFn::new("fail", 0, 0, |_, _| Err("nope".into())));
        let vm = Vm::default().with_sys(Arc::new(registry));
        let call = |name: &str, args: usize, outputs: usize| Instr::Sys {
            name: name.into(),
            args,
            outputs,
            span: 0,
        };

        let program = asm(vec![Instr::Push(0), call("p", 1, 0)], vec![Value::from("hi")]);
        assert_eq!(vm.run(&program, Vec::new()).unwrap(), Vec::<Value>::new());
        assert_eq!(sys.take_stdout(), "hi\n");

        let program = asm(vec![call("fail", 0, 0)], Vec::new());
        let err = vm.run(&program, Vec::new()).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::System { .. }));

        let program = asm(vec![call("missing", 0, 0)], Vec::new());
        let err = vm.run(&program, Vec::new()).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UnresolvedReference("&missing".into()));
    }
}
