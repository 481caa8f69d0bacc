//! The Strata compiler
//!
//! Source text goes through the lexer, the macro expander, and the parser
//! before the generator here turns the program into an [`Assembly`].

pub mod reach;

use std::{path::Path, sync::Arc};

use ecow::EcoVec;
use indexmap::{IndexMap, IndexSet};

use crate::{
    ast::{Block, Expr, FuncRef, Literal, Program},
    expand_macros, lex, parse, Assembly, CodeSpan, CompileError, FuncSlice, Function, FunctionId,
    Ident, InputSrc, Inputs, Instr, NumLit, ParseError, Primitive, Signature, Sp, Span,
    SysRegistry, Value, DEFAULT_MAX_MACRO_DEPTH,
};

/// Options that control compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// How deeply macros may expand inside one another
    pub max_macro_depth: usize,
    /// Bindings to keep even if the top-level code never uses them
    pub exports: Vec<Ident>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_macro_depth: DEFAULT_MAX_MACRO_DEPTH,
            exports: Vec::new(),
        }
    }
}

/// The Strata compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
    /// The system functions the parser checks `&name` calls against
    sys: Arc<SysRegistry>,
    /// Every input loaded so far, for error reporting
    inputs: Inputs,
}

impl Compiler {
    /// Create a new compiler with the default system functions
    pub fn new(options: CompileOptions) -> Self {
        Compiler {
            options,
            ..Self::default()
        }
    }
    /// Set the system function registry
    pub fn with_sys(mut self, sys: Arc<SysRegistry>) -> Self {
        self.sys = sys;
        self
    }
    /// Set how deeply macros may expand
    pub fn max_macro_depth(mut self, depth: usize) -> Self {
        self.options.max_macro_depth = depth;
        self
    }
    /// Keep a binding in the assembly even if nothing calls it
    pub fn export(mut self, name: impl Into<Ident>) -> Self {
        self.options.exports.push(name.into());
        self
    }
    /// Get the compile options
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }
    /// Get the inputs that have been loaded
    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }
    /// Compile a string
    pub fn load_str(&mut self, input: &str) -> Result<Assembly, CompileError> {
        let src = self.inputs.add_str(input);
        self.load_impl(input, src)
    }
    /// Compile the contents of a file
    ///
    /// The path is only used for error reporting.
    pub fn load_file(&mut self, path: &Path, input: &str) -> Result<Assembly, CompileError> {
        let src = self.inputs.add_file(path, input);
        self.load_impl(input, src)
    }
    fn load_impl(&mut self, input: &str, src: InputSrc) -> Result<Assembly, CompileError> {
        let tokens = lex(input, src)?;
        tracing::debug!(tokens = tokens.len(), "lexed");
        let (tokens, macros) = expand_macros(tokens, self.options.max_macro_depth)?;
        tracing::debug!(macros = macros.len(), tokens = tokens.len(), "expanded");
        let program = parse(tokens, &*self.sys)?;
        tracing::debug!(
            items = program.items.len(),
            bindings = program.bindings.len(),
            "parsed"
        );
        self.compile(&program)
    }
    /// Generate an assembly from a parsed program
    ///
    /// Functions that cannot be reached from the top-level code or the
    /// exports are removed.
    pub fn compile(&self, program: &Program) -> Result<Assembly, CompileError> {
        let mut asm = Generator::new(program).generate()?;
        for name in &self.options.exports {
            let Some(binding) = program.global(name) else {
                let error = ParseError::UnknownIdentifier(name.clone());
                return Err(CompileError::Parse(CodeSpan::dummy().sp(error)));
            };
            asm.exports.insert(name.clone(), binding.id);
        }
        let generated = asm.functions.len();
        reach::prune_unreachable(&mut asm);
        tracing::debug!(generated, kept = asm.functions.len(), "generated functions");
        Ok(asm)
    }
}

/// A function whose instructions are still being generated
struct PendingFunction {
    id: FunctionId,
    sig: Signature,
    instrs: Vec<Instr>,
}

/// Turns a program into instructions
///
/// Binding `n` becomes function `n`. Modifier operands are added after the
/// bindings in the order they are reached.
struct Generator<'a> {
    program: &'a Program,
    functions: Vec<PendingFunction>,
    constants: EcoVec<Value>,
    spans: IndexSet<Span>,
}

impl<'a> Generator<'a> {
    fn new(program: &'a Program) -> Self {
        let functions = (program.bindings.iter())
            .map(|binding| PendingFunction {
                id: FunctionId::Named(binding.name.value.clone()),
                sig: binding.sig,
                instrs: Vec::new(),
            })
            .collect();
        Generator {
            program,
            functions,
            constants: EcoVec::new(),
            spans: IndexSet::new(),
        }
    }
    fn generate(mut self) -> Result<Assembly, CompileError> {
        let program = self.program;
        for binding in &program.bindings {
            let mut instrs = Vec::new();
            self.block(&binding.body, &mut instrs)?;
            self.functions[binding.id].instrs = instrs;
        }
        let mut root = Vec::new();
        for line in program.lines() {
            for expr in &line.exprs {
                self.expr(expr, &mut root)?;
            }
        }
        Ok(self.finish(root))
    }
    /// Lay out the top-level code first, then every function in order
    fn finish(self, root: Vec<Instr>) -> Assembly {
        let mut instrs = EcoVec::with_capacity(
            root.len() + self.functions.iter().map(|f| f.instrs.len()).sum::<usize>(),
        );
        let root_slice = FuncSlice {
            start: 0,
            len: root.len(),
        };
        instrs.extend(root);
        let mut functions = EcoVec::with_capacity(self.functions.len());
        for pending in self.functions {
            let slice = FuncSlice {
                start: instrs.len(),
                len: pending.instrs.len(),
            };
            instrs.extend(pending.instrs);
            functions.push(Function {
                id: pending.id,
                sig: pending.sig,
                slice,
            });
        }
        Assembly {
            instrs,
            constants: self.constants,
            functions,
            exports: IndexMap::new(),
            root: root_slice,
            spans: self.spans.into_iter().collect(),
        }
    }
    fn span(&mut self, span: &CodeSpan) -> usize {
        self.spans.insert_full(Span::Code(span.clone())).0
    }
    fn constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }
    fn block(&mut self, block: &Block, out: &mut Vec<Instr>) -> Result<(), CompileError> {
        for expr in &block.body {
            self.expr(expr, out)?;
        }
        Ok(())
    }
    /// Compile a modifier operand as its own function
    fn function(&mut self, block: &Sp<Block>) -> Result<usize, CompileError> {
        let index = self.functions.len();
        self.functions.push(PendingFunction {
            id: FunctionId::Anonymous(block.span.clone()),
            sig: block.value.sig,
            instrs: Vec::new(),
        });
        let mut instrs = Vec::new();
        self.block(&block.value, &mut instrs)?;
        self.functions[index].instrs = instrs;
        Ok(index)
    }
    fn expr(&mut self, expr: &Sp<Expr>, out: &mut Vec<Instr>) -> Result<(), CompileError> {
        match &expr.value {
            Expr::Literal(lit) => {
                let index = self.constant(literal_value(lit));
                out.push(Instr::Push(index));
            }
            Expr::Array { body, boxed } => {
                out.push(Instr::BeginArray {
                    args: body.sig.args(),
                });
                self.block(body, out)?;
                let span = self.span(&expr.span);
                out.push(Instr::EndArray {
                    boxed: *boxed,
                    span,
                });
            }
            Expr::Ref(func) => {
                let span = self.span(&expr.span);
                out.push(match func {
                    FuncRef::Prim(prim) => Instr::Prim(*prim, span),
                    FuncRef::Sys { name, sig } => Instr::Sys {
                        name: name.clone(),
                        args: sig.args(),
                        outputs: sig.outputs(),
                        span,
                    },
                    FuncRef::Binding { id, .. } => Instr::Call(*id, span),
                });
            }
            Expr::Block(block) => self.block(block, out)?,
            Expr::Control {
                modifier, operands, ..
            } => {
                let funcs = (operands.iter())
                    .map(|op| self.function(op))
                    .collect::<Result<Vec<_>, _>>()?;
                let span = self.span(&expr.span);
                let instr = control_instr(*modifier, &funcs, span).ok_or_else(|| {
                    let error = ParseError::MissingOperand(*modifier);
                    CompileError::Parse(expr.span.clone().sp(error))
                })?;
                out.push(instr);
            }
            Expr::Apply(apply) => {
                for arg in &apply.args {
                    self.expr(arg, out)?;
                }
                self.expr(&apply.func, out)?;
            }
        }
        Ok(())
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Num(NumLit::Int(i)) => Value::from(*i),
        Literal::Num(NumLit::Real(x)) => Value::from(*x),
        Literal::Char(c) => Value::from(*c),
        Literal::Str(s) => Value::from(s.as_str()),
    }
}

fn control_instr(modifier: Primitive, funcs: &[usize], span: usize) -> Option<Instr> {
    use Primitive::*;
    Some(match (modifier, funcs) {
        (Reduce, &[func]) => Instr::Reduce { func, span },
        (Each, &[func]) => Instr::Each { func, span },
        (Rows, &[func]) => Instr::Rows { func, span },
        (Repeat, &[func]) => Instr::Repeat { func, span },
        (Do, &[body, cond]) => Instr::Do { body, cond, span },
        (Dip, &[func]) => Instr::Dip { func, span },
        (Fork, &[f, g]) => Instr::Fork { f, g, span },
        (Switch, branches) if !branches.is_empty() => Instr::Switch {
            branches: branches.into(),
            span,
        },
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(input: &str) -> Assembly {
        Compiler::default().load_str(input).unwrap()
    }

    #[test]
    fn arguments_run_before_their_function() {
        let asm = compile("+ 1 2");
        let instrs = asm.root_instrs();
        assert!(matches!(instrs[0], Instr::Push(i) if asm.constants[i] == Value::from(2i64)));
        assert!(matches!(instrs[1], Instr::Push(i) if asm.constants[i] == Value::from(1i64)));
        assert!(matches!(instrs[2], Instr::Prim(Primitive::Add, _)));
    }

    #[test]
    fn operands_become_functions() {
        let asm = compile("/+ [1 2 3]");
        assert_eq!(asm.functions.len(), 1);
        assert!(matches!(asm.functions[0].id, FunctionId::Anonymous(_)));
        assert_eq!(asm.functions[0].sig, (2, 1));
        assert!(matches!(asm.root_instrs().last(), Some(Instr::Reduce { func: 0, .. })));
        assert!(matches!(
            asm.function_instrs(&asm.functions[0]),
            [Instr::Prim(Primitive::Add, _)]
        ));
    }

    #[test]
    fn arrays_record_outside_arguments() {
        let asm = compile("[+ 1] 2");
        assert!(asm.root_instrs().contains(&Instr::BeginArray { args: 1 }));
    }

    #[test]
    fn exports_must_exist() {
        let mut compiler = Compiler::default().export("Missing");
        assert!(matches!(
            compiler.load_str("+ 1 2"),
            Err(CompileError::Parse(e)) if e.value == ParseError::UnknownIdentifier("Missing".into())
        ));
        let asm = Compiler::default().export("F").load_str("F ← +1\n2").unwrap();
        assert_eq!(asm.export("F").map(|f| f.sig), Some(Signature::new(1, 1)));
    }

    #[test]
    fn spans_are_shared() {
        let asm = compile("+ 1 2\n× 3 4");
        assert_eq!(asm.spans.len(), 2);
        let mut compiler = Compiler::default();
        compiler.load_str("1").unwrap();
        compiler.load_str("2").unwrap();
        assert_eq!(compiler.inputs().strings.len(), 2);
    }
}
