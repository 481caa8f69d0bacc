use std::fmt;

use ecow::EcoVec;
use serde::*;
use tinyvec::TinyVec;

use crate::{FunctionId, Ident, Primitive, Signature};

/// A Strata bytecode instruction
///
/// Operands are indices into an [`Assembly`](crate::Assembly)'s constant
/// pool, function table, or span table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Instr {
    /// Push a constant
    Push(usize),
    /// Run a non-modifier primitive
    Prim(Primitive, usize),
    /// Call a function
    Call(usize, usize),
    /// Call a system function
    Sys {
        name: Ident,
        args: usize,
        outputs: usize,
        span: usize,
    },
    /// Start collecting values for an array
    ///
    /// `args` values already on the stack become part of the array.
    BeginArray { args: usize },
    /// Make an array from the values pushed since the matching [`Instr::BeginArray`]
    EndArray { boxed: bool, span: usize },
    /// `/` reduce
    Reduce { func: usize, span: usize },
    /// `∵` each
    Each { func: usize, span: usize },
    /// `≡` rows
    Rows { func: usize, span: usize },
    /// `⍥` repeat
    Repeat { func: usize, span: usize },
    /// `⍢` do
    Do { body: usize, cond: usize, span: usize },
    /// `⨬` switch
    Switch { branches: EcoVec<usize>, span: usize },
    /// `⊙` dip
    Dip { func: usize, span: usize },
    /// `⊃` fork
    Fork { f: usize, g: usize, span: usize },
}

impl Instr {
    /// Get the indices of the functions this instruction references
    pub fn functions(&self) -> TinyVec<[usize; 2]> {
        let mut funcs = TinyVec::new();
        match self {
            Instr::Call(func, _)
            | Instr::Reduce { func, .. }
            | Instr::Each { func, .. }
            | Instr::Rows { func, .. }
            | Instr::Repeat { func, .. }
            | Instr::Dip { func, .. } => funcs.push(*func),
            Instr::Do { body, cond, .. } => funcs.extend([*body, *cond]),
            Instr::Fork { f, g, .. } => funcs.extend([*f, *g]),
            Instr::Switch { branches, .. } => funcs.extend(branches.iter().copied()),
            _ => {}
        }
        funcs
    }
    /// Change every function index this instruction references
    pub fn map_functions(&mut self, f: impl Fn(usize) -> usize) {
        match self {
            Instr::Call(func, _)
            | Instr::Reduce { func, .. }
            | Instr::Each { func, .. }
            | Instr::Rows { func, .. }
            | Instr::Repeat { func, .. }
            | Instr::Dip { func, .. } => *func = f(*func),
            Instr::Do { body, cond, .. } => {
                *body = f(*body);
                *cond = f(*cond);
            }
            Instr::Fork { f: a, g: b, .. } => {
                *a = f(*a);
                *b = f(*b);
            }
            Instr::Switch { branches, .. } => {
                *branches = branches.iter().map(|&i| f(i)).collect();
            }
            _ => {}
        }
    }
    /// Get the span index, if the instruction has one
    pub fn span(&self) -> Option<usize> {
        match self {
            Instr::Push(_) | Instr::BeginArray { .. } => None,
            Instr::Prim(_, span)
            | Instr::Call(_, span)
            | Instr::Sys { span, .. }
            | Instr::EndArray { span, .. }
            | Instr::Reduce { span, .. }
            | Instr::Each { span, .. }
            | Instr::Rows { span, .. }
            | Instr::Repeat { span, .. }
            | Instr::Do { span, .. }
            | Instr::Switch { span, .. }
            | Instr::Dip { span, .. }
            | Instr::Fork { span, .. } => Some(*span),
        }
    }
    /// Get a mutable reference to the span index, if the instruction has one
    pub fn span_mut(&mut self) -> Option<&mut usize> {
        match self {
            Instr::Push(_) | Instr::BeginArray { .. } => None,
            Instr::Prim(_, span)
            | Instr::Call(_, span)
            | Instr::Sys { span, .. }
            | Instr::EndArray { span, .. }
            | Instr::Reduce { span, .. }
            | Instr::Each { span, .. }
            | Instr::Rows { span, .. }
            | Instr::Repeat { span, .. }
            | Instr::Do { span, .. }
            | Instr::Switch { span, .. }
            | Instr::Dip { span, .. }
            | Instr::Fork { span, .. } => Some(span),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Push(i) => write!(f, "push {i}"),
            Instr::Prim(prim, _) => write!(f, "{prim}"),
            Instr::Call(func, _) => write!(f, "call {func}"),
            Instr::Sys { name, .. } => write!(f, "&{name}"),
            Instr::BeginArray { args } => write!(f, "begin array ({args})"),
            Instr::EndArray { boxed: true, .. } => write!(f, "end box array"),
            Instr::EndArray { .. } => write!(f, "end array"),
            Instr::Reduce { func, .. } => write!(f, "/ {func}"),
            Instr::Each { func, .. } => write!(f, "∵ {func}"),
            Instr::Rows { func, .. } => write!(f, "≡ {func}"),
            Instr::Repeat { func, .. } => write!(f, "⍥ {func}"),
            Instr::Do { body, cond, .. } => write!(f, "⍢ {body} {cond}"),
            Instr::Switch { branches, .. } => write!(f, "⨬ {branches:?}"),
            Instr::Dip { func, .. } => write!(f, "⊙ {func}"),
            Instr::Fork { f: a, g: b, .. } => write!(f, "⊃ {a} {b}"),
        }
    }
}

/// A contiguous run of instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FuncSlice {
    /// The offset of the first instruction
    pub start: usize,
    /// The number of instructions
    pub len: usize,
}

impl FuncSlice {
    /// Get the offset one past the last instruction
    ///
    /// Saturates if the slice runs past `usize::MAX`.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.len)
    }
    /// Get the offset one past the last instruction, if it is representable
    pub fn checked_end(&self) -> Option<usize> {
        self.start.checked_add(self.len)
    }
}

/// An entry in an assembly's function table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// The function's identity
    pub id: FunctionId,
    /// The function's stack signature
    pub sig: Signature,
    /// The function's instructions
    pub slice: FuncSlice,
}
