//! Strata's abstract syntax tree
//!
//! Expressions are stored in execution order. A line like `+ 1 2` runs `2`,
//! then `1`, then `+`, so its folded form is a single [`Expr::Apply`] whose
//! arguments are `[2, 1]`. Emitting a tree in post-order reproduces the
//! source's right-to-left order exactly.

use std::fmt;

use ecow::EcoString;
use serde::*;

use crate::{CodeSpan, Ident, NumLit, Primitive, Signature, Sp};

/// The index of a binding in a [`Program`]'s binding table
pub type BindingId = usize;

/// A parsed compilation unit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Program {
    /// Top-level items, in source order
    pub items: Vec<Item>,
    /// Every binding in the unit, both global and local
    pub bindings: Vec<Binding>,
}

impl Program {
    /// Find a global binding by name
    ///
    /// Later definitions shadow earlier ones.
    pub fn global(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .rev()
            .find(|b| !b.local && b.name.value == name)
    }
    /// Iterate over the top-level lines
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.items.iter().filter_map(|item| match item {
            Item::Line(line) => Some(line),
            Item::Binding(_) => None,
        })
    }
}

/// A top-level item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Item {
    /// A global binding definition
    Binding(BindingId),
    /// A line of code that runs when the program runs
    Line(Line),
}

/// A line of code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    /// The expressions, in execution order
    pub exprs: Vec<Sp<Expr>>,
    /// The signature of the whole line
    pub sig: Signature,
    /// The span of the line
    pub span: CodeSpan,
}

/// A named function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    /// The name of the binding
    pub name: Sp<Ident>,
    /// The index of this binding in the binding table
    pub id: BindingId,
    /// The signature of the body
    pub sig: Signature,
    /// Whether the signature was written in the source
    pub declared: bool,
    /// The body
    pub body: Block,
    /// The doc comment above the binding
    pub comment: Option<EcoString>,
    /// Whether the binding is local to a group or block
    pub local: bool,
}

/// A sequence of expressions with its own scope
///
/// Blocks are the bodies of bindings, the operands of modifiers, and the
/// contents of inline groups and array literals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    /// The expressions, in execution order
    pub body: Vec<Sp<Expr>>,
    /// The signature of the body
    pub sig: Signature,
    /// The span of the block
    pub span: CodeSpan,
}

impl Block {
    /// Create a block from expressions in execution order
    pub fn new(body: Vec<Sp<Expr>>, span: CodeSpan) -> Self {
        let sig = Signature::chain(body.iter().map(|expr| expr.value.sig()));
        Block { body, sig, span }
    }
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    /// A number
    Num(NumLit),
    /// A character
    Char(char),
    /// A string, which is a list of characters
    Str(EcoString),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Num(n) => n.fmt(f),
            Literal::Char(c) => write!(f, "@{}", c.escape_debug()),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Something that can be called
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FuncRef {
    /// A non-modifier primitive
    Prim(Primitive),
    /// A system function
    Sys {
        /// The name, without the `&`
        name: Ident,
        /// The registered signature
        sig: Signature,
    },
    /// A binding
    Binding {
        /// The binding's index
        id: BindingId,
        /// The binding's signature
        sig: Signature,
    },
}

impl FuncRef {
    /// Get the signature of the referenced function
    pub fn sig(&self) -> Signature {
        match self {
            FuncRef::Prim(prim) => prim.sig().unwrap_or_default(),
            FuncRef::Sys { sig, .. } | FuncRef::Binding { sig, .. } => *sig,
        }
    }
}

/// A callable applied to the expressions that run directly before it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Apply {
    /// The callable
    pub func: Sp<Expr>,
    /// The operand expressions, in execution order
    pub args: Vec<Sp<Expr>>,
    /// The signature of the whole application
    pub sig: Signature,
}

/// An expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Push a literal
    Literal(Literal),
    /// Build an array from the values its body pushes
    Array {
        /// The array body
        body: Block,
        /// Whether each element is boxed
        boxed: bool,
    },
    /// Call a function
    Ref(FuncRef),
    /// An inline group
    Block(Block),
    /// A modifier and its function operands
    ///
    /// For switch, each operand is one branch.
    Control {
        /// The modifier
        modifier: Primitive,
        /// The operands
        operands: Vec<Sp<Block>>,
        /// The signature of the modified function
        sig: Signature,
    },
    /// A callable with the operands that feed it
    Apply(Box<Apply>),
}

impl Expr {
    /// Get the stack signature of this expression
    pub fn sig(&self) -> Signature {
        match self {
            Expr::Literal(_) => Signature::new(0, 1),
            Expr::Array { body, .. } => Signature::new(body.sig.args(), 1),
            Expr::Ref(func) => func.sig(),
            Expr::Block(block) => block.sig,
            Expr::Control { sig, .. } => *sig,
            Expr::Apply(apply) => apply.sig,
        }
    }
    /// Whether this expression takes operands from the expressions before it
    pub fn is_callable(&self) -> bool {
        matches!(self, Expr::Ref(_) | Expr::Block(_) | Expr::Control { .. })
    }
    /// Visit every binding this expression references directly
    ///
    /// Bindings referenced only through other bindings are not visited.
    pub fn visit_bindings(&self, f: &mut impl FnMut(BindingId)) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ref(FuncRef::Binding { id, .. }) => f(*id),
            Expr::Ref(_) => {}
            Expr::Array { body, .. } | Expr::Block(body) => {
                body.body.iter().for_each(|e| e.value.visit_bindings(f))
            }
            Expr::Control { operands, .. } => {
                for op in operands {
                    op.value.body.iter().for_each(|e| e.value.visit_bindings(f));
                }
            }
            Expr::Apply(apply) => {
                apply.args.iter().for_each(|e| e.value.visit_bindings(f));
                apply.func.value.visit_bindings(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_signature_chains_in_execution_order() {
        let span = CodeSpan::dummy();
        let body = vec![
            span.clone().sp(Expr::Literal(Literal::Num(NumLit::Int(1)))),
            span.clone().sp(Expr::Ref(FuncRef::Prim(Primitive::Add))),
        ];
        let block = Block::new(body, span);
        assert_eq!(block.sig, (1, 1));
        let array = Expr::Array { body: block, boxed: false };
        assert_eq!(array.sig(), (1, 1));
        assert!(!array.is_callable());
    }
}
