use std::fmt;

use serde::*;

use crate::{CodeSpan, Ident};

/// A function stack signature
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Signature {
    /// The number of arguments the function pops off the stack
    args: u16,
    /// The number of values the function pushes onto the stack
    outputs: u16,
}

impl From<(usize, usize)> for Signature {
    fn from((args, outputs): (usize, usize)) -> Self {
        Self::new(args, outputs)
    }
}

impl From<Signature> for (usize, usize) {
    fn from(sig: Signature) -> Self {
        (sig.args(), sig.outputs())
    }
}

impl Signature {
    /// Create a new signature with the given number of arguments and outputs
    pub const fn new(args: usize, outputs: usize) -> Self {
        Self {
            args: args as u16,
            outputs: outputs as u16,
        }
    }
    /// Get the number of arguments
    #[inline(always)]
    pub const fn args(&self) -> usize {
        self.args as usize
    }
    /// Get the number of outputs
    #[inline(always)]
    pub const fn outputs(&self) -> usize {
        self.outputs as usize
    }
    /// The change in stack height caused by a function with this signature
    pub const fn balance(&self) -> isize {
        self.outputs as isize - self.args as isize
    }
    /// Check if this signature changes the stack size by the same amount as another signature
    pub fn is_compatible_with(self, other: Self) -> bool {
        self.balance() == other.balance()
    }
    /// Get the signature that has the maximum of the arguments and outputs of this signature and another
    pub fn max_with(self, other: Self) -> Self {
        Self::new(
            self.args().max(other.args()),
            self.outputs().max(other.outputs()),
        )
    }
    /// Compose signatures as if a function with signature `other` was called before a function with signature `self`
    pub fn compose(self, other: Self) -> Self {
        let args = other.args() + self.args().saturating_sub(other.outputs());
        let outputs = self.outputs() + other.outputs().saturating_sub(self.args());
        Self::new(args, outputs)
    }
    /// Compose a sequence of signatures given in execution order
    pub fn chain(sigs: impl IntoIterator<Item = Self>) -> Self {
        sigs.into_iter()
            .fold(Signature::new(0, 0), |acc, sig| sig.compose(acc))
    }
}

impl PartialEq<(usize, usize)> for Signature {
    fn eq(&self, other: &(usize, usize)) -> bool {
        self.args() == other.0 && self.outputs() == other.1
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}.{}", self.args, self.outputs)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}.{}", self.args, self.outputs)
    }
}

/// The identity of a compiled function
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionId {
    /// A named binding
    Named(Ident),
    /// An anonymous block used as a modifier operand
    Anonymous(CodeSpan),
    /// The top-level code
    Main,
}

impl PartialEq<&str> for FunctionId {
    fn eq(&self, other: &&str) -> bool {
        match self {
            FunctionId::Named(name) => &&**name == other,
            _ => false,
        }
    }
}

impl From<Ident> for FunctionId {
    fn from(name: Ident) -> Self {
        Self::Named(name)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionId::Named(name) => write!(f, "{name}"),
            FunctionId::Anonymous(span) => write!(f, "block at {span}"),
            FunctionId::Main => write!(f, "main"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_feeds_outputs_into_args() {
        // `+` after a function pushing two values consumes both
        let push_two = Signature::new(0, 2);
        let add = Signature::new(2, 1);
        assert_eq!(add.compose(push_two), (0, 1));
        // `+` after a single push still needs one value from below
        assert_eq!(add.compose(Signature::new(0, 1)), (1, 1));
        // pop after dup
        assert_eq!(Signature::new(1, 0).compose(Signature::new(1, 2)), (1, 1));
    }

    #[test]
    fn chain_runs_in_execution_order() {
        let sig = Signature::chain([
            Signature::new(0, 1),
            Signature::new(0, 1),
            Signature::new(2, 1),
            Signature::new(2, 1),
        ]);
        assert_eq!(sig, (1, 1));
        assert_eq!(Signature::chain([]), (0, 0));
    }

    #[test]
    fn compatibility_is_balance() {
        assert!(Signature::new(2, 1).is_compatible_with(Signature::new(1, 0)));
        assert!(!Signature::new(2, 1).is_compatible_with(Signature::new(1, 1)));
        assert_eq!(Signature::new(3, 1).balance(), -2);
    }
}
