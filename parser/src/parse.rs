//! The Strata parser
//!
//! Each line is read left to right into terms and then folded right to left
//! into [`Expr::Apply`] trees. A callable claims the nearest preceding
//! expressions (in execution order) whose outputs fit its arity. Anything
//! left over comes from the stack at run time.

use std::{
    collections::{HashMap, HashSet},
    fmt, mem,
};

use ecow::EcoString;
use thiserror::Error;

use crate::{ast::*, AsciiToken, CodeSpan, Ident, NumLit, Primitive, Signature, Sp, Token};

/// Looks up system functions by name
pub trait SysLookup {
    /// Get the signature of a system function, if it exists
    fn sys_sig(&self, name: &str) -> Option<Signature>;
}

impl<F> SysLookup for F
where
    F: Fn(&str) -> Option<Signature>,
{
    fn sys_sig(&self, name: &str) -> Option<Signature> {
        self(name)
    }
}

/// An error that occurred while parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A token that cannot appear here
    #[error("Unexpected {0}")]
    Unexpected(Token),
    /// Something required is missing
    #[error("Expected {expected}, found {}", describe_found(.found))]
    Expected {
        /// What was expected
        expected: Expectation,
        /// What was found instead
        found: Option<Token>,
    },
    /// A macro that was never defined
    #[error("Unknown macro {0}")]
    UnknownMacro(Ident),
    /// A name that is not bound in any enclosing scope
    #[error("Unknown identifier {0}")]
    UnknownIdentifier(Ident),
    /// A system function that is not registered
    #[error("Unknown system function &{0}")]
    UnknownSys(Ident),
    /// A binding that refers to itself without a declared signature
    #[error("{0} refers to itself, so it must declare its signature")]
    RecursionWithoutSignature(Ident),
    /// A modifier without enough function operands
    #[error("{} is missing a function operand", .0.format())]
    MissingOperand(Primitive),
    /// A function operand with the wrong signature for its modifier
    #[error("{} operand has signature {sig}, but {requirement}", .modifier.format())]
    InvalidOperand {
        /// The modifier
        modifier: Primitive,
        /// The operand's signature
        sig: Signature,
        /// What the modifier requires
        requirement: &'static str,
    },
    /// Switch branches that change the stack height by different amounts
    #[error("Switch branches have incompatible signatures {0} and {1}")]
    IncompatibleBranches(Signature, Signature),
    /// A declared signature that disagrees with the body
    #[error("{name} is declared as {declared}, but its body has signature {inferred}")]
    SignatureMismatch {
        /// The binding
        name: Ident,
        /// The declared signature
        declared: Signature,
        /// The signature of the body
        inferred: Signature,
    },
    /// A malformed signature declaration
    #[error("Invalid signature")]
    InvalidSignature,
    /// A macro placeholder in ordinary code
    #[error("Placeholder ^{0} can only be used in a macro")]
    PlaceholderOutsideMacro(usize),
}

fn describe_found(found: &Option<Token>) -> String {
    match found {
        Some(token) => token.to_string(),
        None => "end of input".into(),
    }
}

/// Something the parser expected to find
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// Any term
    Term,
    /// A specific token
    Token(Token),
    /// A signature declaration
    Signature,
}

impl From<AsciiToken> for Expectation {
    fn from(token: AsciiToken) -> Self {
        Expectation::Token(token.into())
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Term => write!(f, "a term"),
            Expectation::Token(token) => write!(f, "`{token}`"),
            Expectation::Signature => write!(f, "a signature like |2.1"),
        }
    }
}

type ParseResult<T = ()> = Result<T, Sp<ParseError>>;

/// Parse a macro-expanded token stream
///
/// Parsing stops at the first error.
pub fn parse(tokens: Vec<Sp<Token>>, sys: &dyn SysLookup) -> ParseResult<Program> {
    let mut parser = Parser {
        tokens,
        index: 0,
        sys,
        scopes: vec![HashMap::new()],
        bindings: Vec::new(),
        defining: HashSet::new(),
    };
    let items = parser.items()?;
    tracing::debug!(
        items = items.len(),
        bindings = parser.bindings.len(),
        "parsed program"
    );
    Ok(Program {
        items,
        bindings: parser.bindings,
    })
}

struct Parser<'s> {
    tokens: Vec<Sp<Token>>,
    index: usize,
    sys: &'s dyn SysLookup,
    scopes: Vec<HashMap<Ident, BindingId>>,
    bindings: Vec<Binding>,
    /// Bindings whose bodies are being parsed
    defining: HashSet<BindingId>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.index).map(|t| t.value.clone())
    }
    fn exact(&mut self, token: Token) -> Option<CodeSpan> {
        let span = (self.tokens.get(self.index))
            .filter(|t| t.value == token)?
            .span
            .clone();
        self.index += 1;
        Some(span)
    }
    fn curr_span(&self) -> CodeSpan {
        (self.tokens.get(self.index))
            .or(self.tokens.last())
            .map(|t| t.span.clone())
            .unwrap_or_else(CodeSpan::dummy)
    }
    fn prev_span(&self) -> CodeSpan {
        match self.index.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span.clone(),
            None => self.curr_span(),
        }
    }
    fn unexpected(&self) -> Sp<ParseError> {
        match self.tokens.get(self.index) {
            Some(token) => (token.span.clone()).sp(ParseError::Unexpected(token.value.clone())),
            None => self.expected(Expectation::Term),
        }
    }
    fn expected(&self, expected: impl Into<Expectation>) -> Sp<ParseError> {
        self.curr_span().sp(ParseError::Expected {
            expected: expected.into(),
            found: self.peek(),
        })
    }
    /// Skip blank lines and collect the comment lines directly above the next item
    fn leading_comments(&mut self) -> Option<EcoString> {
        let mut comments: Vec<EcoString> = Vec::new();
        let mut newlines = 0;
        loop {
            match self.peek() {
                Some(Token::Comment(text)) => {
                    comments.push(text);
                    newlines = 0;
                }
                Some(Token::Newline) => {
                    newlines += 1;
                    if newlines > 1 {
                        comments.clear();
                    }
                }
                _ => break,
            }
            self.index += 1;
        }
        if comments.is_empty() {
            return None;
        }
        let mut text = EcoString::new();
        for (i, comment) in comments.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            text.push_str(comment);
        }
        Some(text)
    }
    fn items(&mut self) -> ParseResult<Vec<Item>> {
        let mut items = Vec::new();
        loop {
            let comment = self.leading_comments();
            if self.index >= self.tokens.len() {
                break;
            }
            if let Some(id) = self.binding(comment, false)? {
                items.push(Item::Binding(id));
            } else {
                let start = self.curr_span();
                let exprs = self.line()?;
                if !exprs.is_empty() {
                    let sig = Signature::chain(exprs.iter().map(|e| e.value.sig()));
                    let span = start.merge(self.prev_span());
                    items.push(Item::Line(Line { exprs, sig, span }));
                }
            }
            match self.peek() {
                None => break,
                Some(Token::Newline) => self.index += 1,
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(items)
    }
    fn binding(&mut self, comment: Option<EcoString>, local: bool) -> ParseResult<Option<BindingId>> {
        let (
            Some(Sp {
                value: Token::Ident(name),
                span,
            }),
            Some(Sp {
                value: Token::LeftArrow,
                ..
            }),
        ) = (self.tokens.get(self.index), self.tokens.get(self.index + 1))
        else {
            return Ok(None);
        };
        let name = span.clone().sp(name.clone());
        self.index += 2;
        let declared = self.signature()?;
        let id = self.bindings.len();
        self.bindings.push(Binding {
            name: name.clone(),
            id,
            sig: declared.as_ref().map(|sig| sig.value).unwrap_or_default(),
            declared: declared.is_some(),
            body: Block::new(Vec::new(), name.span.clone()),
            comment,
            local,
        });
        // Only a declared binding can see itself. Otherwise its body sees
        // any binding it shadows.
        if declared.is_some() {
            self.bind(&name.value, id);
        }
        self.defining.insert(id);
        let body_start = self.index;
        let exprs = self.line()?;
        self.defining.remove(&id);
        if declared.is_none() {
            self.bind(&name.value, id);
        }
        let span = match self.tokens.get(body_start) {
            Some(first) if self.index > body_start => first.span.clone().merge(self.prev_span()),
            _ => name.span.clone(),
        };
        let body = Block::new(exprs, span);
        if let Some(declared) = declared {
            if declared.value != body.sig {
                return Err(declared.span.sp(ParseError::SignatureMismatch {
                    name: name.value,
                    declared: declared.value,
                    inferred: body.sig,
                }));
            }
        }
        tracing::trace!(name = %name.value, sig = %body.sig, local, "parsed binding");
        let binding = &mut self.bindings[id];
        binding.sig = body.sig;
        binding.body = body;
        Ok(Some(id))
    }
    fn bind(&mut self, name: &Ident, id: BindingId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.clone(), id);
        }
    }
    /// Parse an optional `|args.outputs` declaration
    fn signature(&mut self) -> ParseResult<Option<Sp<Signature>>> {
        let Some(bar_span) = self.exact(AsciiToken::Bar.into()) else {
            return Ok(None);
        };
        let Some(Sp {
            value: Token::Number(n),
            span,
        }) = self.tokens.get(self.index).cloned()
        else {
            return Err(self.expected(Expectation::Signature));
        };
        self.index += 1;
        let sig = match n {
            NumLit::Int(args) => usize::try_from(args)
                .ok()
                .map(|args| Signature::new(args, 1)),
            NumLit::Real(r) => split_signature(r, &span),
        };
        match sig {
            Some(sig) => Ok(Some(bar_span.merge(span).sp(sig))),
            None => Err(span.sp(ParseError::InvalidSignature)),
        }
    }
    fn line(&mut self) -> ParseResult<Vec<Sp<Expr>>> {
        let mut terms = Vec::new();
        while let Some(term) = self.term()? {
            terms.push(term);
        }
        Ok(fold(terms))
    }
    /// Parse an atom and any strand it starts
    fn term(&mut self) -> ParseResult<Option<Sp<Expr>>> {
        let Some(first) = self.atom()? else {
            return Ok(None);
        };
        if self.peek() != Some(Token::Simple(AsciiToken::Underscore)) {
            return Ok(Some(first));
        }
        let start = first.span.clone();
        let mut items = vec![first];
        while self.exact(AsciiToken::Underscore.into()).is_some() {
            match self.atom()? {
                Some(item) => items.push(item),
                None => return Err(self.expected(Expectation::Term)),
            }
        }
        let span = start.merge(self.prev_span());
        items.reverse();
        let body = Block::new(items, span.clone());
        Ok(Some(span.sp(Expr::Array { body, boxed: false })))
    }
    fn atom(&mut self) -> ParseResult<Option<Sp<Expr>>> {
        let Some(token) = self.tokens.get(self.index).cloned() else {
            return Ok(None);
        };
        let span = token.span;
        let expr = match token.value {
            Token::Number(n) => Expr::Literal(Literal::Num(n)),
            Token::Char(c) => Expr::Literal(Literal::Char(c)),
            Token::Str(s) => Expr::Literal(Literal::Str(s)),
            Token::Ident(name) => {
                if let Some(arrow) = (self.tokens.get(self.index + 1))
                    .filter(|t| t.value == Token::LeftArrow)
                {
                    return Err(arrow.span.clone().sp(ParseError::Unexpected(Token::LeftArrow)));
                }
                Expr::Ref(self.resolve(span.clone().sp(name))?)
            }
            Token::Sys(name) => match self.sys.sys_sig(&name) {
                Some(sig) => Expr::Ref(FuncRef::Sys { name, sig }),
                None => return Err(span.sp(ParseError::UnknownSys(name))),
            },
            Token::Glyph(prim) if prim.is_modifier() => {
                self.index += 1;
                return self.modifier(span.sp(prim)).map(Some);
            }
            Token::Glyph(prim) => Expr::Ref(FuncRef::Prim(prim)),
            Token::Simple(AsciiToken::OpenParen) => {
                self.index += 1;
                let (branches, span) = self.delimited(span, AsciiToken::CloseParen, false)?;
                let block = single(branches, &span);
                return Ok(Some(span.sp(Expr::Block(block))));
            }
            Token::Simple(open @ (AsciiToken::OpenBracket | AsciiToken::OpenCurly)) => {
                self.index += 1;
                let boxed = open == AsciiToken::OpenCurly;
                let close = if boxed {
                    AsciiToken::CloseCurly
                } else {
                    AsciiToken::CloseBracket
                };
                let (branches, span) = self.delimited(span, close, false)?;
                let body = single(branches, &span);
                return Ok(Some(span.sp(Expr::Array { body, boxed })));
            }
            Token::Simple(ascii) => match Primitive::from_ascii(ascii) {
                Some(prim) => Expr::Ref(FuncRef::Prim(prim)),
                None => return Ok(None),
            },
            Token::Placeholder(n) => return Err(span.sp(ParseError::PlaceholderOutsideMacro(n))),
            Token::MacroName(name) => return Err(span.sp(ParseError::UnknownMacro(name))),
            // A comment ends the line
            Token::Comment(_) => {
                self.index += 1;
                return Ok(None);
            }
            Token::LeftArrow | Token::Newline => return Ok(None),
        };
        self.index += 1;
        Ok(Some(span.sp(expr)))
    }
    fn resolve(&self, name: Sp<Ident>) -> ParseResult<FuncRef> {
        let Some(id) = (self.scopes.iter().rev()).find_map(|scope| scope.get(&name.value).copied())
        else {
            let recursive = (self.defining.iter())
                .any(|&id| self.bindings[id].name.value == name.value);
            return Err(name.span.sp(if recursive {
                ParseError::RecursionWithoutSignature(name.value)
            } else {
                ParseError::UnknownIdentifier(name.value)
            }));
        };
        let binding = &self.bindings[id];
        Ok(FuncRef::Binding {
            id,
            sig: binding.sig,
        })
    }
    /// Parse the contents of a bracketed group after its opening delimiter
    ///
    /// Returns the branches and the span of the whole group.
    fn delimited(
        &mut self,
        open: CodeSpan,
        close: AsciiToken,
        branching: bool,
    ) -> ParseResult<(Vec<Sp<Block>>, CodeSpan)> {
        self.scopes.push(HashMap::new());
        let res = self.delimited_inner(open, close, branching);
        self.scopes.pop();
        res
    }
    fn delimited_inner(
        &mut self,
        open: CodeSpan,
        close: AsciiToken,
        branching: bool,
    ) -> ParseResult<(Vec<Sp<Block>>, CodeSpan)> {
        let mut branches = Vec::new();
        let mut exprs = Vec::new();
        let mut branch_start = open.clone();
        loop {
            let comment = self.leading_comments();
            match self.peek() {
                None => return Err(self.expected(close)),
                Some(Token::Simple(t)) if t == close => {
                    let span = branch_start.merge(self.prev_span());
                    branches.push(span.clone().sp(Block::new(mem::take(&mut exprs), span)));
                    let close_span = self.curr_span();
                    self.index += 1;
                    return Ok((branches, open.merge(close_span)));
                }
                Some(Token::Simple(AsciiToken::Bar)) if branching => {
                    let span = branch_start.merge(self.prev_span());
                    branches.push(span.clone().sp(Block::new(mem::take(&mut exprs), span)));
                    self.index += 1;
                    branch_start = self.curr_span();
                    continue;
                }
                _ => {}
            }
            if self.binding(comment, true)?.is_none() {
                exprs.extend(self.line()?);
            }
            match self.peek() {
                Some(Token::Newline) => self.index += 1,
                Some(Token::Simple(t)) if t == close || (branching && t == AsciiToken::Bar) => {}
                Some(_) => return Err(self.unexpected()),
                None => return Err(self.expected(close)),
            }
        }
    }
    fn modifier(&mut self, modifier: Sp<Primitive>) -> ParseResult<Sp<Expr>> {
        let operands = if modifier.value == Primitive::Switch {
            match self.exact(AsciiToken::OpenParen.into()) {
                Some(open) => self.delimited(open, AsciiToken::CloseParen, true)?.0,
                None => vec![self.operand(&modifier)?],
            }
        } else {
            let count = modifier.value.modifier_args().unwrap_or(0);
            let mut operands = Vec::with_capacity(count);
            for _ in 0..count {
                operands.push(self.operand(&modifier)?);
            }
            operands
        };
        let sig = modifier_sig(&modifier, &operands)?;
        let span = match operands.last() {
            Some(last) => modifier.span.clone().merge(last.span.clone()),
            None => modifier.span.clone(),
        };
        Ok(span.sp(Expr::Control {
            modifier: modifier.value,
            operands,
            sig,
        }))
    }
    fn operand(&mut self, modifier: &Sp<Primitive>) -> ParseResult<Sp<Block>> {
        match self.atom()? {
            Some(Sp {
                value: Expr::Block(block),
                span,
            }) => Ok(span.sp(block)),
            Some(expr) => {
                let span = expr.span.clone();
                Ok(span.clone().sp(Block::new(vec![expr], span)))
            }
            None => Err((modifier.span.clone()).sp(ParseError::MissingOperand(modifier.value))),
        }
    }
}

fn single(branches: Vec<Sp<Block>>, span: &CodeSpan) -> Block {
    let mut block = (branches.into_iter().next())
        .map(|branch| branch.value)
        .unwrap_or_else(|| Block::new(Vec::new(), span.clone()));
    block.span = span.clone();
    block
}

/// Fold terms in source order into expressions in execution order
fn fold(terms: Vec<Sp<Expr>>) -> Vec<Sp<Expr>> {
    let mut pending: Vec<Sp<Expr>> = Vec::with_capacity(terms.len());
    for term in terms.into_iter().rev() {
        if !term.value.is_callable() {
            pending.push(term);
            continue;
        }
        let sig = term.value.sig();
        let mut start = pending.len();
        let mut covered = 0;
        while covered < sig.args() && start > 0 {
            let outputs = pending[start - 1].value.sig().outputs();
            if outputs == 0 || covered + outputs > sig.args() {
                break;
            }
            covered += outputs;
            start -= 1;
        }
        if start == pending.len() {
            pending.push(term);
            continue;
        }
        let args = pending.split_off(start);
        let app_sig = Signature::chain(args.iter().map(|arg| arg.value.sig()).chain([sig]));
        let span = match args.first() {
            Some(first) => term.span.clone().merge(first.span.clone()),
            None => term.span.clone(),
        };
        pending.push(span.sp(Expr::Apply(Box::new(Apply {
            func: term,
            args,
            sig: app_sig,
        }))));
    }
    pending
}

/// Split a literal like `2.1` into 2 arguments and 1 output
///
/// The span gives the literal's written length, so `1.10` means 10 outputs.
fn split_signature(r: f64, span: &CodeSpan) -> Option<Signature> {
    if !r.is_finite() || r < 0.0 {
        return None;
    }
    let len = span.end.char_pos.checked_sub(span.start.char_pos)? as usize;
    let args = r.trunc();
    let frac_digits = len.checked_sub(args.to_string().len() + 1)?;
    if frac_digits == 0 || frac_digits > 4 {
        return None;
    }
    let outputs = ((r - args) * 10f64.powi(frac_digits as i32)).round();
    Some(Signature::new(args as usize, outputs as usize))
}

/// Check a modifier's operands and get the modified function's signature
fn modifier_sig(modifier: &Sp<Primitive>, operands: &[Sp<Block>]) -> ParseResult<Signature> {
    use Primitive::*;
    let invalid = |op: &Sp<Block>, requirement: &'static str| {
        Err(op.span.clone().sp(ParseError::InvalidOperand {
            modifier: modifier.value,
            sig: op.value.sig,
            requirement,
        }))
    };
    Ok(match (modifier.value, operands) {
        (Reduce, [f]) => {
            if f.value.sig != (2, 1) {
                return invalid(f, "a reduce operand must be |2.1");
            }
            Signature::new(1, 1)
        }
        (Each | Rows, [f]) => {
            let sig = f.value.sig;
            if sig.args() == 0 || sig.outputs() != 1 {
                return invalid(f, "it must take at least one argument and return one value");
            }
            Signature::new(sig.args(), 1)
        }
        (Repeat, [f]) => {
            let sig = f.value.sig;
            if sig.args() != sig.outputs() {
                return invalid(f, "it must return as many values as it takes");
            }
            Signature::new(sig.args() + 1, sig.outputs())
        }
        (Do, [body, cond]) => {
            if body.value.sig.args() != body.value.sig.outputs() {
                return invalid(body, "the loop body must return as many values as it takes");
            }
            if cond.value.sig.outputs() != cond.value.sig.args() + 1 {
                return invalid(
                    cond,
                    "the loop condition must return one more value than it takes",
                );
            }
            let args = body.value.sig.args().max(cond.value.sig.args());
            Signature::new(args, args)
        }
        (Dip, [f]) => Signature::new(f.value.sig.args() + 1, f.value.sig.outputs() + 1),
        (Fork, [f, g]) => Signature::new(
            f.value.sig.args().max(g.value.sig.args()),
            f.value.sig.outputs() + g.value.sig.outputs(),
        ),
        (Switch, [first, rest @ ..]) => {
            let mut args = first.value.sig.args();
            for branch in rest {
                if !branch.value.sig.is_compatible_with(first.value.sig) {
                    return Err(branch.span.clone().sp(ParseError::IncompatibleBranches(
                        first.value.sig,
                        branch.value.sig,
                    )));
                }
                args = args.max(branch.value.sig.args());
            }
            let outputs = (args as isize + first.value.sig.balance()).max(0) as usize;
            Signature::new(args + 1, outputs)
        }
        _ => {
            return Err((modifier.span.clone()).sp(ParseError::MissingOperand(modifier.value)));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex, InputSrc};

    fn parse_str(input: &str) -> ParseResult<Program> {
        let tokens = lex(input, InputSrc::Str(0)).unwrap();
        let sys = |name: &str| (name == "p").then(|| Signature::new(1, 0));
        parse(tokens, &sys)
    }

    fn error(input: &str) -> ParseError {
        parse_str(input).unwrap_err().value
    }

    fn only_line(program: &Program) -> &Line {
        let lines: Vec<_> = program.lines().collect();
        assert_eq!(lines.len(), 1, "{program:?}");
        lines[0]
    }

    #[test]
    fn application_in_execution_order() {
        let program = parse_str("- 1 5").unwrap();
        let line = only_line(&program);
        assert_eq!(line.sig, (0, 1));
        let [expr] = line.exprs.as_slice() else {
            panic!("expected one expression: {line:?}");
        };
        let Expr::Apply(apply) = &expr.value else {
            panic!("expected an application: {expr:?}");
        };
        assert_eq!(apply.func.value, Expr::Ref(FuncRef::Prim(Primitive::Sub)));
        let args: Vec<_> = apply.args.iter().map(|a| &a.value).collect();
        assert_eq!(
            args,
            [
                &Expr::Literal(Literal::Num(NumLit::Int(5))),
                &Expr::Literal(Literal::Num(NumLit::Int(1))),
            ]
        );
    }

    #[test]
    fn missing_arguments_come_from_the_stack() {
        let program = parse_str("+ 1").unwrap();
        assert_eq!(only_line(&program).sig, (1, 1));
        let program = parse_str("× 2 + 1 ⇡").unwrap();
        assert_eq!(only_line(&program).sig, (1, 1));
    }

    #[test]
    fn bindings_are_functions() {
        let program = parse_str("Double ← ×2\nDouble 5").unwrap();
        let binding = program.global("Double").unwrap();
        assert_eq!(binding.sig, (1, 1));
        assert!(!binding.declared);
        assert_eq!(only_line(&program).sig, (0, 1));
    }

    #[test]
    fn names_must_be_defined_before_use() {
        assert_eq!(
            error("F 1\nF ← +1"),
            ParseError::UnknownIdentifier("F".into())
        );
    }

    #[test]
    fn recursion_needs_a_signature() {
        assert_eq!(
            error("F ← F"),
            ParseError::RecursionWithoutSignature("F".into())
        );
        let program = parse_str("F ← |1.1 ⍥F 0").unwrap();
        assert_eq!(program.bindings[0].sig, (1, 1));
        assert!(program.bindings[0].declared);
    }

    #[test]
    fn rebinding_refers_to_the_shadowed_binding() {
        let program = parse_str("F ← +1\nF ← F\nF 2").unwrap();
        let body = &program.bindings[1].body.body;
        let outer = |expr: &Sp<Expr>| {
            matches!(expr.value, Expr::Ref(FuncRef::Binding { id: 0, .. }))
        };
        assert!(body.len() == 1 && outer(&body[0]), "{body:?}");
        assert_eq!(program.bindings[1].sig, (1, 1));
        let program = parse_str("F ← +1\n(F ← ×2 F\nF 3)").unwrap();
        assert_eq!(program.bindings[1].sig, (1, 1));
    }

    #[test]
    fn declared_signature_must_match() {
        assert_eq!(
            error("F ← |2.1 +1"),
            ParseError::SignatureMismatch {
                name: "F".into(),
                declared: Signature::new(2, 1),
                inferred: Signature::new(1, 1),
            }
        );
        let program = parse_str("F ← |1.0 ◌\nG ← |2 +").unwrap();
        assert_eq!(program.bindings[0].sig, (1, 0));
        assert_eq!(program.bindings[1].sig, (2, 1));
    }

    #[test]
    fn modifier_operands() {
        let program = parse_str("/+ [1 2 3]").unwrap();
        assert_eq!(only_line(&program).sig, (0, 1));
        assert_eq!(error("/"), ParseError::MissingOperand(Primitive::Reduce));
        assert!(matches!(
            error("/¬ [1 2]"),
            ParseError::InvalidOperand {
                modifier: Primitive::Reduce,
                ..
            }
        ));
        assert!(matches!(
            error("⍥+ 3 1 2"),
            ParseError::InvalidOperand {
                modifier: Primitive::Repeat,
                ..
            }
        ));
        assert!(matches!(
            error("∵. [1 2]"),
            ParseError::InvalidOperand {
                modifier: Primitive::Each,
                ..
            }
        ));
    }

    #[test]
    fn do_checks_body_and_condition() {
        let program = parse_str("⍢(×2)(<100.) 1").unwrap();
        assert_eq!(only_line(&program).sig, (0, 1));
        assert!(matches!(
            error("⍢(×2)(<100) 1"),
            ParseError::InvalidOperand {
                modifier: Primitive::Do,
                ..
            }
        ));
    }

    #[test]
    fn switch_branches() {
        let program = parse_str("⨬(+1|×10) 1 5").unwrap();
        assert_eq!(only_line(&program).sig, (0, 1));
        assert_eq!(
            error("⨬(+|∘) 0 1 2"),
            ParseError::IncompatibleBranches(Signature::new(2, 1), Signature::new(1, 1))
        );
        assert_eq!(
            error("(1|2)"),
            ParseError::Unexpected(Token::Simple(AsciiToken::Bar))
        );
    }

    #[test]
    fn fork_and_dip_signatures() {
        let program = parse_str("⊃+- 1 2").unwrap();
        assert_eq!(only_line(&program).sig, (0, 2));
        let program = parse_str("⊙+").unwrap();
        assert_eq!(only_line(&program).sig, (3, 2));
    }

    #[test]
    fn unbalanced_delimiters() {
        assert_eq!(
            error("(+ 1"),
            ParseError::Expected {
                expected: AsciiToken::CloseParen.into(),
                found: None,
            }
        );
        assert_eq!(
            error("1 ]"),
            ParseError::Unexpected(Token::Simple(AsciiToken::CloseBracket))
        );
    }

    #[test]
    fn local_bindings_are_scoped() {
        let program = parse_str("(X ← 2\n+X X)").unwrap();
        assert_eq!(program.bindings.len(), 1);
        assert!(program.bindings[0].local);
        assert_eq!(only_line(&program).sig, (0, 1));
        assert_eq!(
            error("(X ← 2\n+X X)\nX"),
            ParseError::UnknownIdentifier("X".into())
        );
    }

    #[test]
    fn system_functions_are_looked_up() {
        let program = parse_str("&p 1").unwrap();
        assert_eq!(only_line(&program).sig, (0, 0));
        assert_eq!(error("&nope 1"), ParseError::UnknownSys("nope".into()));
    }

    #[test]
    fn strands_and_arrays() {
        let program = parse_str("1_2_3").unwrap();
        let line = only_line(&program);
        assert_eq!(line.sig, (0, 1));
        let Expr::Array { body, boxed } = &line.exprs[0].value else {
            panic!("expected an array: {line:?}");
        };
        assert!(!boxed);
        assert_eq!(body.body.len(), 3);
        assert_eq!(
            body.body[0].value,
            Expr::Literal(Literal::Num(NumLit::Int(3)))
        );
        let program = parse_str("{1 \"ab\"}").unwrap();
        assert!(matches!(
            only_line(&program).exprs[0].value,
            Expr::Array { boxed: true, .. }
        ));
    }

    #[test]
    fn binding_comments() {
        let program = parse_str("# Adds one\nInc ← +1\n\n# Stray\n\nDec ← -1").unwrap();
        assert_eq!(program.bindings[0].comment.as_deref(), Some("Adds one"));
        assert_eq!(program.bindings[1].comment, None);
    }

    #[test]
    fn placeholders_outside_macros() {
        assert_eq!(error("+ ^0 1"), ParseError::PlaceholderOutsideMacro(0));
    }
}
