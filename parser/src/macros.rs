//! Token-level macro definitions and expansion
//!
//! A macro is defined on a single line:
//! ```text
//! # Call a function twice
//! # ^0 the function to call
//! Twice! ← ^0 ^0
//! ```
//! The number of `!`s in the name is the number of operands. An invocation
//! `Twice!(+1)` is replaced by the body with each `^n` replaced by the tokens
//! of operand `n`. Expansion happens before parsing.

use std::collections::HashMap;

use ecow::EcoString;

use crate::{
    ident_modifier_args, parse::ParseError, AsciiToken, CodeSpan, CompileError, Ident, Sp, Token,
};

/// The default limit on nested macro expansions
pub const DEFAULT_MAX_MACRO_DEPTH: usize = 64;

/// A formal operand of a macro
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroParam {
    /// The placeholder index
    pub index: usize,
    /// The documentation comment for this operand
    pub doc: Option<EcoString>,
}

/// A macro definition
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    /// The name, including its `!`s
    pub name: Sp<Ident>,
    /// The formal operands, one per placeholder index
    pub params: Vec<MacroParam>,
    /// The documentation comment for the whole macro
    pub doc: Option<EcoString>,
    /// The body token template
    pub body: Vec<Sp<Token>>,
}

impl MacroDef {
    /// The number of operands the macro takes
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// The macros defined in a compilation unit
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    defs: HashMap<Ident, MacroDef>,
}

impl MacroTable {
    /// Get a macro by name
    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.defs.get(name)
    }
    /// Add a macro, replacing any with the same name
    pub fn insert(&mut self, def: MacroDef) {
        self.defs.insert(def.name.value.clone(), def);
    }
    /// Iterate over all macros
    pub fn iter(&self) -> impl Iterator<Item = &MacroDef> {
        self.defs.values()
    }
    /// The number of macros
    pub fn len(&self) -> usize {
        self.defs.len()
    }
    /// Whether there are no macros
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
    /// Remove macro definitions from a token stream and collect them
    ///
    /// Definitions must start a line outside of any brackets.
    /// Comment lines directly above a definition document it.
    pub fn collect(tokens: Vec<Sp<Token>>) -> Result<(Self, Vec<Sp<Token>>), CompileError> {
        let mut table = MacroTable::default();
        let mut rest = Vec::with_capacity(tokens.len());
        let mut comments: Vec<EcoString> = Vec::new();
        let mut line_start = true;
        let mut depth = 0usize;
        let mut tokens = tokens.into_iter().peekable();
        while let Some(token) = tokens.next() {
            let def_name = (line_start
                && depth == 0
                && tokens.peek().is_some_and(|t| t.value == Token::LeftArrow))
            .then(|| token.value.as_macro_name().cloned())
            .flatten();
            if let Some(name) = def_name {
                tokens.next();
                let mut body = Vec::new();
                while let Some(tok) = tokens.next_if(|t| t.value != Token::Newline) {
                    body.push(tok);
                }
                let def = make_def(token.span.sp(name), body, &comments)?;
                tracing::trace!(name = %def.name.value, arity = def.arity(), "defined macro");
                table.insert(def);
                comments.clear();
                // Drop the definition's newline too
                tokens.next_if(|t| t.value == Token::Newline);
                line_start = true;
                continue;
            }
            match &token.value {
                Token::Newline => line_start = true,
                Token::Comment(text) if line_start => comments.push(text.clone()),
                tok => {
                    if line_start {
                        comments.clear();
                    }
                    line_start = false;
                    match tok {
                        Token::Simple(
                            AsciiToken::OpenParen | AsciiToken::OpenBracket | AsciiToken::OpenCurly,
                        ) => depth += 1,
                        Token::Simple(
                            AsciiToken::CloseParen
                            | AsciiToken::CloseBracket
                            | AsciiToken::CloseCurly,
                        ) => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                }
            }
            rest.push(token);
        }
        tracing::debug!(macros = table.len(), "collected macro definitions");
        Ok((table, rest))
    }
}

fn make_def(
    name: Sp<Ident>,
    body: Vec<Sp<Token>>,
    comments: &[EcoString],
) -> Result<MacroDef, CompileError> {
    let arity = ident_modifier_args(&name.value);
    let used = body
        .iter()
        .filter_map(|tok| match tok.value {
            Token::Placeholder(n) => Some(n + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    if used > arity {
        return Err(CompileError::MacroArity {
            name: name.value,
            expected: arity,
            actual: used,
            span: name.span,
        });
    }
    let mut params: Vec<MacroParam> = (0..arity)
        .map(|index| MacroParam { index, doc: None })
        .collect();
    let mut doc = String::new();
    for comment in comments {
        let param_doc = comment.strip_prefix('^').and_then(|rest| {
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            let index: usize = rest[..digits].parse().ok()?;
            Some((index, rest[digits..].trim()))
        });
        match param_doc {
            Some((index, text)) if index < arity => params[index].doc = Some(text.into()),
            _ => {
                if !doc.is_empty() {
                    doc.push('\n');
                }
                doc.push_str(comment);
            }
        }
    }
    Ok(MacroDef {
        name,
        params,
        doc: (!doc.is_empty()).then(|| doc.into()),
        body,
    })
}

/// Rewrites macro invocations into their expansions
pub struct MacroExpander<'a> {
    table: &'a MacroTable,
    max_depth: usize,
}

impl<'a> MacroExpander<'a> {
    /// Create a new expander over a table of macros
    pub fn new(table: &'a MacroTable) -> Self {
        MacroExpander {
            table,
            max_depth: DEFAULT_MAX_MACRO_DEPTH,
        }
    }
    /// Set the limit on nested expansions
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
    /// Expand every macro invocation in a token stream
    ///
    /// A stream without invocations is returned unchanged.
    pub fn expand(&self, tokens: &[Sp<Token>]) -> Result<Vec<Sp<Token>>, CompileError> {
        let mut out = Vec::with_capacity(tokens.len());
        self.expand_into(tokens, 0, &mut out)?;
        Ok(out)
    }
    fn expand_into(
        &self,
        tokens: &[Sp<Token>],
        depth: usize,
        out: &mut Vec<Sp<Token>>,
    ) -> Result<(), CompileError> {
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;
            let Token::MacroName(name) = &token.value else {
                out.push(token.clone());
                continue;
            };
            let Some(def) = self.table.get(name) else {
                return Err(token.span.clone().sp(ParseError::UnknownMacro(name.clone())).into());
            };
            if depth >= self.max_depth {
                return Err(CompileError::MacroRecursion {
                    name: name.clone(),
                    limit: self.max_depth,
                    span: token.span.clone(),
                });
            }
            let mut operands = Vec::with_capacity(def.arity());
            while operands.len() < def.arity() {
                let Some(len) = self.operand_len(&tokens[i..]) else {
                    break;
                };
                operands.push(&tokens[i..i + len]);
                i += len;
            }
            if operands.len() < def.arity() {
                return Err(CompileError::MacroArity {
                    name: name.clone(),
                    expected: def.arity(),
                    actual: operands.len(),
                    span: invocation_span(token, &tokens[..i]),
                });
            }
            tracing::trace!(name = %name, depth, "expanding macro");
            let mut substituted = Vec::with_capacity(def.body.len());
            for tok in &def.body {
                match tok.value {
                    Token::Placeholder(n) if n < operands.len() => {
                        substituted.extend(operands[n].iter().cloned())
                    }
                    _ => substituted.push(tok.clone()),
                }
            }
            self.expand_into(&substituted, depth + 1, out)?;
        }
        Ok(())
    }
    /// Get the number of tokens in the balanced operand at the start of a stream
    fn operand_len(&self, tokens: &[Sp<Token>]) -> Option<usize> {
        use AsciiToken::*;
        let mut len = match &tokens.first()?.value {
            Token::Simple(OpenParen | OpenBracket | OpenCurly) => {
                let mut depth = 0usize;
                let mut end = None;
                for (j, tok) in tokens.iter().enumerate() {
                    match tok.value {
                        Token::Simple(OpenParen | OpenBracket | OpenCurly) => depth += 1,
                        Token::Simple(CloseParen | CloseBracket | CloseCurly) => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(j + 1);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                end?
            }
            Token::Glyph(prim) => {
                let mut len = 1;
                for _ in 0..prim.modifier_args().unwrap_or(0) {
                    len += self.operand_len(&tokens[len..])?;
                }
                len
            }
            Token::MacroName(name) => {
                let arity = self.table.get(name).map_or(0, MacroDef::arity);
                let mut len = 1;
                for _ in 0..arity {
                    len += self.operand_len(&tokens[len..])?;
                }
                len
            }
            Token::Simple(Star | Percent | BangEqual | LessEqual | GreaterEqual)
            | Token::Ident(_)
            | Token::Sys(_)
            | Token::Placeholder(_)
            | Token::Number(_)
            | Token::Char(_)
            | Token::Str(_) => 1,
            Token::Simple(CloseParen | CloseBracket | CloseCurly | Underscore | Bar)
            | Token::Comment(_)
            | Token::LeftArrow
            | Token::Newline => return None,
        };
        // Strands count as a single operand
        while tokens.get(len).is_some_and(|t| t.value == Token::Simple(Underscore)) {
            len += 1 + self.operand_len(&tokens[len + 1..])?;
        }
        Some(len)
    }
}

fn invocation_span(name: &Sp<Token>, consumed: &[Sp<Token>]) -> CodeSpan {
    match consumed.last() {
        Some(last) => name.span.clone().merge(last.span.clone()),
        None => name.span.clone(),
    }
}

/// Collect the macros in a token stream and expand their invocations
pub fn expand_macros(
    tokens: Vec<Sp<Token>>,
    max_depth: usize,
) -> Result<(Vec<Sp<Token>>, MacroTable), CompileError> {
    let (table, tokens) = MacroTable::collect(tokens)?;
    if table.is_empty() && !tokens.iter().any(|t| t.value.as_macro_name().is_some()) {
        return Ok((tokens, table));
    }
    let expanded = MacroExpander::new(&table).max_depth(max_depth).expand(&tokens)?;
    tracing::debug!(before = tokens.len(), after = expanded.len(), "expanded macros");
    Ok((expanded, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex, InputSrc, NumLit, Primitive};

    fn tokens(input: &str) -> Vec<Sp<Token>> {
        lex(input, InputSrc::Str(0)).unwrap()
    }

    fn expand(input: &str) -> Result<Vec<Token>, CompileError> {
        let (expanded, _) = expand_macros(tokens(input), DEFAULT_MAX_MACRO_DEPTH)?;
        Ok(expanded.into_iter().map(|t| t.value).collect())
    }

    #[test]
    fn substitutes_operands() {
        let expanded = expand("Twice! ← ^0 ^0\nTwice!(+1) 5").unwrap();
        use AsciiToken::*;
        use Token::*;
        let group = [
            Simple(OpenParen),
            Glyph(Primitive::Add),
            Number(NumLit::Int(1)),
            Simple(CloseParen),
        ];
        let mut expected = Vec::new();
        expected.extend(group.iter().cloned());
        expected.extend(group.iter().cloned());
        expected.push(Number(NumLit::Int(5)));
        assert_eq!(expanded, expected);
    }

    #[test]
    fn modifier_operand_takes_its_own_operands() {
        let expanded = expand("Both!! ← ^1 ^0\nBoth!!/+ ⇌ [1 2]").unwrap();
        assert_eq!(
            expanded,
            vec![
                Token::Glyph(Primitive::Reverse),
                Token::Glyph(Primitive::Reduce),
                Token::Glyph(Primitive::Add),
                Token::Simple(AsciiToken::OpenBracket),
                Token::Number(NumLit::Int(1)),
                Token::Number(NumLit::Int(2)),
                Token::Simple(AsciiToken::CloseBracket),
            ]
        );
    }

    #[test]
    fn nested_macros_expand() {
        let expanded = expand("Inc! ← +1 ^0\nTwo! ← Inc!Inc!^0\nTwo!5").unwrap();
        let ints: Vec<_> = expanded
            .iter()
            .filter(|t| matches!(t, Token::Number(_)))
            .collect();
        assert_eq!(ints.len(), 3);
        assert_eq!(expanded.len(), 5);
    }

    #[test]
    fn expansion_is_idempotent() {
        let (table, rest) = MacroTable::collect(tokens("F! ← ^0 ^0\nF!1 + 2 [3 4]")).unwrap();
        let expander = MacroExpander::new(&table);
        let once = expander.expand(&rest).unwrap();
        let twice = expander.expand(&once).unwrap();
        assert_eq!(once, twice);
        let plain = tokens("+ 1 ⇡5");
        assert_eq!(expander.expand(&plain).unwrap(), plain);
    }

    #[test]
    fn recursion_is_bounded() {
        let err = expand("Loop! ← Loop!^0\nLoop!1").unwrap_err();
        assert!(
            matches!(err, CompileError::MacroRecursion { ref name, limit: DEFAULT_MAX_MACRO_DEPTH, .. } if name == "Loop!"),
            "{err:?}"
        );
        let (table, rest) = MacroTable::collect(tokens("Loop! ← Loop!^0\nLoop!1")).unwrap();
        let err = MacroExpander::new(&table).max_depth(3).expand(&rest).unwrap_err();
        assert!(matches!(err, CompileError::MacroRecursion { limit: 3, .. }));
    }

    #[test]
    fn missing_operands_is_arity_error() {
        let err = expand("Both!! ← ^0 ^1\nBoth!!(+1)").unwrap_err();
        match err {
            CompileError::MacroArity {
                name,
                expected,
                actual,
                ..
            } => {
                assert_eq!(name, "Both!!");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            err => panic!("unexpected error {err:?}"),
        }
        // Operands do not cross the end of a group
        assert!(matches!(
            expand("F! ← ^0\n(F!) 1"),
            Err(CompileError::MacroArity { actual: 0, .. })
        ));
    }

    #[test]
    fn placeholder_past_arity_is_arity_error() {
        assert!(matches!(
            expand("F! ← ^0 ^1"),
            Err(CompileError::MacroArity {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn unknown_macro_is_parse_error() {
        assert!(matches!(
            expand("Nope!1"),
            Err(CompileError::Parse(Sp {
                value: ParseError::UnknownMacro(_),
                ..
            }))
        ));
    }

    #[test]
    fn docs_are_kept_as_metadata() {
        let source = "# Apply a function twice\n# ^0 the function\nTwice! ← ^0 ^0\n1";
        let (table, rest) = MacroTable::collect(tokens(source)).unwrap();
        let def = table.get("Twice!").unwrap();
        assert_eq!(def.arity(), 1);
        assert_eq!(def.doc.as_deref(), Some("Apply a function twice"));
        assert_eq!(def.params[0].doc.as_deref(), Some("the function"));
        assert_eq!(rest.last().unwrap().value, Token::Number(NumLit::Int(1)));
    }

    #[test]
    fn strands_are_single_operands() {
        let expanded = expand("Sum! ← /+ ^0\nSum!1_2_3").unwrap();
        assert_eq!(expanded.len(), 7);
    }
}
