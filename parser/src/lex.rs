//! The Strata lexer

use std::{
    fmt,
    hash::Hash,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use ecow::EcoString;
use serde::*;
use serde_tuple::*;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use crate::{Ident, Inputs, Primitive};

/// Lex a whole Strata source string
///
/// Lexing stops at the first error.
pub fn lex(input: &str, src: InputSrc) -> Result<Vec<Sp<Token>>, Sp<LexError>> {
    let tokens = Lexer::new(input, src).collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(tokens = tokens.len(), "lexed input");
    Ok(tokens)
}

/// An error that occurred while lexing
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Unexpected char {0:?}")]
    UnexpectedChar(String),
    #[error("Expected a character after @")]
    ExpectedCharacter,
    #[error("Character literal {0:?} is more than one code point")]
    CompoundCharacter(String),
    #[error("Invalid escape character {0:?}")]
    InvalidEscape(String),
    #[error("Invalid unicode escape \\u{{{0}}}")]
    InvalidUnicodeEscape(String),
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Integer literal {0} does not fit in 64 bits")]
    IntegerOutOfRange(String),
    #[error("Expected a placeholder index after ^")]
    ExpectedPlaceholderIndex,
    #[error("Expected a system function name after &")]
    ExpectedSysName,
}

/// A location in a Strata source file
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_tuple, Deserialize_tuple,
)]
pub struct Loc {
    pub line: u32,
    pub col: u32,
    pub byte_pos: u32,
    pub char_pos: u32,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Default for Loc {
    fn default() -> Self {
        Self {
            char_pos: 0,
            byte_pos: 0,
            line: 1,
            col: 1,
        }
    }
}

impl Loc {
    /// Find the location of a byte offset in some input
    ///
    /// Returns `None` if the offset is not on a character boundary
    pub fn at_byte(input: &str, byte_pos: usize) -> Option<Self> {
        let before = input.get(..byte_pos)?;
        let mut loc = Loc::default();
        for c in before.graphemes(true) {
            loc.advance(c);
        }
        Some(loc)
    }
    fn advance(&mut self, c: &str) {
        for c in c.chars() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.col = 1;
                }
                '\r' => {}
                _ => self.col += 1,
            }
        }
        self.char_pos += 1;
        self.byte_pos += c.len() as u32;
    }
}

/// A runtime span in a Strata source file
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Span {
    /// A span that has a place in actual code
    Code(CodeSpan),
    /// A span whose origin is the interpreter
    Builtin,
}

impl From<CodeSpan> for Span {
    fn from(span: CodeSpan) -> Self {
        Self::Code(span)
    }
}

impl Span {
    /// Use this span to wrap a value
    pub fn sp<T>(self, value: T) -> Sp<T, Self> {
        Sp { value, span: self }
    }
    /// Merge two spans
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Span::Code(a), Span::Code(b)) => Span::Code(a.merge(b)),
            (Span::Code(a), Span::Builtin) => Span::Code(a),
            (Span::Builtin, Span::Code(b)) => Span::Code(b),
            (Span::Builtin, Span::Builtin) => Span::Builtin,
        }
    }
    /// Get the code span, if any
    pub fn code(self) -> Option<CodeSpan> {
        match self {
            Span::Code(span) => Some(span),
            Span::Builtin => None,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Code(span) => span.fmt(f),
            Span::Builtin => write!(f, "<builtin>"),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Code(span) => span.fmt(f),
            Span::Builtin => write!(f, "<builtin>"),
        }
    }
}

/// The source of code input into the compiler
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "InputSrcRep", from = "InputSrcRep")]
pub enum InputSrc {
    /// Code from a file with a path
    File(Arc<Path>),
    /// Code from a string
    Str(usize),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum InputSrcRep {
    File(PathBuf),
    Str(usize),
}

impl From<InputSrc> for InputSrcRep {
    fn from(src: InputSrc) -> Self {
        match src {
            InputSrc::File(path) => InputSrcRep::File(path.to_path_buf()),
            InputSrc::Str(index) => InputSrcRep::Str(index),
        }
    }
}

impl From<InputSrcRep> for InputSrc {
    fn from(src: InputSrcRep) -> Self {
        match src {
            InputSrcRep::File(path) => InputSrc::File(path.into()),
            InputSrcRep::Str(index) => InputSrc::Str(index),
        }
    }
}

impl<'a> From<&'a Path> for InputSrc {
    fn from(path: &'a Path) -> Self {
        InputSrc::File(path.into())
    }
}

/// A span in a Strata source file
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_tuple, Deserialize_tuple)]
pub struct CodeSpan {
    /// The source of the code
    pub src: InputSrc,
    /// The starting location
    pub start: Loc,
    /// The ending location
    pub end: Loc,
}

impl fmt::Debug for CodeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

impl fmt::Display for CodeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.src {
            InputSrc::File(path) => write!(f, "{}:{}", path.display(), self.start),
            InputSrc::Str(_) => self.start.fmt(f),
        }
    }
}

impl CodeSpan {
    /// Span a value
    pub const fn sp<T>(self, value: T) -> Sp<T> {
        Sp { value, span: self }
    }
    #[doc(hidden)]
    pub fn dummy() -> Self {
        Self {
            src: InputSrc::Str(0),
            start: Loc::default(),
            end: Loc::default(),
        }
    }
    /// Merge two spans
    pub fn merge(mut self, end: Self) -> Self {
        self.merge_with(end);
        self
    }
    /// Merge two spans
    pub fn merge_with(&mut self, end: Self) {
        self.start = self.start.min(end.start);
        self.end = self.end.max(end.end);
    }
    /// Get the byte range of the span
    pub fn byte_range(&self) -> Range<usize> {
        self.start.byte_pos as usize..self.end.byte_pos as usize
    }
    /// Get the text of the span from the inputs
    pub fn as_str<T>(&self, inputs: &Inputs, f: impl FnOnce(&str) -> T) -> Option<T> {
        inputs.try_get_with(&self.src, |input| input.get(self.byte_range()).map(f))?
    }
}

/// A span wrapping a value
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(
    from = "SpRep<T, S>",
    into = "SpRep<T, S>",
    bound(
        serialize = "T: Clone + Serialize, S: Clone + Serialize",
        deserialize = "T: Deserialize<'de>, S: Deserialize<'de>"
    )
)]
pub struct Sp<T, S = CodeSpan> {
    /// The value
    pub value: T,
    /// The span
    pub span: S,
}

impl<T> Sp<T> {
    /// Map the value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Sp<U> {
        Sp {
            value: f(self.value),
            span: self.span,
        }
    }
    /// Get a spanned reference to the value
    pub fn as_ref(&self) -> Sp<&T> {
        Sp {
            value: &self.value,
            span: self.span.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SpRep<T, S>(T, S);

impl<T, S> From<Sp<T, S>> for SpRep<T, S> {
    fn from(sp: Sp<T, S>) -> Self {
        SpRep(sp.value, sp.span)
    }
}

impl<T, S> From<SpRep<T, S>> for Sp<T, S> {
    fn from(SpRep(value, span): SpRep<T, S>) -> Self {
        Sp { value, span }
    }
}

impl<T: fmt::Debug, S: fmt::Debug> fmt::Debug for Sp<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: ", self.span)?;
        self.value.fmt(f)
    }
}

impl<T: fmt::Display, S: fmt::Display> fmt::Display for Sp<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.value)
    }
}

impl<T> From<Sp<T>> for Sp<T, Span> {
    fn from(value: Sp<T>) -> Self {
        Self {
            value: value.value,
            span: Span::Code(value.span),
        }
    }
}

/// A numeric literal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumLit {
    /// A literal with no fractional part
    Int(i64),
    /// A literal with a fractional part
    Real(f64),
}

impl fmt::Display for NumLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumLit::Int(i) if *i < 0 => write!(f, "¯{}", i.unsigned_abs()),
            NumLit::Int(i) => write!(f, "{i}"),
            NumLit::Real(r) if *r < 0.0 => write!(f, "¯{}", -r),
            NumLit::Real(r) => write!(f, "{r}"),
        }
    }
}

/// A Strata lexical token
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Comment(EcoString),
    Ident(Ident),
    /// An identifier ending in `!`, naming a macro
    MacroName(Ident),
    /// A macro argument placeholder, `^n`
    Placeholder(usize),
    /// A system function name, `&name`
    Sys(Ident),
    Number(NumLit),
    Char(char),
    Str(EcoString),
    Simple(AsciiToken),
    Glyph(Primitive),
    LeftArrow,
    Newline,
}

impl Token {
    pub(crate) fn as_macro_name(&self) -> Option<&Ident> {
        match self {
            Token::MacroName(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Comment(_) => write!(f, "comment"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::MacroName(name) => write!(f, "{name}"),
            Token::Placeholder(i) => write!(f, "^{i}"),
            Token::Sys(name) => write!(f, "&{name}"),
            Token::Number(n) => n.fmt(f),
            Token::Char(c) => write!(f, "@{}", c.escape_debug()),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Simple(t) => t.fmt(f),
            Token::Glyph(p) => p.fmt(f),
            Token::LeftArrow => write!(f, "←"),
            Token::Newline => write!(f, "newline"),
        }
    }
}

/// An ASCII lexical token
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsciiToken {
    OpenParen,
    CloseParen,
    OpenCurly,
    CloseCurly,
    OpenBracket,
    CloseBracket,
    Underscore,
    Bar,
    Star,
    Percent,
    BangEqual,
    LessEqual,
    GreaterEqual,
}

impl fmt::Display for AsciiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsciiToken::OpenParen => write!(f, "("),
            AsciiToken::CloseParen => write!(f, ")"),
            AsciiToken::OpenCurly => write!(f, "{{"),
            AsciiToken::CloseCurly => write!(f, "}}"),
            AsciiToken::OpenBracket => write!(f, "["),
            AsciiToken::CloseBracket => write!(f, "]"),
            AsciiToken::Underscore => write!(f, "_"),
            AsciiToken::Bar => write!(f, "|"),
            AsciiToken::Star => write!(f, "*"),
            AsciiToken::Percent => write!(f, "%"),
            AsciiToken::BangEqual => write!(f, "!="),
            AsciiToken::LessEqual => write!(f, "<="),
            AsciiToken::GreaterEqual => write!(f, ">="),
        }
    }
}

impl From<AsciiToken> for Token {
    fn from(s: AsciiToken) -> Self {
        Self::Simple(s)
    }
}

impl From<Primitive> for Token {
    fn from(p: Primitive) -> Self {
        Self::Glyph(p)
    }
}

/// Get the number of function arguments a macro name implies
///
/// Each trailing `!` counts for one and `‼` counts for two.
pub fn ident_modifier_args(name: &str) -> usize {
    name.chars()
        .rev()
        .map_while(|c| match c {
            '!' => Some(1),
            '‼' => Some(2),
            _ => None,
        })
        .sum()
}

/// A lazy, restartable lexer
///
/// Lexing can resume from any location previously reported by [`Lexer::loc`].
/// After yielding an error, the lexer yields nothing more.
pub struct Lexer<'a> {
    input: &'a str,
    loc: Loc,
    src: InputSrc,
    failed: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer at the start of some input
    pub fn new(input: &'a str, src: InputSrc) -> Self {
        Self::at(input, src, Loc::default())
    }
    /// Create a lexer that resumes at a location
    pub fn at(input: &'a str, src: InputSrc, loc: Loc) -> Self {
        Lexer {
            input,
            loc,
            src,
            failed: false,
        }
    }
    /// Create a lexer that resumes at a byte offset
    ///
    /// Returns `None` if the offset is not on a character boundary
    pub fn from_byte_offset(input: &'a str, src: InputSrc, byte_pos: usize) -> Option<Self> {
        Loc::at_byte(input, byte_pos).map(|loc| Self::at(input, src, loc))
    }
    /// The location of the next token
    pub fn loc(&self) -> Loc {
        self.loc
    }
    fn rest(&self) -> &'a str {
        self.input.get(self.loc.byte_pos as usize..).unwrap_or("")
    }
    fn peek_char(&self) -> Option<&'a str> {
        self.rest().graphemes(true).next()
    }
    fn peek_second(&self) -> Option<&'a str> {
        self.rest().graphemes(true).nth(1)
    }
    fn next_char_if(&mut self, f: impl Fn(&str) -> bool) -> Option<&'a str> {
        let c = self.peek_char()?;
        if !f(c) {
            return None;
        }
        self.loc.advance(c);
        Some(c)
    }
    fn next_char_exact(&mut self, c: &str) -> bool {
        self.next_char_if(|c2| c2 == c).is_some()
    }
    fn next_char(&mut self) -> Option<&'a str> {
        self.next_char_if(|_| true)
    }
    fn end_span(&self, start: Loc) -> CodeSpan {
        CodeSpan {
            start,
            end: self.loc,
            src: self.src.clone(),
        }
    }
    fn end(&self, token: impl Into<Token>, start: Loc) -> Result<Sp<Token>, Sp<LexError>> {
        Ok(self.end_span(start).sp(token.into()))
    }
    fn error(&self, error: LexError, start: Loc) -> Result<Sp<Token>, Sp<LexError>> {
        Err(self.end_span(start).sp(error))
    }
    fn token(&mut self) -> Option<Result<Sp<Token>, Sp<LexError>>> {
        use {self::AsciiToken::*, Token::*};
        loop {
            let start = self.loc;
            let c = self.next_char()?;
            return Some(match c {
                " " | "\t" | "\r" => continue,
                "\n" | "\r\n" => self.end(Newline, start),
                "(" => self.end(OpenParen, start),
                ")" => self.end(CloseParen, start),
                "{" => self.end(OpenCurly, start),
                "}" => self.end(CloseCurly, start),
                "[" => self.end(OpenBracket, start),
                "]" => self.end(CloseBracket, start),
                "_" => self.end(Underscore, start),
                "|" => self.end(Bar, start),
                "*" => self.end(Star, start),
                "%" => self.end(Percent, start),
                "←" => self.end(LeftArrow, start),
                "<" if self.next_char_exact("=") => self.end(LessEqual, start),
                ">" if self.next_char_exact("=") => self.end(GreaterEqual, start),
                "!" if self.next_char_exact("=") => self.end(BangEqual, start),
                "#" => {
                    let mut text = String::new();
                    while let Some(c) = self.next_char_if(|c| c != "\n" && c != "\r\n") {
                        text.push_str(c);
                    }
                    let text = text.strip_prefix(' ').unwrap_or(&text).trim_end();
                    self.end(Comment(text.into()), start)
                }
                "^" => {
                    let mut digits = String::new();
                    while let Some(c) = self.next_char_if(is_ascii_digit) {
                        digits.push_str(c);
                    }
                    match digits.parse() {
                        Ok(n) => self.end(Placeholder(n), start),
                        Err(_) => self.error(LexError::ExpectedPlaceholderIndex, start),
                    }
                }
                "&" => {
                    let mut name = String::new();
                    while let Some(c) = self.next_char_if(is_ascii_alphanumeric) {
                        name.push_str(c);
                    }
                    if name.is_empty() {
                        self.error(LexError::ExpectedSysName, start)
                    } else {
                        self.end(Sys(name.into()), start)
                    }
                }
                "@" => match self.next_char() {
                    None => self.error(LexError::ExpectedCharacter, start),
                    Some("\\") => match self.escape(start) {
                        Ok(c) => self.end(Char(c), start),
                        Err(e) => Err(e),
                    },
                    Some(s) => {
                        let mut chars = s.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => self.end(Char(c), start),
                            _ => self.error(LexError::CompoundCharacter(s.into()), start),
                        }
                    }
                },
                "\"" => self.string(start),
                "¯" if self.peek_char().is_some_and(is_ascii_digit) => self.number(start),
                c if is_ascii_digit(c) => self.number(start),
                c if c.chars().all(|c| c.is_ascii_alphabetic()) => self.ident(start),
                c => {
                    let mut chars = c.chars();
                    match (chars.next(), chars.next()) {
                        (Some(g), None) => match Primitive::from_glyph(g) {
                            Some(prim) => self.end(Glyph(prim), start),
                            None => self.error(LexError::UnexpectedChar(c.into()), start),
                        },
                        _ => self.error(LexError::UnexpectedChar(c.into()), start),
                    }
                }
            });
        }
    }
    fn ident(&mut self, start: Loc) -> Result<Sp<Token>, Sp<LexError>> {
        while self.next_char_if(is_ascii_alphanumeric).is_some() {}
        let mut is_macro = false;
        loop {
            if self.peek_char() == Some("!") && self.peek_second() != Some("=") {
                self.next_char();
            } else if !self.next_char_exact("‼") {
                break;
            }
            is_macro = true;
        }
        let name: Ident = self.input[self.end_span(start).byte_range()].into();
        if is_macro {
            self.end(Token::MacroName(name), start)
        } else {
            self.end(Token::Ident(name), start)
        }
    }
    fn number(&mut self, start: Loc) -> Result<Sp<Token>, Sp<LexError>> {
        while self.next_char_if(is_ascii_digit).is_some() {}
        let mut real = false;
        if self.peek_char() == Some(".") && self.peek_second().is_some_and(is_ascii_digit) {
            self.next_char();
            while self.next_char_if(is_ascii_digit).is_some() {}
            real = true;
        }
        let text = self.input[self.end_span(start).byte_range()].replace('¯', "-");
        if real {
            match text.parse::<f64>() {
                Ok(n) => self.end(Token::Number(NumLit::Real(n)), start),
                Err(_) => self.error(LexError::UnexpectedChar(text), start),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => self.end(Token::Number(NumLit::Int(n)), start),
                Err(_) => self.error(LexError::IntegerOutOfRange(text), start),
            }
        }
    }
    fn string(&mut self, start: Loc) -> Result<Sp<Token>, Sp<LexError>> {
        let mut string = String::new();
        loop {
            match self.peek_char() {
                None | Some("\n" | "\r\n") => {
                    return self.error(LexError::UnterminatedString, start);
                }
                Some("\"") => {
                    self.next_char();
                    break;
                }
                Some("\\") => {
                    self.next_char();
                    string.push(self.escape(start)?);
                }
                Some(c) => {
                    self.next_char();
                    string.push_str(c);
                }
            }
        }
        self.end(Token::Str(string.into()), start)
    }
    fn escape(&mut self, start: Loc) -> Result<char, Sp<LexError>> {
        let Some(c) = self.next_char() else {
            return Err(self.end_span(start).sp(LexError::UnterminatedString));
        };
        Ok(match c {
            "n" => '\n',
            "t" => '\t',
            "r" => '\r',
            "0" => '\0',
            "\\" => '\\',
            "\"" => '"',
            "'" => '\'',
            "u" => {
                if !self.next_char_exact("{") {
                    return Err(self.end_span(start).sp(LexError::InvalidEscape("u".into())));
                }
                let mut hex = String::new();
                while let Some(c) = self.next_char_if(|c| c != "}" && c != "\"" && c != "\n") {
                    hex.push_str(c);
                }
                if !self.next_char_exact("}") {
                    return Err(self.end_span(start).sp(LexError::InvalidUnicodeEscape(hex)));
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => c,
                    None => {
                        return Err(self.end_span(start).sp(LexError::InvalidUnicodeEscape(hex)))
                    }
                }
            }
            c => return Err(self.end_span(start).sp(LexError::InvalidEscape(c.into()))),
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Sp<Token>, Sp<LexError>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.token()?;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

fn is_ascii_digit(c: &str) -> bool {
    c.chars().all(|c| c.is_ascii_digit())
}

fn is_ascii_alphanumeric(c: &str) -> bool {
    c.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input, InputSrc::Str(0))
            .unwrap()
            .into_iter()
            .map(|tok| tok.value)
            .collect()
    }

    fn error(input: &str) -> LexError {
        lex(input, InputSrc::Str(0)).unwrap_err().value
    }

    #[test]
    fn glyphs_and_literals() {
        use Token::*;
        assert_eq!(
            kinds("+1 ¯2.5 × \"hi\" @a"),
            vec![
                Glyph(Primitive::Add),
                Number(NumLit::Int(1)),
                Number(NumLit::Real(-2.5)),
                Glyph(Primitive::Mul),
                Str("hi".into()),
                Char('a'),
            ]
        );
    }

    #[test]
    fn negate_glyph_without_digit() {
        assert_eq!(
            kinds("¯ 3"),
            vec![Token::Glyph(Primitive::Neg), Token::Number(NumLit::Int(3))]
        );
    }

    #[test]
    fn dot_after_number_is_duplicate() {
        assert_eq!(
            kinds("5."),
            vec![Token::Number(NumLit::Int(5)), Token::Glyph(Primitive::Dup)]
        );
    }

    #[test]
    fn ascii_aliases() {
        assert_eq!(
            kinds("* % != <= >="),
            vec![
                Token::Simple(AsciiToken::Star),
                Token::Simple(AsciiToken::Percent),
                Token::Simple(AsciiToken::BangEqual),
                Token::Simple(AsciiToken::LessEqual),
                Token::Simple(AsciiToken::GreaterEqual),
            ]
        );
    }

    #[test]
    fn macro_markers() {
        assert_eq!(
            kinds("Twice! ← ^0 ^0"),
            vec![
                Token::MacroName("Twice!".into()),
                Token::LeftArrow,
                Token::Placeholder(0),
                Token::Placeholder(0),
            ]
        );
        assert_eq!(ident_modifier_args("Both‼"), 2);
        assert_eq!(ident_modifier_args("F!!!"), 3);
        assert_eq!(ident_modifier_args("F"), 0);
    }

    #[test]
    fn escapes() {
        assert_eq!(kinds(r#""a\nb\u{41}""#), vec![Token::Str("a\nbA".into())]);
        assert_eq!(kinds(r"@\t"), vec![Token::Char('\t')]);
        assert_eq!(error(r#""\q""#), LexError::InvalidEscape("q".into()));
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(error("\"abc"), LexError::UnterminatedString);
        assert_eq!(error("\"abc\n\""), LexError::UnterminatedString);
    }

    #[test]
    fn unexpected_char_has_span() {
        let err = lex("1 + $", InputSrc::Str(0)).unwrap_err();
        assert_eq!(err.value, LexError::UnexpectedChar("$".into()));
        assert_eq!(err.span.start.col, 5);
        assert_eq!(err.span.byte_range(), 4..5);
    }

    #[test]
    fn integer_out_of_range() {
        assert!(matches!(
            error("99999999999999999999"),
            LexError::IntegerOutOfRange(_)
        ));
    }

    #[test]
    fn restart_from_saved_location() {
        let input = "+ 1 2\n× 3 [4 5]";
        let mut lexer = Lexer::new(input, InputSrc::Str(0));
        for _ in 0..3 {
            lexer.next().unwrap().unwrap();
        }
        let saved = lexer.loc();
        let rest: Vec<_> = lexer.map(Result::unwrap).collect();
        let resumed: Vec<_> = Lexer::at(input, InputSrc::Str(0), saved)
            .map(Result::unwrap)
            .collect();
        assert_eq!(rest, resumed);

        let newline = input.find('\n').unwrap();
        let from_offset: Vec<_> = Lexer::from_byte_offset(input, InputSrc::Str(0), newline)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(from_offset, rest);
        assert!(Lexer::from_byte_offset("×", InputSrc::Str(0), 1).is_none());
    }

    #[test]
    fn lexer_stops_after_error() {
        let mut lexer = Lexer::new("1 $ 2", InputSrc::Str(0));
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn comments_and_sys() {
        assert_eq!(
            kinds("&p 1 # print it"),
            vec![
                Token::Sys("p".into()),
                Token::Number(NumLit::Int(1)),
                Token::Comment("print it".into()),
            ]
        );
    }
}
