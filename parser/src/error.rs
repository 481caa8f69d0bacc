use std::fmt;

use colored::{Color, Colorize};
use thiserror::Error;

use crate::{parse::ParseError, CodeSpan, Ident, Inputs, LexError, Sp, Span};

/// An error that prevents a unit from compiling
///
/// Compilation never produces a partial assembly, so the first error is the only one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The source text could not be lexed
    #[error("{}", .0.value)]
    Lex(Sp<LexError>),
    /// A macro expanded past the depth limit
    #[error("Macro {name} recurs too deeply (the limit is {limit})")]
    MacroRecursion {
        /// The macro being expanded when the limit was reached
        name: Ident,
        /// The configured depth limit
        limit: usize,
        /// The span of the invocation
        span: CodeSpan,
    },
    /// A macro was given the wrong number of operands
    #[error(
        "Macro {name} expects {expected} operand{}, but {actual} {} given",
        if *expected == 1 { "" } else { "s" },
        if *actual == 1 { "was" } else { "were" }
    )]
    MacroArity {
        /// The macro
        name: Ident,
        /// The number of operands the macro declares
        expected: usize,
        /// The number of operands that were found
        actual: usize,
        /// The span of the invocation or definition
        span: CodeSpan,
    },
    /// The token stream could not be parsed
    #[error("{}", .0.value)]
    Parse(Sp<ParseError>),
}

impl From<Sp<LexError>> for CompileError {
    fn from(e: Sp<LexError>) -> Self {
        CompileError::Lex(e)
    }
}

impl From<Sp<ParseError>> for CompileError {
    fn from(e: Sp<ParseError>) -> Self {
        CompileError::Parse(e)
    }
}

impl CompileError {
    /// Get the span of the offending code
    pub fn span(&self) -> &CodeSpan {
        match self {
            CompileError::Lex(e) => &e.span,
            CompileError::Parse(e) => &e.span,
            CompileError::MacroRecursion { span, .. } | CompileError::MacroArity { span, .. } => {
                span
            }
        }
    }
    /// Get a rich-text report for the error
    pub fn report(&self, inputs: &Inputs) -> Report {
        Report::new_multi(
            ReportKind::Error,
            inputs,
            [(self.to_string(), Span::Code(self.span().clone()))],
        )
    }
}

/// Kinds of reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// An error
    Error,
    /// Something that should probably be fixed
    Warning,
    /// Extra context for another report
    Note,
}

impl ReportKind {
    /// Get the string that prefixes the formatted report
    pub fn str(&self) -> &'static str {
        match self {
            ReportKind::Error => "Error",
            ReportKind::Warning => "Warning",
            ReportKind::Note => "Note",
        }
    }
}

/// A text fragment of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportFragment {
    /// Just plain text
    Plain(String),
    /// Text colored according to the report kind
    Colored {
        /// The text
        text: String,
        /// The kind that determines the color
        kind: ReportKind,
    },
    /// Faint text
    Faint(String),
    /// A newline
    Newline,
}

impl ReportFragment {
    /// Create a colored report fragment
    pub fn colored(text: impl Into<String>, kind: ReportKind) -> Self {
        Self::Colored {
            text: text.into(),
            kind,
        }
    }
}

/// A rich-text error report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The rich-text fragments of the report
    pub fragments: Vec<ReportFragment>,
    /// Whether to color the report with ANSI escape codes when converting it to a string
    ///
    /// Defaults to `true`
    pub color: bool,
}

impl Report {
    /// Change whether to color the report with ANSI escape codes
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
    /// Create a new report without a span
    pub fn new(kind: ReportKind, message: impl Into<String>) -> Self {
        Self {
            fragments: vec![
                ReportFragment::colored(kind.str(), kind),
                ReportFragment::Plain(": ".into()),
                ReportFragment::Plain(message.into()),
            ],
            color: true,
        }
    }
    /// Create a new report with multiple spanned messages
    pub fn new_multi<I, T>(kind: ReportKind, inputs: &Inputs, messages: I) -> Self
    where
        I: IntoIterator<Item = (T, Span)>,
        T: fmt::Display,
    {
        let mut fragments = Vec::new();
        for (i, (message, span)) in messages.into_iter().enumerate() {
            if i > 0 {
                fragments.push(ReportFragment::Newline);
            }
            fragments.push(ReportFragment::colored(kind.str(), kind));
            fragments.push(ReportFragment::Plain(": ".into()));
            fragments.push(ReportFragment::Plain(message.to_string()));
            let Span::Code(span) = span else {
                continue;
            };
            fragments.push(ReportFragment::Newline);
            fragments.push(ReportFragment::Faint(format!("  at {span}")));
            let Some(line) = inputs.line(&span.src, span.start.line) else {
                continue;
            };
            fragments.push(ReportFragment::Newline);
            let line_prefix = format!("{} | ", span.start.line);
            fragments.push(ReportFragment::Plain(line_prefix.clone()));
            let start = span.start.col.saturating_sub(1) as usize;
            let end = if span.start.line == span.end.line {
                span.end.col.saturating_sub(1) as usize
            } else {
                line.chars().count()
            };
            let width = end.saturating_sub(start).max(1);
            let pre: String = line.chars().take(start).collect();
            let marked: String = line.chars().skip(start).take(width).collect();
            let post: String = line.chars().skip(start + width).collect();
            fragments.push(ReportFragment::Faint(pre));
            fragments.push(ReportFragment::colored(marked, kind));
            fragments.push(ReportFragment::Faint(post));
            fragments.push(ReportFragment::Newline);
            fragments.push(ReportFragment::Plain(
                " ".repeat(line_prefix.chars().count() + start),
            ));
            fragments.push(ReportFragment::colored("─".repeat(width), kind));
        }
        Self {
            fragments,
            color: true,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frag in &self.fragments {
            match frag {
                ReportFragment::Plain(s) => write!(f, "{s}")?,
                ReportFragment::Faint(s) if self.color => write!(f, "{}", s.dimmed())?,
                ReportFragment::Faint(s) => write!(f, "{s}")?,
                ReportFragment::Colored { text, kind } if self.color => {
                    let color = match kind {
                        ReportKind::Error => Color::Red,
                        ReportKind::Warning => Color::Yellow,
                        ReportKind::Note => Color::BrightCyan,
                    };
                    write!(f, "{}", text.color(color))?
                }
                ReportFragment::Colored { text, .. } => write!(f, "{text}")?,
                ReportFragment::Newline => writeln!(f)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex;

    #[test]
    fn report_underlines_span() {
        let mut inputs = Inputs::default();
        let src = inputs.add_str("1 + $");
        let err = CompileError::from(lex("1 + $", src).unwrap_err());
        let report = err.report(&inputs).color(false).to_string();
        assert!(report.starts_with("Error: Unexpected char \"$\""), "{report}");
        assert!(report.contains("1 | 1 + $"), "{report}");
        assert!(report.ends_with("        ─"), "{report:?}");
    }

    #[test]
    fn report_without_source_still_renders() {
        let err = CompileError::MacroArity {
            name: "F!".into(),
            expected: 2,
            actual: 1,
            span: CodeSpan::dummy(),
        };
        assert_eq!(
            err.to_string(),
            "Macro F! expects 2 operands, but 1 was given"
        );
        let report = err.report(&Inputs::default()).color(false).to_string();
        assert!(report.contains("at 1:1"), "{report}");
    }
}
