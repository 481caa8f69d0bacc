use std::{error::Error, fmt, io, path::PathBuf};

use ecow::EcoString;
use thiserror::Error;

use crate::{CompileError, FunctionId, Inputs, Report, ReportFragment, ReportKind, Shape, Span};

/// The result of an operation that can fail at run time
///
/// The engine attaches a span and call trace to the error kind to make a
/// [`RuntimeError`].
pub type RuntimeResult<T = ()> = Result<T, RuntimeErrorKind>;

/// What went wrong during execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    /// Too many nested calls
    #[error("Call stack overflow: more than {limit} nested calls")]
    StackOverflow {
        /// The configured maximum call depth
        limit: usize,
    },
    /// A value was needed but the stack was empty
    #[error("Stack was empty when getting {0}")]
    EmptyStack(EcoString),
    /// Two arrays that cannot be combined
    #[error("Shapes {a} and {b} are not compatible")]
    ShapeMismatch {
        /// One shape
        a: Shape,
        /// The other shape
        b: Shape,
    },
    /// An index outside an array
    #[error("Index {} is out of bounds of length {len}", fmt_int(*.index))]
    IndexOutOfBounds {
        /// The index
        index: i64,
        /// The length of the indexed axis
        len: usize,
    },
    /// Overflow or division by zero
    #[error("Arithmetic error: {0}")]
    Arithmetic(EcoString),
    /// A reference to a function or system function that does not exist
    #[error("Unresolved reference to {0}")]
    UnresolvedReference(EcoString),
    /// A value of the wrong element type
    #[error("{0}")]
    Type(EcoString),
    /// A value outside the domain of an operation
    #[error("{0}")]
    Domain(EcoString),
    /// A system function handler failed
    #[error("&{name} failed: {message}")]
    System {
        /// The system function's name
        name: EcoString,
        /// The handler's message
        message: String,
    },
    /// The cancellation flag was raised
    #[error("Execution was cancelled")]
    Cancelled,
    /// The instruction budget ran out
    #[error("Execution exceeded the limit of {0} instructions")]
    InstructionLimit(usize),
}

fn fmt_int(i: i64) -> String {
    if i < 0 {
        format!("¯{}", i.unsigned_abs())
    } else {
        i.to_string()
    }
}

/// An error that stopped execution
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    /// What went wrong
    pub kind: RuntimeErrorKind,
    /// The span of the instruction that failed
    pub span: Span,
    /// The offset of the instruction that failed
    pub offset: usize,
    /// The calls that led to the failure, innermost first
    pub trace: Vec<TraceFrame>,
}

/// A function call in a [`RuntimeError`]'s trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    /// The called function
    pub id: FunctionId,
    /// Where it was called
    pub span: Span,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Span::Code(span) = &self.span {
            write!(f, "\n  at {span}")?;
        }
        format_trace(f, &self.trace)
    }
}

impl Error for RuntimeError {}

impl RuntimeError {
    /// Get a rich-text report for the error
    pub fn report(&self, inputs: &Inputs) -> Report {
        let mut report =
            Report::new_multi(ReportKind::Error, inputs, [(&self.kind, self.span.clone())]);
        let mut trace = String::new();
        if format_trace(&mut trace, &self.trace).is_ok() && !trace.is_empty() {
            report.fragments.push(ReportFragment::Newline);
            report
                .fragments
                .push(ReportFragment::Faint(trace.trim_start_matches('\n').into()));
        }
        report
    }
}

fn format_trace<F: fmt::Write>(f: &mut F, trace: &[TraceFrame]) -> fmt::Result {
    let mut last: Option<&TraceFrame> = None;
    let mut repetitions = 1;
    let max_id_length = (trace.iter())
        .map(|frame| frame.id.to_string().chars().count())
        .max()
        .unwrap_or(0);
    for frame in trace {
        if last == Some(frame) {
            repetitions += 1;
            continue;
        }
        if repetitions > 1 {
            write!(f, " (x {repetitions})")?;
            repetitions = 1;
        }
        writeln!(f)?;
        match &frame.span {
            Span::Code(span) => write!(
                f,
                "  in {:max_id_length$} at {span}",
                frame.id.to_string()
            )?,
            Span::Builtin => write!(f, "  in {}", frame.id)?,
        }
        last = Some(frame);
    }
    if repetitions > 1 {
        write!(f, " (x {repetitions})")?;
    }
    Ok(())
}

/// An error reading an assembly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The text does not start with an assembly header
    #[error("Missing assembly header")]
    MissingHeader,
    /// The assembly was written by a newer version of the format
    #[error("Assembly version {found} is not supported (the newest supported version is {supported})")]
    UnsupportedVersion {
        /// The version in the header
        found: u32,
        /// The newest version this build reads
        supported: u32,
    },
    /// A required section is absent
    #[error("Missing {0} section")]
    MissingSection(&'static str),
    /// A line could not be read
    #[error("Malformed assembly at line {line}: {message}")]
    Malformed {
        /// The 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },
    /// A reference does not resolve within the assembly
    #[error("Dangling {table} reference {index} (the table has {len} entries)")]
    DanglingReference {
        /// The table being referenced
        table: &'static str,
        /// The bad index
        index: usize,
        /// The size of the table
        len: usize,
    },
}

/// Any error produced while loading, compiling, or running Strata code
#[derive(Debug, Error)]
pub enum StrataError {
    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Execution failed
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// An assembly could not be read
    #[error(transparent)]
    Format(#[from] FormatError),
    /// A file could not be read or written
    #[error("Failed to access {}: {error}", path.display())]
    Io {
        /// The file
        path: PathBuf,
        /// The underlying error
        error: io::Error,
    },
}

impl StrataError {
    /// Get a rich-text report for the error
    pub fn report(&self, inputs: &Inputs) -> Report {
        match self {
            StrataError::Compile(e) => e.report(inputs),
            StrataError::Runtime(e) => e.report(inputs),
            error => Report::new(ReportKind::Error, error.to_string()),
        }
    }
}
