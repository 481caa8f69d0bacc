//! The compiled form of a Strata program and its text encoding
//!
//! An encoded assembly looks like this:
//!
//! ```text
//! STRATA ASSEMBLY 2
//! ROOT
//! {"start":0,"len":3}
//! INSTRUCTIONS
//! {"push":0}
//! ...
//! CONSTANTS
//! FUNCTIONS
//! EXPORTS
//! SPANS
//! ```
//!
//! Every entry is one line of JSON. Version 1 has no `EXPORTS` or `SPANS`
//! sections.

use std::collections::HashMap;

use ecow::EcoVec;
use indexmap::IndexMap;
use serde::*;

use crate::{
    array::{Array, ArrayValue},
    instr::{FuncSlice, Function, Instr},
    Boxed, Complex, FormatError, Ident, Shape, Span, Value,
};

/// A compiled Strata program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assembly {
    /// The instructions of the top-level code and every function
    pub instrs: EcoVec<Instr>,
    /// The constant pool
    pub constants: EcoVec<Value>,
    /// The function table
    pub functions: EcoVec<Function>,
    /// Named functions that are kept even if the top-level code never calls them
    pub exports: IndexMap<Ident, usize>,
    /// The top-level code
    pub root: FuncSlice,
    /// The span table
    pub spans: EcoVec<Span>,
}

const HEADER: &str = "STRATA ASSEMBLY";
const SECTIONS: [&str; 6] = ["ROOT", "INSTRUCTIONS", "CONSTANTS", "FUNCTIONS", "EXPORTS", "SPANS"];

impl Assembly {
    /// The newest format version, which [`Assembly::encode`] writes
    pub const VERSION: u32 = 2;
    /// Get the instructions of the top-level code
    pub fn root_instrs(&self) -> &[Instr] {
        (self.instrs.get(self.root.start..self.root.end())).unwrap_or_default()
    }
    /// Get the instructions of a function
    pub fn function_instrs(&self, func: &Function) -> &[Instr] {
        (self.instrs.get(func.slice.start..func.slice.end())).unwrap_or_default()
    }
    /// Find an exported function by name
    pub fn export(&self, name: &str) -> Option<&Function> {
        self.exports.get(name).and_then(|&i| self.functions.get(i))
    }
    /// Check that every reference resolves within the assembly
    pub fn validate(&self) -> Result<(), FormatError> {
        let check = |table: &'static str, index: usize, len: usize| {
            if index < len {
                Ok(())
            } else {
                Err(FormatError::DanglingReference { table, index, len })
            }
        };
        let instr_count = self.instrs.len();
        for slice in std::iter::once(&self.root).chain(self.functions.iter().map(|f| &f.slice)) {
            let Some(end) = slice.checked_end() else {
                return Err(FormatError::DanglingReference {
                    table: "instruction",
                    index: slice.start,
                    len: instr_count,
                });
            };
            if slice.len > 0 {
                check("instruction", end - 1, instr_count)?;
            } else {
                check("instruction", slice.start, instr_count + 1)?;
            }
        }
        for instr in &self.instrs {
            if let Instr::Push(i) = instr {
                check("constant", *i, self.constants.len())?;
            }
            for func in instr.functions() {
                check("function", func, self.functions.len())?;
            }
            if let Some(span) = instr.span() {
                check("span", span, self.spans.len())?;
            }
        }
        for &index in self.exports.values() {
            check("function", index, self.functions.len())?;
        }
        Ok(())
    }
    /// Encode the assembly in the current text format
    pub fn encode(&self) -> String {
        // Deduplicate constants by their encoded form
        let mut constants: IndexMap<String, usize> = IndexMap::new();
        let mut remap = Vec::with_capacity(self.constants.len());
        for value in &self.constants {
            let line = json(&ConstRep::from(value));
            let len = constants.len();
            remap.push(*constants.entry(line).or_insert(len));
        }

        let mut out = format!("{HEADER} {}\n", Self::VERSION);
        out.push_str("ROOT\n");
        out.push_str(&json(&self.root));
        out.push('\n');
        out.push_str("INSTRUCTIONS\n");
        for instr in &self.instrs {
            let line = match instr {
                Instr::Push(i) => json(&Instr::Push(remap.get(*i).copied().unwrap_or(*i))),
                instr => json(instr),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("CONSTANTS\n");
        for line in constants.keys() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("FUNCTIONS\n");
        for func in &self.functions {
            out.push_str(&json(func));
            out.push('\n');
        }
        out.push_str("EXPORTS\n");
        for (name, index) in &self.exports {
            out.push_str(&json(&(name, index)));
            out.push('\n');
        }
        out.push_str("SPANS\n");
        for span in &self.spans {
            out.push_str(&json(span));
            out.push('\n');
        }
        out
    }
    /// Decode an assembly from its text format
    ///
    /// The version tag is read first and selects how the rest is read.
    pub fn decode(src: &str) -> Result<Self, FormatError> {
        let mut lines = (src.lines().enumerate())
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());
        let (header_line, header) = lines.next().ok_or(FormatError::MissingHeader)?;
        let version = header
            .strip_prefix(HEADER)
            .ok_or(FormatError::MissingHeader)?
            .trim()
            .parse::<u32>()
            .map_err(|e| FormatError::Malformed {
                line: header_line,
                message: format!("invalid version: {e}"),
            })?;
        if version == 0 || version > Self::VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                supported: Self::VERSION,
            });
        }
        tracing::debug!(version, "decoding assembly");

        let mut sections: HashMap<&str, Vec<(usize, &str)>> = HashMap::new();
        let mut current: Option<&str> = None;
        for (line_no, line) in lines {
            if let Some(&name) = SECTIONS.iter().find(|&&name| name == line) {
                if sections.contains_key(name) {
                    return Err(FormatError::Malformed {
                        line: line_no,
                        message: format!("duplicate {name} section"),
                    });
                }
                sections.insert(name, Vec::new());
                current = Some(name);
                continue;
            }
            let Some(entries) = current.and_then(|name| sections.get_mut(name)) else {
                return Err(FormatError::Malformed {
                    line: line_no,
                    message: "entry outside of any section".into(),
                });
            };
            entries.push((line_no, line));
        }
        let required: &[&'static str] = match version {
            1 => &SECTIONS[..4],
            _ => &SECTIONS,
        };
        let mut section = |name: &'static str| -> Result<Vec<(usize, &str)>, FormatError> {
            if required.contains(&name) {
                sections.remove(name).ok_or(FormatError::MissingSection(name))
            } else {
                Ok(sections.remove(name).unwrap_or_default())
            }
        };

        let root_entries = section("ROOT")?;
        let [(root_line, root_src)] = root_entries.as_slice() else {
            return Err(FormatError::Malformed {
                line: root_entries.first().map_or(header_line, |(line, _)| *line),
                message: "the ROOT section must have exactly one entry".into(),
            });
        };
        let root: FuncSlice = parse_line(*root_line, root_src)?;
        let instrs = (section("INSTRUCTIONS")?.into_iter())
            .map(|(line, src)| parse_line::<Instr>(line, src))
            .collect::<Result<EcoVec<_>, _>>()?;
        let constants = (section("CONSTANTS")?.into_iter())
            .map(|(line, src)| {
                let rep: ConstRep = parse_line(line, src)?;
                rep.into_value()
                    .map_err(|message| FormatError::Malformed { line, message })
            })
            .collect::<Result<EcoVec<_>, _>>()?;
        let functions = (section("FUNCTIONS")?.into_iter())
            .map(|(line, src)| parse_line::<Function>(line, src))
            .collect::<Result<EcoVec<_>, _>>()?;
        let exports = (section("EXPORTS")?.into_iter())
            .map(|(line, src)| parse_line::<(Ident, usize)>(line, src))
            .collect::<Result<IndexMap<_, _>, _>>()?;
        let mut spans = (section("SPANS")?.into_iter())
            .map(|(line, src)| parse_line::<Span>(line, src))
            .collect::<Result<EcoVec<_>, _>>()?;
        if version == 1 {
            let span_count = instrs.iter().filter_map(Instr::span).max().map_or(0, |i| i + 1);
            spans = (0..span_count).map(|_| Span::Builtin).collect();
        }

        let asm = Assembly {
            instrs,
            constants,
            functions,
            exports,
            root,
            spans,
        };
        asm.validate()?;
        Ok(asm)
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("\"{e}\""))
}

fn parse_line<T: de::DeserializeOwned>(line: usize, src: &str) -> Result<T, FormatError> {
    serde_json::from_str(src).map_err(|e| FormatError::Malformed {
        line,
        message: e.to_string(),
    })
}

/// The encoded form of a constant
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ConstRep {
    Bool(Shape, Vec<bool>),
    Int(Shape, Vec<i64>),
    Real(Shape, Vec<RealRep>),
    Complex(Shape, Vec<(RealRep, RealRep)>),
    Char(Shape, String),
    Box(Shape, Vec<ConstRep>),
}

/// Reals that JSON cannot represent are written as tags
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RealRep {
    Num(f64),
    Tag(NonFinite),
}

#[derive(Serialize, Deserialize)]
enum NonFinite {
    #[serde(rename = "nan")]
    NaN,
    #[serde(rename = "inf")]
    Inf,
    #[serde(rename = "-inf")]
    NegInf,
}

impl From<f64> for RealRep {
    fn from(x: f64) -> Self {
        if x.is_nan() {
            RealRep::Tag(NonFinite::NaN)
        } else if x == f64::INFINITY {
            RealRep::Tag(NonFinite::Inf)
        } else if x == f64::NEG_INFINITY {
            RealRep::Tag(NonFinite::NegInf)
        } else {
            RealRep::Num(x)
        }
    }
}

impl From<RealRep> for f64 {
    fn from(rep: RealRep) -> Self {
        match rep {
            RealRep::Num(x) => x,
            RealRep::Tag(NonFinite::NaN) => f64::NAN,
            RealRep::Tag(NonFinite::Inf) => f64::INFINITY,
            RealRep::Tag(NonFinite::NegInf) => f64::NEG_INFINITY,
        }
    }
}

impl From<&Value> for ConstRep {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(arr) => ConstRep::Bool(arr.shape.clone(), arr.data.to_vec()),
            Value::Int(arr) => ConstRep::Int(arr.shape.clone(), arr.data.to_vec()),
            Value::Real(arr) => ConstRep::Real(
                arr.shape.clone(),
                arr.data.iter().map(|&x| x.into()).collect(),
            ),
            Value::Complex(arr) => ConstRep::Complex(
                arr.shape.clone(),
                arr.data.iter().map(|z| (z.re.into(), z.im.into())).collect(),
            ),
            Value::Char(arr) => ConstRep::Char(arr.shape.clone(), arr.data.iter().collect()),
            Value::Box(arr) => ConstRep::Box(
                arr.shape.clone(),
                arr.data.iter().map(|b| ConstRep::from(b.as_value())).collect(),
            ),
        }
    }
}

fn checked_array<T: ArrayValue>(shape: Shape, data: Vec<T>) -> Result<Array<T>, String> {
    let Some(elements) = shape.checked_elements() else {
        return Err(format!("shape {shape} has too many elements"));
    };
    if elements != data.len() {
        return Err(format!(
            "shape {shape} needs {elements} elements, but there are {}",
            data.len()
        ));
    }
    Ok(Array::new(shape, data))
}

impl ConstRep {
    fn into_value(self) -> Result<Value, String> {
        Ok(match self {
            ConstRep::Bool(shape, data) => checked_array(shape, data)?.into(),
            ConstRep::Int(shape, data) => checked_array(shape, data)?.into(),
            ConstRep::Real(shape, data) => {
                checked_array(shape, data.into_iter().map(f64::from).collect())?.into()
            }
            ConstRep::Complex(shape, data) => {
                let data = (data.into_iter())
                    .map(|(re, im)| Complex::new(re.into(), im.into()))
                    .collect();
                checked_array(shape, data)?.into()
            }
            ConstRep::Char(shape, data) => checked_array(shape, data.chars().collect())?.into(),
            ConstRep::Box(shape, data) => {
                let data = (data.into_iter())
                    .map(|rep| rep.into_value().map(Boxed))
                    .collect::<Result<_, _>>()?;
                checked_array(shape, data)?.into()
            }
        })
    }
}
