//! The Strata front end: lexing, macro expansion, and parsing

pub mod ast;
mod defs;
mod error;
mod inputs;
mod lex;
pub mod macros;
pub mod parse;
mod primitive;
mod signature;

pub use {
    defs::*,
    error::*,
    inputs::*,
    lex::*,
    macros::*,
    parse::{parse, Expectation, ParseError, SysLookup},
    primitive::*,
    signature::*,
};

/// An identifier or macro name
pub type Ident = ecow::EcoString;
