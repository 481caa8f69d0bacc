use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use ecow::{EcoString, EcoVec};

use crate::InputSrc;

/// A repository of code strings input to the compiler
///
/// Diagnostics use it to render the source lines their spans point into.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// A map of file paths to their string contents
    pub files: HashMap<PathBuf, EcoString>,
    /// A list of input strings without paths
    pub strings: EcoVec<EcoString>,
}

impl Inputs {
    /// Add a string input and get its source
    pub fn add_str(&mut self, input: impl Into<EcoString>) -> InputSrc {
        self.strings.push(input.into());
        InputSrc::Str(self.strings.len() - 1)
    }
    /// Add a file input and get its source
    pub fn add_file(&mut self, path: &Path, input: impl Into<EcoString>) -> InputSrc {
        self.files.insert(path.to_path_buf(), input.into());
        InputSrc::File(path.into())
    }
    /// Get an input string and perform an operation on it
    pub fn try_get_with<T>(&self, src: &InputSrc, f: impl FnOnce(&str) -> T) -> Option<T> {
        match src {
            InputSrc::File(path) => self.files.get(&**path).map(|src| f(src)),
            InputSrc::Str(index) => self.strings.get(*index).map(|src| f(src)),
        }
    }
    /// Get the text of a 1-based line of an input
    pub fn line(&self, src: &InputSrc, line: u32) -> Option<EcoString> {
        self.try_get_with(src, |input| {
            (input.lines().nth(line.saturating_sub(1) as usize)).map(EcoString::from)
        })?
    }
}
