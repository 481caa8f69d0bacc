use std::{borrow::Borrow, cmp::Ordering, fmt};

use crate::{array::ArrayValue, value::Value};

/// The element type for box arrays
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Boxed(pub Value);

impl Boxed {
    /// Get the inner value
    pub fn as_value(&self) -> &Value {
        &self.0
    }
    /// Unwrap the inner value
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl ArrayValue for Boxed {
    const NAME: &'static str = "box";
    fn array_cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
    fn format_elem(&self) -> String {
        format!("□{}", self.0)
    }
}

impl fmt::Debug for Boxed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "□{:?}", self.0)
    }
}

impl fmt::Display for Boxed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "□{}", self.0)
    }
}

impl From<Value> for Boxed {
    fn from(v: Value) -> Self {
        Self(v)
    }
}

impl AsRef<Value> for Boxed {
    fn as_ref(&self) -> &Value {
        &self.0
    }
}

impl Borrow<Value> for Boxed {
    fn borrow(&self) -> &Value {
        &self.0
    }
}
