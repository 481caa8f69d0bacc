//! Algorithms for primitives and modifiers

use std::mem::size_of;

use crate::{RuntimeErrorKind, RuntimeResult, Shape, Value};

mod dyadic;
pub(crate) mod loops;
mod monadic;
pub mod pervade;
pub(crate) mod reduce;
mod search;

/// The most memory, in bytes, a single new array may take up
const MAX_ARRAY_BYTES: u64 = 4 << 30;

/// Check that an array of `T` with the given shape is small enough to create
///
/// Returns the number of elements.
pub(crate) fn validate_size<T>(shape: &[usize]) -> RuntimeResult<usize> {
    let too_large = || {
        RuntimeErrorKind::Domain(
            format!(
                "An array of shape {} would be too large",
                Shape::from(shape)
            )
            .into(),
        )
    };
    let elements = Shape::from(shape).checked_elements().ok_or_else(too_large)?;
    let bytes = (elements as u64).checked_mul(size_of::<T>().max(1) as u64);
    match bytes {
        Some(bytes) if bytes <= MAX_ARRAY_BYTES => Ok(elements),
        _ => Err(too_large()),
    }
}

/// Give a value a new shape with the same number of elements
fn with_shape(mut value: Value, shape: Shape) -> Value {
    debug_assert_eq!(value.element_count(), shape.elements());
    crate::val_as_arr!(&mut value, |arr| arr.shape = shape);
    value
}
