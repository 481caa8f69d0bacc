//! All primitive definitions

use enum_iterator::Sequence;
use serde::*;

use crate::{AsciiToken, PrimClass, PrimNames};

macro_rules! primitive {
    ($(
        #[doc = $doc_rust:literal]
        $(#[doc = $doc:literal])*
        (
            $(
                $($args:literal)?
                $(($outputs:expr))?
                $([$mod_args:expr])?
            ,)?
            $variant:ident, $class:ident, $names:expr
        )
    ),* $(,)?) => {
        /// A built-in function
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum Primitive {
            $(
                #[doc = $doc_rust]
                $variant,
            )*
        }

        impl Primitive {
            /// Get the primitive's names
            pub fn names(&self) -> PrimNames {
                match self {
                    $(Primitive::$variant => $names.into(),)*
                }
            }
            /// Get the primitive's class
            pub fn class(&self) -> PrimClass {
                match self {
                    $(Primitive::$variant => PrimClass::$class,)*
                }
            }
            /// Get the number of function operands the primitive takes
            pub fn modifier_args(&self) -> Option<usize> {
                match self {
                    $($($(Primitive::$variant => Some($mod_args),)?)?)*
                    _ => None
                }
            }
            /// Get the number of arguments the primitive takes
            pub fn args(&self) -> Option<usize> {
                match self {
                    $($($(Primitive::$variant => Some($args),)?)?)*
                    _ => None
                }
            }
            /// Get the number of outputs the primitive produces
            pub fn outputs(&self) -> Option<usize> {
                match self {
                    $($($(Primitive::$variant => Some($outputs),)?)?)*
                    _ => Some(1)
                }
            }
            /// Get the primitive's documentation string
            pub fn doc(&self) -> &'static str {
                match self {
                    $(Primitive::$variant => concat!($doc_rust, $($doc, "\n"),*),)*
                }
            }
        }
    };
}

primitive!(
    /// Duplicate the top value on the stack
    ///
    /// ex: [. 1 2 3]
    (1(2), Dup, Stack, ("duplicate", '.')),
    /// Duplicate the second-to-top value to the top of the stack
    ///
    /// ex: [, 1 2 3]
    (2(3), Over, Stack, ("over", ',')),
    /// Swap the top two values on the stack
    ///
    /// ex: [: 1 2 3]
    (2(2), Flip, Stack, ("flip", ':')),
    /// Discard the top value on the stack
    (1(0), Pop, Stack, ("pop", '◌')),
    /// Do nothing with one value
    (1, Identity, Stack, ("identity", '∘')),
    /// Half of π
    (0, Eta, Constant, ("eta", 'η')),
    /// The ratio of a circle's circumference to its diameter
    (0, Pi, Constant, ("pi", 'π')),
    /// Twice π
    (0, Tau, Constant, ("tau", 'τ')),
    /// Positive infinity
    (0, Infinity, Constant, ("infinity", '∞')),
    /// Logical not
    ///
    /// Computes `1 - x`
    /// ex: ¬ [0 1 0]
    (1, Not, MonadicPervasive, ("not", '¬')),
    /// The sign of a number
    (1, Sign, MonadicPervasive, ("sign", '±')),
    /// Negate a number
    ///
    /// `¯` directly before a digit forms a negative literal instead.
    /// ex: ¯ 5
    (1, Neg, MonadicPervasive, ("negate", '¯')),
    /// The absolute value of a number
    ///
    /// The absolute value of a complex number is its magnitude.
    (1, Abs, MonadicPervasive, ("absolute value", '⌵')),
    /// Take the square root of a number
    (1, Sqrt, MonadicPervasive, ("sqrt", '√')),
    /// Round down
    (1, Floor, MonadicPervasive, ("floor", '⌊')),
    /// Round up
    (1, Ceil, MonadicPervasive, ("ceiling", '⌈')),
    /// Round to the nearest integer, halves away from zero
    (1, Round, MonadicPervasive, ("round", '⁅')),
    /// Compare for equality
    ///
    /// ex: = 1 [1 2 1]
    (2, Eq, DyadicPervasive, ("equals", '=')),
    /// Compare for inequality
    (2, Ne, DyadicPervasive, ("not equals", AsciiToken::BangEqual, '≠')),
    /// Check if the second argument is less than the first
    ///
    /// ex: < 2 1
    (2, Lt, DyadicPervasive, ("less than", '<')),
    /// Check if the second argument is less than or equal to the first
    (2, Le, DyadicPervasive, ("less or equal", AsciiToken::LessEqual, '≤')),
    /// Check if the second argument is greater than the first
    (2, Gt, DyadicPervasive, ("greater than", '>')),
    /// Check if the second argument is greater than or equal to the first
    (2, Ge, DyadicPervasive, ("greater or equal", AsciiToken::GreaterEqual, '≥')),
    /// Add values
    ///
    /// ex: + 1 [2 3 4]
    /// A character plus an integer is a character.
    /// ex: + 1 @a
    (2, Add, DyadicPervasive, ("add", '+')),
    /// Subtract the first argument from the second
    ///
    /// ex: - 1 5
    (2, Sub, DyadicPervasive, ("subtract", '-')),
    /// Multiply values
    (2, Mul, DyadicPervasive, ("multiply", AsciiToken::Star, '×')),
    /// Divide the second argument by the first
    ///
    /// Dividing two integers produces a real number.
    /// ex: ÷ 2 5
    (2, Div, DyadicPervasive, ("divide", AsciiToken::Percent, '÷')),
    /// The non-negative remainder of dividing the second argument by the first
    (2, Modulus, DyadicPervasive, ("modulus", '◿')),
    /// Raise the second argument to the power of the first
    (2, Pow, DyadicPervasive, ("power", 'ⁿ')),
    /// Take the minimum of two arrays
    (2, Min, DyadicPervasive, ("minimum", '↧')),
    /// Take the maximum of two arrays
    (2, Max, DyadicPervasive, ("maximum", '↥')),
    /// Make a complex number
    ///
    /// The first argument is the imaginary part and the second is the real part.
    /// ex: ℂ 3 4
    (2, Complex, DyadicPervasive, ("complex", 'ℂ')),
    /// Get the number of rows in an array
    ///
    /// ex: ⧻ [1 2 3]
    (1, Len, MonadicArray, ("length", '⧻')),
    /// Get the dimensions of an array
    ///
    /// ex: △ [1_2_3 4_5_6]
    (1, Shape, MonadicArray, ("shape", '△')),
    /// Make an array of all natural numbers less than a number
    ///
    /// ex: ⇡ 5
    (1, Range, MonadicArray, ("range", '⇡')),
    /// Get the first row of an array
    (1, First, MonadicArray, ("first", '⊢')),
    /// Reverse the rows of an array
    (1, Reverse, MonadicArray, ("reverse", '⇌')),
    /// Make an array 1-dimensional
    (1, Deshape, MonadicArray, ("deshape", '♭')),
    /// Rotate the shape of an array, moving the first axis to the end
    (1, Transpose, MonadicArray, ("transpose", '⍉')),
    /// Get the indices into an array if it were sorted ascending
    (1, Rise, MonadicArray, ("rise", '⍏')),
    /// Get the indices into an array if it were sorted descending
    (1, Fall, MonadicArray, ("fall", '⍖')),
    /// Turn an array into a box
    (1, Box, MonadicArray, ("box", '□')),
    /// Take an array out of a box
    ///
    /// Unboxing a value that is not a box leaves it unchanged.
    (1, Unbox, MonadicArray, ("unbox", '⊔')),
    /// Check if two arrays are exactly the same
    (2, Match, DyadicArray, ("match", '≍')),
    /// Combine two arrays as rows of a new array
    ///
    /// Both arrays must have the same shape.
    (2, Couple, DyadicArray, ("couple", '⊟')),
    /// Append two arrays end-to-end
    (2, Join, DyadicArray, ("join", '⊂')),
    /// Select multiple rows from an array
    (2, Select, DyadicArray, ("select", '⊏')),
    /// Index a row or element from an array
    ///
    /// Indices outside the array are an error.
    /// ex: ⊡ 1 [5 6 7]
    (2, Pick, DyadicArray, ("pick", '⊡')),
    /// Change the shape of an array
    ///
    /// The data is cycled or truncated to fit the new shape.
    /// ex: ↯ 2_3 ⇡6
    (2, Reshape, DyadicArray, ("reshape", '↯')),
    /// Take the first n rows of an array
    ///
    /// A negative count takes from the end.
    (2, Take, DyadicArray, ("take", '↙')),
    /// Drop the first n rows of an array
    ///
    /// A negative count drops from the end.
    (2, Drop, DyadicArray, ("drop", '↘')),
    /// Rotate the rows of an array
    (2, Rotate, DyadicArray, ("rotate", '↻')),
    /// Repeat each row of an array by a count
    ///
    /// A single count applies to every row. A list needs one count per row.
    /// ex: ▽ [1 0 2] [7 8 9]
    (2, Keep, DyadicArray, ("keep", '▽')),
    /// Get every run of n consecutive rows of an array
    ///
    /// ex: ◫ 2 [1 2 3 4]
    (2, Windows, DyadicArray, ("windows", '◫')),
    /// Mark where an array occurs in another
    ///
    /// ex: ⌕ [1 2] [1 2 3 1 2]
    (2, Find, DyadicArray, ("find", '⌕')),
    /// Check if each row of an array is a row of another
    ///
    /// ex: ∊ [2 5] [1 2 3]
    (2, Member, DyadicArray, ("member", '∊')),
    /// Find the index of each row of an array in another
    ///
    /// Rows that are missing get the row count of the searched array.
    /// ex: ⊗ [3 9] [1 2 3]
    (2, IndexOf, DyadicArray, ("index of", '⊗')),
    /// Apply a reducing function to an array
    ///
    /// ex: /+ [1 2 3 4]
    ([1], Reduce, AggregatingModifier, ("reduce", '/')),
    /// Apply a function to each element of an array
    ([1], Each, IteratingModifier, ("each", '∵')),
    /// Apply a function to each row of an array
    ([1], Rows, IteratingModifier, ("rows", '≡')),
    /// Repeat a function a number of times
    ///
    /// ex: ⍥(×2) 5 1
    ([1], Repeat, IteratingModifier, ("repeat", '⍥')),
    /// Repeat a function while a condition holds
    ///
    /// The first operand is the loop body and the second is the condition.
    ([2], Do, IteratingModifier, ("do", '⍢')),
    /// Temporarily pop the top value off the stack and call a function
    ([1], Dip, Planet, ("dip", '⊙')),
    /// Call two functions on the same values
    ([2], Fork, Planet, ("fork", '⊃')),
    /// Call the function at the given index
    ///
    /// ex: ⨬(+1|×10) 1 5
    ([1], Switch, OtherModifier, ("switch", '⨬')),
);
