//! # LUX Signature
//!
//! The argument-shape grammar of LUX built-ins and the binder that applies
//! it to call arguments.
//!
//! ## Grammar
//!
//! A signature is a `;`-separated list of parameters:
//!
//! ```text
//! spec  := param (';' param)*
//! param := role ['?'] [type] ['[' ref ']'] ['{' axis '}'] [dim (',' dim)*] ['*' | '&']
//! role  := 'i' | 'o' | 'r'
//! type  := ['>'] ('B' | 'W' | 'L' | 'Q' | 'F' | 'D') | 'S'
//! ref   := digits | '-'
//! dim   := ('+' | '-' | '=' | ':') [count] | count
//! ```
//!
//! | Marker | Input | Output / return |
//! |--------|-------|-----------------|
//! | `n` | dimension must be `n` | dimension is `n` |
//! | `+n` | not allowed | insert a dimension of size `n` |
//! | `-[n]` | skip a reference dimension | skip a reference dimension |
//! | `=[n]` | must equal the reference dimension | copy the reference dimension |
//! | `:` | any size | not allowed |
//! | `*` | any trailing dimensions | not allowed |
//! | `&` | trailing dimensions equal the reference's | copy the reference's trailing dimensions |
//!
//! Counts are sizes; an optional count after `-` or `=` verifies the
//! reference dimension. The reference parameter defaults to the one bound
//! just before, where the return parameter is always bound last.
//!
//! ## Example
//!
//! ```
//! use lux_signature::{bind, parse, BindConfig};
//! use lux_value::{HeapAllocator, Value};
//!
//! let specs = parse("i>D:;rD=")?;
//! let mut args = [Value::array(&[5], vec![1i32, 2, 3, 4, 5])?];
//! let binding = bind(&mut args, &specs, &BindConfig::default(), &HeapAllocator::new())?;
//! assert_eq!(binding.ret.unwrap().dims().as_slice(), &[5]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bind;
mod parser;
pub mod spec;

pub use bind::{bind, BindConfig, Binding};
pub use parser::parse;
pub use spec::{DimSpec, ParamSpec, ParamSpecList, Role, Trailing, TypeSpec};

use lux_loop::LoopError;
use lux_types::ElementType;
use lux_value::ValueError;

/// A malformed signature.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at position {pos}")]
pub struct GrammarError {
    /// Byte offset of the offending character.
    pub pos: usize,
    /// What is wrong.
    pub kind: GrammarErrorKind,
}

/// The kinds of [`GrammarError`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GrammarErrorKind {
    /// The signature ended early.
    #[error("unexpected end of signature, expected {expected}")]
    UnexpectedEnd {
        /// What was expected.
        expected: &'static str,
    },

    /// A character that cannot appear here.
    #[error("unexpected '{found}', expected {expected}")]
    UnexpectedChar {
        /// The character found.
        found: char,
        /// What was expected.
        expected: &'static str,
    },

    /// A role other than `i`, `o` or `r`.
    #[error("unknown parameter role '{0}'")]
    UnknownRole(char),

    /// A type letter other than `B W L Q F D S`.
    #[error("unknown element type '{0}'")]
    UnknownType(char),

    /// `>S`.
    #[error("a string type cannot be a lower bound")]
    LowerBoundString,

    /// A reference or axis index that is neither digits nor `-`, or is
    /// not closed.
    #[error("malformed parameter index")]
    MalformedIndex,

    /// A zero count, or one too large to represent.
    #[error("invalid dimension count")]
    InvalidCount,

    /// Two markers on one dimension, such as `+=`.
    #[error("conflicting dimension markers")]
    ConflictingMarkers,

    /// `+` on an input.
    #[error("an input cannot add dimensions")]
    AddOnInput,

    /// `+` without a count.
    #[error("'+' needs a dimension size")]
    MissingAddCount,

    /// `:` on an output or return parameter.
    #[error("':' is only allowed on inputs")]
    AnyOnOutput,

    /// `:` followed by a count.
    #[error("':' takes no dimension size")]
    CountAfterAny,

    /// `*` on an output or return parameter.
    #[error("'*' is only allowed on inputs")]
    ArbitraryOnOutput,

    /// `{axis}` on an input.
    #[error("an axis parameter is only allowed on outputs and return values")]
    AxisOnInput,

    /// `r?`.
    #[error("the return parameter cannot be optional")]
    OptionalReturn,

    /// More than one `r`.
    #[error("only one return parameter is allowed")]
    MultipleReturns,

    /// A parameter naming itself.
    #[error("parameter {index} refers to itself")]
    SelfReference {
        /// The index given.
        index: usize,
    },

    /// An index beyond the declared parameters.
    #[error("parameter index {index} is out of range for {count} parameters")]
    IndexOutOfRange {
        /// The index given.
        index: usize,
        /// Number of declared parameters.
        count: usize,
    },

    /// An input or output naming the return parameter, which is bound
    /// after it.
    #[error("parameter {index} is the return value, which is bound last")]
    ReferencesReturn {
        /// The index given.
        index: usize,
    },

    /// A rule that needs a reference on a parameter without one.
    #[error("no reference parameter available")]
    NoReference,
}

/// Call arguments that do not fit a signature.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ArgumentError {
    /// Wrong number of arguments.
    #[error("{given} arguments given, expected {min} to {max}")]
    Arity {
        /// Arguments given.
        given: usize,
        /// Minimum accepted.
        min: usize,
        /// Maximum accepted.
        max: usize,
    },

    /// A required argument is undefined.
    #[error("parameter {param}: argument is required")]
    Missing {
        /// Parameter index.
        param: usize,
    },

    /// The reference is a produced parameter that is bound later.
    #[error("parameter {param}: reference parameter {reference} is not bound yet")]
    ForwardReference {
        /// Parameter index.
        param: usize,
        /// The reference.
        reference: usize,
    },

    /// The reference is needed but was omitted.
    #[error("parameter {param}: reference parameter {reference:?} was not supplied")]
    MissingReference {
        /// Parameter index.
        param: usize,
        /// The reference, if one is declared.
        reference: Option<usize>,
    },

    /// A dimension has the wrong size.
    #[error("parameter {param}: expected size {expected} for dimension {dim}, found {found}")]
    DimensionMismatch {
        /// Parameter index.
        param: usize,
        /// Dimension index.
        dim: usize,
        /// Size required.
        expected: usize,
        /// Size found.
        found: usize,
    },

    /// A verified reference dimension has the wrong size.
    #[error("parameter {param}: expected size {expected} for reference dimension {dim}, found {found}")]
    ReferenceMismatch {
        /// Parameter index.
        param: usize,
        /// Reference dimension index.
        dim: usize,
        /// Size required.
        expected: usize,
        /// Size found.
        found: usize,
    },

    /// More dimensions than the rules allow.
    #[error("parameter {param}: at most {allowed} dimension(s) allowed, found {found:?}")]
    ExtraDimensions {
        /// Parameter index.
        param: usize,
        /// Dimensions covered by the rules.
        allowed: usize,
        /// The dimensions found.
        found: Vec<usize>,
    },

    /// Trailing dimensions differ from the reference's.
    #[error("parameter {param}: trailing dimensions {found:?} differ from reference {expected:?}")]
    TrailingMismatch {
        /// Parameter index.
        param: usize,
        /// The reference's trailing dimensions.
        expected: Vec<usize>,
        /// The trailing dimensions found.
        found: Vec<usize>,
    },

    /// A produced shape with too many dimensions.
    #[error("parameter {param}: {rank} dimensions exceed the maximum of {max}", max = lux_types::MAX_DIMS)]
    TooManyDims {
        /// Parameter index.
        param: usize,
        /// The rank produced.
        rank: usize,
    },

    /// A produced shape whose element count overflows.
    #[error("parameter {param}: dimensions {dims:?} hold too many elements")]
    TooManyElements {
        /// Parameter index.
        param: usize,
        /// The shape produced.
        dims: Vec<usize>,
    },

    /// A string where a number is required or the reverse.
    #[error("parameter {param}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Parameter index.
        param: usize,
        /// Type required.
        expected: ElementType,
        /// Type found.
        found: ElementType,
    },

    /// An axis parameter naming a dimension that does not exist.
    #[error("parameter {param}: axis {axis} is out of range for {ndim} dimension(s)")]
    AxisOutOfRange {
        /// Parameter index.
        param: usize,
        /// The axis.
        axis: i64,
        /// Dimensions of the parameter.
        ndim: usize,
    },

    /// Inspecting, converting or allocating a value failed.
    #[error("parameter {param}: {source}")]
    Value {
        /// Parameter index.
        param: usize,
        /// The failure.
        source: ValueError,
    },

    /// Building the parameter's loop failed.
    #[error("parameter {param}: {source}")]
    Loop {
        /// Parameter index.
        param: usize,
        /// The failure.
        source: LoopError,
    },
}

impl ArgumentError {
    /// The offending parameter, except for arity errors.
    #[must_use]
    pub fn param(&self) -> Option<usize> {
        match self {
            Self::Arity { .. } => None,
            Self::Missing { param }
            | Self::ForwardReference { param, .. }
            | Self::MissingReference { param, .. }
            | Self::DimensionMismatch { param, .. }
            | Self::ReferenceMismatch { param, .. }
            | Self::ExtraDimensions { param, .. }
            | Self::TrailingMismatch { param, .. }
            | Self::TooManyDims { param, .. }
            | Self::TooManyElements { param, .. }
            | Self::TypeMismatch { param, .. }
            | Self::AxisOutOfRange { param, .. }
            | Self::Value { param, .. }
            | Self::Loop { param, .. } => Some(*param),
        }
    }
}
