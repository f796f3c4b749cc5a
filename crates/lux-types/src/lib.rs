//! Element types and shape primitives for the LUX runtime.
//!
//! Every array value in LUX carries an element type tag from a small,
//! closed set. This crate defines that set together with the read-only
//! tables the rest of the runtime consults:
//!
//! | Table | Function |
//! |-------|----------|
//! | promotion lattice | [`combined_type`] |
//! | element sizes | [`ElementType::size_bytes`] |
//! | predicates | [`ElementType::is_numerical`], [`ElementType::is_complex`], ... |
//!
//! It also fixes the maximum supported rank ([`MAX_DIMS`]) and the
//! [`Dims`] small-vector used for dimension and axis lists everywhere.
//!
//! # Promotion
//!
//! Types are ordered `Byte < Word < Long < Quad < Float < Double < CFloat
//! < CDouble`. Combining two types yields the wider one, except that
//! `CFloat` combined with `Double` yields `CDouble`: a complex operand
//! keeps the real width of the wider real type.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Maximum number of dimensions of any array value.
pub const MAX_DIMS: usize = 8;

/// A list of dimension sizes or axis numbers. Never longer than [`MAX_DIMS`]
/// in practice, so it stays inline.
pub type Dims = SmallVec<[usize; MAX_DIMS]>;

/// Element type of an array or scalar value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// 8-bit unsigned integer.
    Byte,
    /// 16-bit signed integer.
    Word,
    /// 32-bit signed integer.
    Long,
    /// 64-bit signed integer.
    Quad,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Complex number with 32-bit float parts.
    CFloat,
    /// Complex number with 64-bit float parts.
    CDouble,
    /// Text string.
    String,
}

impl ElementType {
    /// All numerical element types in promotion order.
    pub const NUMERICAL: [Self; 8] = [
        Self::Byte,
        Self::Word,
        Self::Long,
        Self::Quad,
        Self::Float,
        Self::Double,
        Self::CFloat,
        Self::CDouble,
    ];

    /// Returns the size in bytes of one element.
    ///
    /// Strings are stored as handles, so their size is that of a pointer.
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long | Self::Float => 4,
            Self::Quad | Self::Double | Self::CFloat => 8,
            Self::CDouble => 16,
            Self::String => std::mem::size_of::<usize>(),
        }
    }

    /// Returns true for every type except [`ElementType::String`].
    #[must_use]
    pub const fn is_numerical(self) -> bool {
        !matches!(self, Self::String)
    }

    /// Returns true for the integer types.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Byte | Self::Word | Self::Long | Self::Quad)
    }

    /// Returns true for the real floating-point types.
    #[must_use]
    pub const fn is_real_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Returns true for the complex types.
    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::CFloat | Self::CDouble)
    }

    /// Returns true for [`ElementType::String`].
    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String)
    }

    /// The real type underlying a complex type; other types map to themselves.
    #[must_use]
    pub const fn real_part(self) -> Self {
        match self {
            Self::CFloat => Self::Float,
            Self::CDouble => Self::Double,
            other => other,
        }
    }

    /// The complex type with the same real width. Integer types become
    /// `CFloat`, as they would promote to `Float`.
    #[must_use]
    pub const fn to_complex(self) -> Self {
        match self {
            Self::Double | Self::CDouble => Self::CDouble,
            Self::String => Self::String,
            _ => Self::CFloat,
        }
    }

    /// The single-letter code used in argument signatures and listings.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Byte => 'B',
            Self::Word => 'W',
            Self::Long => 'L',
            Self::Quad => 'Q',
            Self::Float => 'F',
            Self::Double => 'D',
            Self::CFloat => 'C',
            Self::CDouble => 'Z',
            Self::String => 'S',
        }
    }

    /// Looks up a type by its letter code.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'B' => Some(Self::Byte),
            'W' => Some(Self::Word),
            'L' => Some(Self::Long),
            'Q' => Some(Self::Quad),
            'F' => Some(Self::Float),
            'D' => Some(Self::Double),
            'C' => Some(Self::CFloat),
            'Z' => Some(Self::CDouble),
            'S' => Some(Self::String),
            _ => None,
        }
    }

    /// Returns true if values of `self` can hold every value of `other`
    /// without widening, i.e. `combined_type(self, other) == self`.
    #[must_use]
    pub fn is_at_least(self, other: Self) -> bool {
        combined_type(self, other) == self
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "BYTE",
            Self::Word => "WORD",
            Self::Long => "LONG",
            Self::Quad => "QUAD",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::CFloat => "CFLOAT",
            Self::CDouble => "CDOUBLE",
            Self::String => "STRING",
        };
        f.write_str(name)
    }
}

/// Returns the type that results from combining operands of types `a`
/// and `b`.
///
/// A string operand makes the result a string.
#[must_use]
pub fn combined_type(a: ElementType, b: ElementType) -> ElementType {
    if a.is_string() || b.is_string() {
        return ElementType::String;
    }
    if a.is_complex() || b.is_complex() {
        return a.real_part().max(b.real_part()).to_complex();
    }
    a.max(b)
}

/// Returns the number of elements described by `dims`; `1` for an empty list.
#[must_use]
pub fn element_count(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Like [`element_count`], but returns `None` when the product does not fit
/// in an `isize`.
#[must_use]
pub fn checked_element_count(dims: &[usize]) -> Option<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .filter(|&n| isize::try_from(n).is_ok())
}

/// Removes trailing dimensions of size 1. All-ones dimensions become empty.
pub fn strip_trailing_ones(dims: &mut Dims) {
    while dims.last() == Some(&1) {
        dims.pop();
    }
}

/// Error for a rank outside `1..=MAX_DIMS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("rank {rank} is outside the supported range 1..={max}", max = MAX_DIMS)]
pub struct RankError {
    /// The offending rank.
    pub rank: usize,
}

/// Checks that `rank` is supported.
///
/// # Errors
///
/// Returns [`RankError`] for rank 0 or a rank above [`MAX_DIMS`].
pub fn check_rank(rank: usize) -> Result<(), RankError> {
    if rank == 0 || rank > MAX_DIMS {
        Err(RankError { rank })
    } else {
        Ok(())
    }
}
