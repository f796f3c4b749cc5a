//! # LUX Loop
//!
//! The N-dimensional traversal engine behind LUX's vectorized built-ins.
//!
//! ## Overview
//!
//! A built-in that operates "along an axis" never walks the array data
//! directly. It asks this crate for a [`LoopInfo`] per operand, then
//! repeatedly calls [`LoopInfo::advance`] and applies its element logic at
//! [`LoopInfo::cursor`] until the loop reports that every rearranged axis
//! has completed:
//!
//! ```text
//! standard_loop(source, request)       -> LoopInfo (source) [+ result value, LoopInfo]
//!     |
//!     |   select_axes    validate the requested axes
//!     |   rearrange      reorder/fuse dimensions for the traversal order
//!     |   resolve        compute the result shape from the directives
//!     v
//! loop { body(cursor); if info.advance() == info.rndim() { break } }
//! ```
//!
//! ## Traversal orders
//!
//! | Order | Rearranged axes |
//! |-------|-----------------|
//! | [`TraversalOrder::EachCoord`] | current axis, then all others in original order |
//! | [`TraversalOrder::AxisCoord`] | current axis, fused axes before it, fused axes after it |
//! | [`TraversalOrder::AxisBlock`] | all selected axes in the given order, then the rest ascending |
//!
//! Cursor movement is O(1) per step: each [`LoopInfo`] precomputes the
//! net displacement for incrementing each rearranged coordinate, already
//! corrected for the carry out of the axis below it.
//!
//! ## Main Types
//!
//! - [`LoopInfo`]: one operand's traversal state
//! - [`ShapeDirectives`] / [`ResolvedShape`]: result-shape rules and outcome
//! - [`LoopRequest`] / [`StandardLoop`]: the orchestrated source/result pair

#![warn(missing_docs)]
#![warn(clippy::all)]

mod axes;
mod driver;
mod info;
mod shape;
mod standard;
pub mod traverse;

pub use axes::{select_axes, unit_strides};
pub use driver::Offsets;
pub use info::LoopInfo;
pub use shape::{allocate_result, resolve, Compress, ResolvedShape, ShapeDirectives};
pub use standard::{standard_loop, LoopRequest, LoopResult, StandardLoop};

use bitflags::bitflags;
use lux_value::ValueError;

/// Order in which the rearranged axes of a loop are visited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TraversalOrder {
    /// The current axis first, the other axes in their original order.
    /// Every coordinate stays individually accessible.
    #[default]
    EachCoord,
    /// The current axis first; the axes before and after it are each
    /// fused into one axis. Only the coordinate along the current axis is
    /// meaningful.
    AxisCoord,
    /// All selected axes in the order given, then the unselected axes in
    /// ascending order. Used for multi-axis reductions.
    AxisBlock,
}

/// How much of the loop the caller walks between calls to
/// [`LoopInfo::advance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// The driver advances one element at a time.
    #[default]
    Element,
    /// The caller walks rearranged axis 0 itself; the driver advances
    /// one row at a time.
    Row,
    /// The caller walks the whole block of selected axes (in
    /// [`TraversalOrder::AxisBlock`]; otherwise the same as `Row`).
    Block,
}

/// Traversal policy of a loop: the axis order plus the advance granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LoopMode {
    /// Order of the rearranged axes.
    pub order: TraversalOrder,
    /// Advance granularity.
    pub granularity: Granularity,
}

impl LoopMode {
    /// Creates a mode with element granularity.
    #[must_use]
    pub const fn new(order: TraversalOrder) -> Self {
        Self {
            order,
            granularity: Granularity::Element,
        }
    }

    /// Returns this mode with a different granularity.
    #[must_use]
    pub const fn with_granularity(self, granularity: Granularity) -> Self {
        Self {
            order: self.order,
            granularity,
        }
    }
}

bitflags! {
    /// Flags controlling axis selection, result shape and result type.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LoopFlags: u32 {
        /// Select all axes when none are given.
        const ALL_AXES = 1 << 0;
        /// Treat the data as one-dimensional regardless of the axes given.
        const TREAT_AS_1D = 1 << 1;
        /// A negative axis selects the whole array as one axis.
        const NEGATIVE_MEANS_1D = 1 << 2;
        /// At most one axis may be given.
        const ONLY_ONE_AXIS = 1 << 3;
        /// No axis may be given twice.
        const UNIQUE_AXES = 1 << 4;
        /// Convert the source to the output type first if it is narrower.
        const SOURCE_UPGRADE = 1 << 5;
        /// The result type is the wider of the output and source types.
        const UPGRADE = 1 << 6;
        /// The result type equals the source type.
        const KEEP_TYPE = 1 << 7;
        /// Remove the first selected axis from the result.
        const COMPRESS = 1 << 8;
        /// Remove all selected axes from the result.
        const COMPRESS_ALL = 1 << 9;
        /// Keep removed axes in the result with size 1.
        const ONE_DIMS = 1 << 10;
    }
}

impl Default for LoopFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Invalid axis specifications.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AxisError {
    /// An axis outside `0..ndim`.
    #[error("axis {axis} is out of range for {ndim} dimension(s)")]
    OutOfRange {
        /// The axis given.
        axis: i64,
        /// Number of dimensions of the data.
        ndim: usize,
    },

    /// An axis given more than once where axes must be unique.
    #[error("axis {axis} is specified more than once")]
    Duplicate {
        /// The repeated axis.
        axis: usize,
    },

    /// More axes than allowed.
    #[error("{count} axes specified but at most {max} allowed")]
    TooMany {
        /// Number of axes given.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },
}

/// Invalid shapes and shape transformations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// A reduction factor that does not divide the dimension.
    #[error("dimension {size} of axis {axis} is not divisible by {factor}")]
    NotDivisible {
        /// Axis being reduced.
        axis: usize,
        /// Its size.
        size: usize,
        /// The reduction factor.
        factor: usize,
    },

    /// A reduction factor of zero.
    #[error("reduction factor for axis {axis} is zero")]
    ZeroFactor {
        /// Axis being reduced.
        axis: usize,
    },

    /// More reduction factors than selected axes.
    #[error("{factors} reduction factors given for {axes} selected axes")]
    TooManyFactors {
        /// Number of factors.
        factors: usize,
        /// Number of selected axes.
        axes: usize,
    },

    /// A shape with more dimensions than supported.
    #[error("{rank} dimensions exceed the maximum of {max}", max = lux_types::MAX_DIMS)]
    TooManyDims {
        /// The rank that would result.
        rank: usize,
    },

    /// An empty dimension list or a zero-sized dimension.
    #[error("invalid dimensions {dims:?}")]
    InvalidDims {
        /// The dimensions given.
        dims: Vec<usize>,
    },

    /// Two loops walked in lock-step visit different numbers of elements.
    #[error("source loop visits {source_count} elements but result loop visits {result_count}")]
    CountMismatch {
        /// Elements in the source loop.
        source_count: usize,
        /// Elements in the result loop.
        result_count: usize,
    },

    /// Storage too small for the loop's dimensions.
    #[error("loop needs {required} elements but the buffer holds {available}")]
    BufferTooSmall {
        /// Elements needed from the buffer start.
        required: usize,
        /// Elements available.
        available: usize,
    },
}

/// Any failure while setting up a loop.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    /// Invalid axes.
    #[error(transparent)]
    Axis(#[from] AxisError),
    /// Invalid shape.
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// Value inspection, conversion or allocation failed.
    #[error(transparent)]
    Value(#[from] ValueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults() {
        let mode = LoopMode::default();
        assert_eq!(mode.order, TraversalOrder::EachCoord);
        assert_eq!(mode.granularity, Granularity::Element);
        let row = LoopMode::new(TraversalOrder::AxisCoord).with_granularity(Granularity::Row);
        assert_eq!(row.order, TraversalOrder::AxisCoord);
        assert_eq!(row.granularity, Granularity::Row);
    }

    #[test]
    fn test_error_messages() {
        let err = ShapeError::NotDivisible {
            axis: 1,
            size: 6,
            factor: 5,
        };
        assert_eq!(err.to_string(), "dimension 6 of axis 1 is not divisible by 5");
        let err: LoopError = AxisError::Duplicate { axis: 2 }.into();
        assert_eq!(err.to_string(), "axis 2 is specified more than once");
    }
}
