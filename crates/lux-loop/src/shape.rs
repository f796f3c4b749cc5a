//! Result-shape resolution.
//!
//! A vectorized operation describes its result relative to the source:
//! selected axes may be divided by a factor ([`ShapeDirectives::reduce`]),
//! new leading dimensions may be prepended ([`ShapeDirectives::add`]) or
//! selected axes may be removed ([`ShapeDirectives::compress`]). The
//! resolver turns these into two shapes:
//!
//! - the *allocated* shape, with removed axes dropped (or kept as 1 when
//!   [`ShapeDirectives::keep_one_dims`] is set); empty means a scalar
//! - the *loop* shape, of the same rank as the source plus added
//!   dimensions, with removed axes set to 1, so a result loop can walk
//!   in lock-step with the source loop

use lux_types::{checked_element_count, Dims, ElementType, MAX_DIMS};
use lux_value::{Value, ValueAllocator, ValueError};
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::ShapeError;

/// Which selected axes to remove from the result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compress {
    /// Keep every axis.
    #[default]
    None,
    /// Remove the first selected axis.
    First,
    /// Remove all selected axes.
    All,
}

/// How a result's shape derives from its source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapeDirectives {
    /// Per-axis divisors, applied to the selected axes in order.
    pub reduce: Dims,
    /// Sizes of dimensions to prepend.
    pub add: Dims,
    /// Axis removal. Ignored when `reduce` or `add` is non-empty.
    pub compress: Compress,
    /// Keep removed axes in the allocated shape with size 1.
    pub keep_one_dims: bool,
}

/// Outcome of [`resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedShape {
    /// Shape to allocate. Empty means a scalar.
    pub dims: Dims,
    /// Shape for the result loop, with removed axes set to 1.
    pub loop_dims: Dims,
    /// Selected axes in the result loop.
    pub axes: Dims,
}

impl ResolvedShape {
    /// Whether the result is a scalar.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

/// Resolves the result shape for a source of shape `dims` with selected
/// `axes` (already validated).
///
/// # Errors
///
/// Returns [`ShapeError::TooManyFactors`], [`ShapeError::ZeroFactor`] or
/// [`ShapeError::NotDivisible`] for invalid reductions, and
/// [`ShapeError::TooManyDims`] or [`ShapeError::InvalidDims`] for invalid
/// additions, including ones whose element count overflows.
pub fn resolve(
    dims: &[usize],
    axes: &[usize],
    directives: &ShapeDirectives,
) -> Result<ResolvedShape, ShapeError> {
    let mut loop_dims = Dims::from_slice(dims);
    let mut axes = Dims::from_slice(axes);
    let mut removed: SmallVec<[bool; MAX_DIMS]> = smallvec![false; dims.len()];

    if !directives.reduce.is_empty() {
        if directives.reduce.len() > axes.len() {
            return Err(ShapeError::TooManyFactors {
                factors: directives.reduce.len(),
                axes: axes.len(),
            });
        }
        for (&factor, &axis) in directives.reduce.iter().zip(&axes) {
            if factor == 0 {
                return Err(ShapeError::ZeroFactor { axis });
            }
            let size = loop_dims[axis];
            if size % factor != 0 {
                return Err(ShapeError::NotDivisible { axis, size, factor });
            }
            loop_dims[axis] = size / factor;
            if loop_dims[axis] == 1 && factor > 1 {
                removed[axis] = true;
            }
        }
    }

    if !directives.add.is_empty() {
        let added = directives.add.len();
        let rank = added + loop_dims.len();
        if rank > MAX_DIMS {
            return Err(ShapeError::TooManyDims { rank });
        }
        if directives.add.contains(&0) {
            return Err(ShapeError::InvalidDims {
                dims: directives.add.to_vec(),
            });
        }
        loop_dims.insert_from_slice(0, &directives.add);
        if checked_element_count(&loop_dims).is_none() {
            return Err(ShapeError::InvalidDims {
                dims: loop_dims.to_vec(),
            });
        }
        removed.insert_many(0, std::iter::repeat(false).take(added));
        axes = (0..added).chain(axes.iter().map(|&a| a + added)).collect();
    }

    if directives.reduce.is_empty() && directives.add.is_empty() {
        let targets: Dims = match directives.compress {
            Compress::None => Dims::new(),
            Compress::First => match axes.first() {
                Some(&a) => smallvec![a],
                None => (0..loop_dims.len()).collect(),
            },
            Compress::All if axes.is_empty() => (0..loop_dims.len()).collect(),
            Compress::All => axes.clone(),
        };
        for a in targets {
            loop_dims[a] = 1;
            removed[a] = true;
        }
    }

    let result_dims: Dims = if directives.keep_one_dims {
        loop_dims.clone()
    } else {
        loop_dims
            .iter()
            .zip(&removed)
            .filter_map(|(&d, &r)| (!r).then_some(d))
            .collect()
    };

    debug!(source = ?dims, result = ?result_dims, loop_dims = ?loop_dims, "resolved result shape");
    Ok(ResolvedShape {
        dims: result_dims,
        loop_dims,
        axes,
    })
}

/// Allocates a zero-filled result of the resolved shape: a scalar when
/// the shape is empty, an array otherwise.
///
/// # Errors
///
/// Propagates allocator failures.
pub fn allocate_result(
    resolved: &ResolvedShape,
    element_type: ElementType,
    allocator: &(impl ValueAllocator + ?Sized),
) -> Result<Value, ValueError> {
    if resolved.is_scalar() {
        allocator.allocate_scalar(element_type)
    } else {
        allocator.allocate_array(element_type, &resolved.dims)
    }
}
