//! Axis selection and dimension rearrangement.

use lux_types::{element_count, Dims};
use smallvec::{smallvec, SmallVec};
use tracing::trace;

use crate::{AxisError, LoopFlags, TraversalOrder};

/// Validates a requested axis list against an array of rank `ndim`.
///
/// An empty result means "the whole array as a single fused axis".
///
/// # Errors
///
/// Returns [`AxisError::OutOfRange`] for an axis outside `0..ndim`,
/// [`AxisError::Duplicate`] for a repeated axis when uniqueness is
/// required ([`LoopFlags::UNIQUE_AXES`] or [`TraversalOrder::AxisBlock`])
/// and [`AxisError::TooMany`] when more axes are given than allowed.
pub fn select_axes(
    ndim: usize,
    requested: &[i64],
    flags: LoopFlags,
    order: TraversalOrder,
) -> Result<Dims, AxisError> {
    if flags.contains(LoopFlags::TREAT_AS_1D) {
        return Ok(Dims::new());
    }
    if requested.is_empty() {
        return Ok(if flags.contains(LoopFlags::ALL_AXES) {
            (0..ndim).collect()
        } else {
            Dims::new()
        });
    }
    if flags.contains(LoopFlags::NEGATIVE_MEANS_1D) && requested.iter().any(|&a| a < 0) {
        return Ok(Dims::new());
    }
    if flags.contains(LoopFlags::ONLY_ONE_AXIS) && requested.len() > 1 {
        return Err(AxisError::TooMany {
            count: requested.len(),
            max: 1,
        });
    }

    let mut axes = Dims::with_capacity(requested.len());
    for &axis in requested {
        match usize::try_from(axis) {
            Ok(a) if a < ndim => axes.push(a),
            _ => return Err(AxisError::OutOfRange { axis, ndim }),
        }
    }

    if flags.contains(LoopFlags::UNIQUE_AXES) || order == TraversalOrder::AxisBlock {
        check_unique(ndim, &axes)?;
    }
    if axes.len() > ndim {
        return Err(AxisError::TooMany {
            count: axes.len(),
            max: ndim,
        });
    }
    Ok(axes)
}

/// Checks already converted `axes` against an array of rank `ndim`: every
/// axis must be in range, and [`TraversalOrder::AxisBlock`] needs them
/// distinct.
///
/// # Errors
///
/// Returns [`AxisError::OutOfRange`] or [`AxisError::Duplicate`].
pub(crate) fn check_axes(
    ndim: usize,
    axes: &[usize],
    order: TraversalOrder,
) -> Result<(), AxisError> {
    if let Some(&axis) = axes.iter().find(|&&a| a >= ndim) {
        return Err(AxisError::OutOfRange {
            axis: i64::try_from(axis).unwrap_or(i64::MAX),
            ndim,
        });
    }
    if order == TraversalOrder::AxisBlock {
        check_unique(ndim, axes)?;
    }
    Ok(())
}

fn check_unique(ndim: usize, axes: &[usize]) -> Result<(), AxisError> {
    let mut seen: SmallVec<[bool; lux_types::MAX_DIMS]> = smallvec![false; ndim];
    for &a in axes {
        if std::mem::replace(&mut seen[a], true) {
            return Err(AxisError::Duplicate { axis: a });
        }
    }
    Ok(())
}

/// Element strides of a contiguous first-dimension-fastest array.
#[must_use]
pub fn unit_strides(dims: &[usize]) -> Dims {
    let mut stride = 1;
    dims.iter()
        .map(|&d| {
            let s = stride;
            stride *= d;
            s
        })
        .collect()
}

/// The traversal layout of one loop: which original axes make up each
/// rearranged axis, and its size and stride.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Rearrangement {
    /// Size of each rearranged axis.
    pub(crate) rdims: Dims,
    /// Element stride of each rearranged axis in the original storage.
    pub(crate) rstride: Dims,
    /// Original axes in rearranged order. Always a permutation of
    /// `0..ndim`; consecutive runs make up fused rearranged axes.
    pub(crate) raxes: Dims,
    /// Number of original axes fused into each rearranged axis.
    pub(crate) rextent: Dims,
}

impl Rearrangement {
    fn push(&mut self, dims: &[usize], unit: &[usize], group: &[usize]) {
        let Some(&first) = group.first() else {
            return;
        };
        self.rdims.push(group.iter().map(|&a| dims[a]).product());
        self.rstride.push(unit[first]);
        self.raxes.extend_from_slice(group);
        self.rextent.push(group.len());
    }
}

/// Computes the rearranged layout for traversing `dims` in `order`, with
/// `axes[axis_index]` as the current axis.
///
/// With no axes the whole array is a single rearranged axis of
/// `Π dims` elements.
/// `axes` must have passed [`check_axes`].
#[must_use]
pub(crate) fn rearrange(
    dims: &[usize],
    axes: &[usize],
    axis_index: usize,
    order: TraversalOrder,
) -> Rearrangement {
    let ndim = dims.len();
    let unit = unit_strides(dims);
    let mut r = Rearrangement {
        rdims: Dims::new(),
        rstride: Dims::new(),
        raxes: Dims::new(),
        rextent: Dims::new(),
    };

    let Some(&current) = axes.get(axis_index) else {
        r.rdims.push(element_count(dims));
        r.rstride.push(1);
        r.raxes.extend(0..ndim);
        r.rextent.push(ndim);
        return r;
    };

    match order {
        TraversalOrder::EachCoord => {
            r.push(dims, &unit, &[current]);
            for a in (0..ndim).filter(|&a| a != current) {
                r.push(dims, &unit, &[a]);
            }
        }
        TraversalOrder::AxisCoord => {
            let before: Dims = (0..current).collect();
            let after: Dims = (current + 1..ndim).collect();
            r.push(dims, &unit, &[current]);
            r.push(dims, &unit, &before);
            r.push(dims, &unit, &after);
        }
        TraversalOrder::AxisBlock => {
            for &a in axes {
                r.push(dims, &unit, &[a]);
            }
            for a in (0..ndim).filter(|a| !axes.contains(a)) {
                r.push(dims, &unit, &[a]);
            }
        }
    }

    trace!(?order, current, rdims = ?r.rdims, rstride = ?r.rstride, "rearranged");
    r
}
