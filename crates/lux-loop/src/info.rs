//! Per-operand traversal state.

use lux_types::{check_rank, checked_element_count, element_count, Dims, ElementType, MAX_DIMS};
use lux_value::{numerical_info, Value};
use smallvec::{smallvec, SmallVec};
use tracing::trace;

use crate::axes::{check_axes, rearrange, select_axes};
use crate::{Granularity, LoopError, LoopFlags, LoopMode, ShapeError, TraversalOrder};

/// Per-axis step table: one entry per rearranged axis plus a trailing
/// entry applied when the outermost axis wraps.
pub(crate) type Steps = SmallVec<[isize; MAX_DIMS + 1]>;

/// Traversal state for one operand of a vectorized operation.
///
/// A `LoopInfo` describes the operand's shape, the selected axes, the
/// rearranged view used for traversal and the current position. The
/// cursor is an element offset into the operand's storage and always
/// satisfies
///
/// ```text
/// cursor == origin + Σ coords[i] * rstride[i]
/// ```
///
/// The driver methods ([`advance`](Self::advance),
/// [`advance_by`](Self::advance_by)) are in the `driver` module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopInfo {
    pub(crate) element_type: ElementType,
    pub(crate) dims: Dims,
    pub(crate) axes: Dims,
    pub(crate) axis_index: usize,
    pub(crate) mode: LoopMode,
    pub(crate) rdims: Dims,
    pub(crate) rstride: Dims,
    pub(crate) raxes: Dims,
    pub(crate) iraxes: Dims,
    pub(crate) rextent: Dims,
    pub(crate) coords: Dims,
    pub(crate) step: Steps,
    pub(crate) boundary: usize,
    pub(crate) origin: usize,
    pub(crate) cursor: usize,
}

impl LoopInfo {
    /// Creates a loop over `dims` with zero-based `axes`, positioned at the
    /// first selected axis and at storage offset 0.
    ///
    /// Unlike [`new`](Self::new) no selection flags apply: the axes are
    /// used as given once they are in range (and distinct, for
    /// [`TraversalOrder::AxisBlock`]).
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidDims`] for an empty dimension list, a
    /// zero-sized dimension or an element count that overflows,
    /// [`ShapeError::TooManyDims`] for more than [`MAX_DIMS`] dimensions and
    /// an [`AxisError`](crate::AxisError) for invalid axes.
    pub fn with_axes(
        element_type: ElementType,
        dims: &[usize],
        axes: &[usize],
        mode: LoopMode,
    ) -> Result<Self, LoopError> {
        if dims.is_empty() || dims.contains(&0) || checked_element_count(dims).is_none() {
            return Err(ShapeError::InvalidDims {
                dims: dims.to_vec(),
            }
            .into());
        }
        check_rank(dims.len()).map_err(|e| ShapeError::TooManyDims { rank: e.rank })?;
        check_axes(dims.len(), axes, mode.order)?;

        let mut info = Self {
            element_type,
            dims: Dims::from_slice(dims),
            axes: Dims::from_slice(axes),
            axis_index: 0,
            mode,
            rdims: Dims::new(),
            rstride: Dims::new(),
            raxes: Dims::new(),
            iraxes: Dims::new(),
            rextent: Dims::new(),
            coords: Dims::new(),
            step: Steps::new(),
            boundary: 0,
            origin: 0,
            cursor: 0,
        };
        info.setup_rearrangement();
        Ok(info)
    }

    /// Creates a loop over `dims`, validating the requested axes.
    ///
    /// # Errors
    ///
    /// Returns an [`AxisError`](crate::AxisError) for invalid axes and a
    /// [`ShapeError`] for invalid dimensions.
    pub fn new(
        element_type: ElementType,
        dims: &[usize],
        requested: &[i64],
        flags: LoopFlags,
        mode: LoopMode,
    ) -> Result<Self, LoopError> {
        let axes = select_axes(dims.len(), requested, flags, mode.order)?;
        Self::with_axes(element_type, dims, &axes, mode)
    }

    /// Creates a loop over the elements of `value`.
    ///
    /// # Errors
    ///
    /// Fails for undefined values and invalid axes.
    pub fn for_value(
        value: &Value,
        requested: &[i64],
        flags: LoopFlags,
        mode: LoopMode,
    ) -> Result<Self, LoopError> {
        let info = numerical_info(value)?;
        let this = Self::new(info.element_type, &info.dims, requested, flags, mode)?;
        this.check_buffer(info.element_count())?;
        Ok(this)
    }

    /// Moves the loop to a window starting at element `origin` of a buffer
    /// holding `buffer_len` elements, and rewinds it.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::BufferTooSmall`] if the window does not fit.
    pub fn with_origin(mut self, origin: usize, buffer_len: usize) -> Result<Self, ShapeError> {
        self.origin = origin;
        self.check_buffer(buffer_len)?;
        self.rewind();
        Ok(self)
    }

    /// Checks that a buffer of `len` elements covers every offset the loop
    /// can produce.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::BufferTooSmall`] otherwise.
    pub fn check_buffer(&self, len: usize) -> Result<(), ShapeError> {
        let required = self.origin.checked_add(self.element_count());
        if required.map_or(true, |required| len < required) {
            return Err(ShapeError::BufferTooSmall {
                required: self.required_len(),
                available: len,
            });
        }
        Ok(())
    }

    /// Number of buffer elements the loop touches, counted from offset 0.
    /// Saturates at `usize::MAX`.
    #[must_use]
    pub fn required_len(&self) -> usize {
        self.origin.saturating_add(self.element_count())
    }

    /// Makes `axes[index]` the current axis and rewinds.
    ///
    /// Only the orders that single out one axis rebuild their layout;
    /// [`TraversalOrder::AxisBlock`] is independent of the current axis.
    /// Returns `false` (and changes nothing) if `index` is out of range.
    pub fn select_axis(&mut self, index: usize) -> bool {
        if index >= self.axes.len().max(1) {
            return false;
        }
        self.axis_index = index;
        self.setup_rearrangement();
        true
    }

    /// Moves to the next selected axis. Returns `false` once all axes
    /// have been visited, leaving the loop on the last axis.
    pub fn next_axis(&mut self) -> bool {
        self.select_axis(self.axis_index + 1)
    }

    /// Rewinds to the first element without changing the layout.
    pub fn rewind(&mut self) {
        self.coords.iter_mut().for_each(|c| *c = 0);
        self.cursor = self.origin;
    }

    fn setup_rearrangement(&mut self) {
        let r = rearrange(&self.dims, &self.axes, self.axis_index, self.mode.order);
        let rndim = r.rdims.len();

        let mut iraxes: Dims = smallvec![0; r.raxes.len()];
        for (pos, &axis) in r.raxes.iter().enumerate() {
            iraxes[axis] = pos;
        }

        self.boundary = match self.mode.granularity {
            Granularity::Element => 0,
            Granularity::Row => 1,
            Granularity::Block if self.mode.order == TraversalOrder::AxisBlock => {
                self.axes.len().max(1)
            }
            Granularity::Block => 1,
        }
        .min(rndim);
        self.step = compute_steps(&r.rdims, &r.rstride, self.boundary);
        self.coords = smallvec![0; rndim];
        self.rdims = r.rdims;
        self.rstride = r.rstride;
        self.raxes = r.raxes;
        self.iraxes = iraxes;
        self.rextent = r.rextent;
        self.cursor = self.origin;
        trace!(rdims = ?self.rdims, step = ?self.step, boundary = self.boundary, "loop set up");
    }

    /// Element type of the operand.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Original dimensions.
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of original dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements, `Π dims`.
    #[must_use]
    pub fn element_count(&self) -> usize {
        element_count(&self.dims)
    }

    /// Selected axes. Empty means the whole array is one axis.
    #[must_use]
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    /// Index of the current axis within [`axes`](Self::axes).
    #[must_use]
    pub fn axis_index(&self) -> usize {
        self.axis_index
    }

    /// The current original axis, if any axes are selected.
    #[must_use]
    pub fn current_axis(&self) -> Option<usize> {
        self.axes.get(self.axis_index).copied()
    }

    /// Traversal mode.
    #[must_use]
    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    /// Number of rearranged axes.
    #[must_use]
    pub fn rndim(&self) -> usize {
        self.rdims.len()
    }

    /// Sizes of the rearranged axes.
    #[must_use]
    pub fn rdims(&self) -> &[usize] {
        &self.rdims
    }

    /// Element strides of the rearranged axes.
    #[must_use]
    pub fn rstride(&self) -> &[usize] {
        &self.rstride
    }

    /// Original axes in rearranged order.
    #[must_use]
    pub fn raxes(&self) -> &[usize] {
        &self.raxes
    }

    /// Position of each original axis within [`raxes`](Self::raxes).
    #[must_use]
    pub fn iraxes(&self) -> &[usize] {
        &self.iraxes
    }

    /// Current coordinates along the rearranged axes.
    #[must_use]
    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    /// Mutable access to the coordinates of the axes below the boundary,
    /// which the caller walks itself. The cursor is not updated.
    pub fn unmanaged_coords_mut(&mut self) -> &mut [usize] {
        &mut self.coords[..self.boundary]
    }

    /// Displacement applied when each rearranged axis advances, already
    /// corrected for the wrap of the axis below it. The extra last entry
    /// returns the cursor to the origin when the outermost axis wraps.
    #[must_use]
    pub fn steps(&self) -> &[isize] {
        &self.step
    }

    /// Number of leading rearranged axes the caller walks itself.
    #[must_use]
    pub fn boundary(&self) -> usize {
        self.boundary
    }

    /// Storage offset of the first element.
    #[must_use]
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Storage offset of the current element.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Coordinates of the current element along the original axes.
    ///
    /// Fused rearranged axes are expanded, their original axes varying
    /// first-fastest.
    #[must_use]
    pub fn original_coords(&self) -> Dims {
        let mut out: Dims = smallvec![0; self.dims.len()];
        let mut pos = 0;
        for (&coord, &extent) in self.coords.iter().zip(&self.rextent) {
            let mut rest = coord;
            for &axis in &self.raxes[pos..pos + extent] {
                out[axis] = rest % self.dims[axis];
                rest /= self.dims[axis];
            }
            pos += extent;
        }
        out
    }
}

/// Computes per-axis steps for a traversal that manages the rearranged
/// axes from `boundary` up.
pub(crate) fn compute_steps(rdims: &[usize], rstride: &[usize], boundary: usize) -> Steps {
    let rndim = rdims.len();
    let mut step: Steps = smallvec![0; rndim + 1];
    for i in boundary..rndim {
        let below = if i > boundary {
            rstride[i - 1] * rdims[i - 1]
        } else {
            0
        };
        step[i] = rstride[i] as isize - below as isize;
    }
    if boundary < rndim {
        step[rndim] = -((rstride[rndim - 1] * rdims[rndim - 1]) as isize);
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AxisError;

    fn each(dims: &[usize], axes: &[usize]) -> LoopInfo {
        LoopInfo::with_axes(
            ElementType::Long,
            dims,
            axes,
            LoopMode::new(TraversalOrder::EachCoord),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_dims() {
        let mode = LoopMode::default();
        assert!(matches!(
            LoopInfo::with_axes(ElementType::Byte, &[], &[], mode),
            Err(LoopError::Shape(ShapeError::InvalidDims { .. }))
        ));
        assert!(matches!(
            LoopInfo::with_axes(ElementType::Byte, &[3, 0], &[], mode),
            Err(LoopError::Shape(ShapeError::InvalidDims { .. }))
        ));
        assert_eq!(
            LoopInfo::with_axes(ElementType::Byte, &[1; 9], &[], mode),
            Err(LoopError::Shape(ShapeError::TooManyDims { rank: 9 }))
        );
        assert!(matches!(
            LoopInfo::with_axes(ElementType::Byte, &[1 << 32, 1 << 32, 1 << 32], &[0], mode),
            Err(LoopError::Shape(ShapeError::InvalidDims { .. }))
        ));
    }

    #[test]
    fn test_invalid_axes() {
        assert_eq!(
            LoopInfo::with_axes(ElementType::Byte, &[4], &[1], LoopMode::default()),
            Err(LoopError::Axis(AxisError::OutOfRange { axis: 1, ndim: 1 }))
        );
        assert_eq!(
            LoopInfo::with_axes(
                ElementType::Byte,
                &[2, 3],
                &[0, 0],
                LoopMode::new(TraversalOrder::AxisBlock)
            ),
            Err(LoopError::Axis(AxisError::Duplicate { axis: 0 }))
        );
        let repeated = LoopInfo::with_axes(
            ElementType::Byte,
            &[2, 3],
            &[1, 1],
            LoopMode::new(TraversalOrder::EachCoord),
        )
        .unwrap();
        assert_eq!(repeated.raxes(), &[1, 0]);
    }

    #[test]
    fn test_each_coord_layout() {
        let info = each(&[4, 5, 6], &[1]);
        assert_eq!(info.rdims(), &[5, 4, 6]);
        assert_eq!(info.rstride(), &[4, 1, 20]);
        assert_eq!(info.raxes(), &[1, 0, 2]);
        assert_eq!(info.iraxes(), &[1, 0, 2]);
        assert_eq!(info.steps(), &[4, -19, 16, -120]);
        assert_eq!(info.cursor(), 0);
    }

    #[test]
    fn test_steps_with_boundary() {
        let steps = compute_steps(&[5, 4, 6], &[4, 1, 20], 1);
        assert_eq!(steps.as_slice(), &[0, 1, 16, -120]);
        let steps = compute_steps(&[7], &[1], 1);
        assert_eq!(steps.as_slice(), &[0, 0]);
    }

    #[test]
    fn test_select_and_next_axis() {
        let mut info = each(&[4, 5, 6], &[0, 2]);
        assert_eq!(info.current_axis(), Some(0));
        assert_eq!(info.rdims(), &[4, 5, 6]);
        assert!(info.next_axis());
        assert_eq!(info.current_axis(), Some(2));
        assert_eq!(info.rdims(), &[6, 4, 5]);
        assert!(!info.next_axis());
        assert_eq!(info.current_axis(), Some(2));
        assert!(info.select_axis(0));
        assert_eq!(info.rdims(), &[4, 5, 6]);
    }

    #[test]
    fn test_original_coords_fused() {
        let mut info = LoopInfo::with_axes(
            ElementType::Double,
            &[2, 3, 4],
            &[1],
            LoopMode::new(TraversalOrder::AxisCoord),
        )
        .unwrap();
        assert_eq!(info.rdims(), &[3, 2, 4]);
        info.coords = smallvec![2, 1, 3];
        assert_eq!(info.original_coords().as_slice(), &[1, 2, 3]);

        let mut whole = each(&[2, 3, 4], &[]);
        whole.coords = smallvec![2 + 3 * 2];
        assert_eq!(whole.original_coords().as_slice(), &[0, 1, 1]);
    }

    #[test]
    fn test_window() {
        let info = each(&[2, 2], &[0]).with_origin(3, 7).unwrap();
        assert_eq!(info.cursor(), 3);
        assert_eq!(info.required_len(), 7);
        assert_eq!(
            each(&[2, 2], &[0]).with_origin(4, 7),
            Err(ShapeError::BufferTooSmall {
                required: 8,
                available: 7
            })
        );
        assert_eq!(
            each(&[2, 2], &[0]).with_origin(usize::MAX, usize::MAX),
            Err(ShapeError::BufferTooSmall {
                required: usize::MAX,
                available: usize::MAX
            })
        );
    }

    #[test]
    fn test_for_value() {
        let value = Value::array(&[3, 2], vec![1i32, 2, 3, 4, 5, 6]).unwrap();
        let info = LoopInfo::for_value(&value, &[1], LoopFlags::empty(), LoopMode::default()).unwrap();
        assert_eq!(info.element_type(), ElementType::Long);
        assert_eq!(info.rdims(), &[2, 3]);
        assert!(matches!(
            LoopInfo::for_value(&Value::Undefined, &[], LoopFlags::empty(), LoopMode::default()),
            Err(LoopError::Value(_))
        ));
    }
}
