//! Typed traversal helpers built on [`LoopInfo`].
//!
//! These drive a loop from its start to its end and hand each element to
//! a closure. They expect [`Granularity::Element`](crate::Granularity);
//! with a coarser granularity only the first element of each row or block
//! is visited.
//!
//! ```
//! use lux_loop::{traverse, LoopInfo, LoopMode};
//! use lux_types::ElementType;
//!
//! let data = [1, 2, 3, 4, 5, 6];
//! let mut info = LoopInfo::with_axes(ElementType::Long, &[2, 3], &[1], LoopMode::default())?;
//! assert_eq!(traverse::gather(&mut info, &data)?, vec![1, 3, 5, 2, 4, 6]);
//! # Ok::<(), lux_loop::LoopError>(())
//! ```

use crate::{LoopInfo, ShapeError};

/// Calls `f` with every element of `data` in traversal order.
///
/// # Errors
///
/// Returns [`ShapeError::BufferTooSmall`] if `data` does not cover the
/// loop.
pub fn for_each<T>(info: &mut LoopInfo, data: &[T], mut f: impl FnMut(&T)) -> Result<(), ShapeError> {
    info.check_buffer(data.len())?;
    info.rewind();
    loop {
        f(&data[info.cursor()]);
        if info.advance() >= info.rndim() {
            return Ok(());
        }
    }
}

/// Copies the elements of `data` in traversal order.
///
/// # Errors
///
/// Returns [`ShapeError::BufferTooSmall`] if `data` does not cover the
/// loop.
pub fn gather<T: Clone>(info: &mut LoopInfo, data: &[T]) -> Result<Vec<T>, ShapeError> {
    let mut out = Vec::with_capacity(info.element_count());
    for_each(info, data, |x| out.push(x.clone()))?;
    Ok(out)
}

/// Walks two loops of equal element count in lock-step, storing
/// `f(source element)` at each result position.
///
/// # Errors
///
/// Returns [`ShapeError::CountMismatch`] if the loops differ in size and
/// [`ShapeError::BufferTooSmall`] if a buffer does not cover its loop.
pub fn map_into<S, D>(
    src: &mut LoopInfo,
    src_data: &[S],
    dst: &mut LoopInfo,
    dst_data: &mut [D],
    mut f: impl FnMut(&S) -> D,
) -> Result<(), ShapeError> {
    check_pair(src, src_data.len(), dst, dst_data.len(), src.element_count())?;
    src.rewind();
    dst.rewind();
    loop {
        dst_data[dst.cursor()] = f(&src_data[src.cursor()]);
        dst.advance();
        if src.advance() >= src.rndim() {
            return Ok(());
        }
    }
}

/// Folds the source along its first `inner` rearranged axes, storing one
/// accumulated value per result element.
///
/// The result loop must have the source's layout with the folded axes
/// set to size 1, as produced by [`resolve`](crate::resolve) with
/// [`Compress::First`](crate::Compress::First) (`inner == 1`) or, in
/// [`TraversalOrder::AxisBlock`](crate::TraversalOrder::AxisBlock),
/// [`Compress::All`](crate::Compress::All) (`inner == naxes`).
///
/// # Errors
///
/// Returns [`ShapeError::CountMismatch`] if the result does not have one
/// element per folded group and [`ShapeError::BufferTooSmall`] if a
/// buffer does not cover its loop.
pub fn fold_axes<S, D: Clone>(
    src: &mut LoopInfo,
    src_data: &[S],
    dst: &mut LoopInfo,
    dst_data: &mut [D],
    inner: usize,
    init: D,
    mut f: impl FnMut(D, &S) -> D,
) -> Result<(), ShapeError> {
    let inner = inner.clamp(1, src.rndim());
    let group: usize = src.rdims()[..inner].iter().product();
    check_pair(
        src,
        src_data.len(),
        dst,
        dst_data.len(),
        src.element_count() / group,
    )?;
    src.rewind();
    dst.rewind();
    loop {
        let mut acc = init.clone();
        loop {
            acc = f(acc, &src_data[src.cursor()]);
            if src.advance() >= inner {
                break;
            }
        }
        dst_data[dst.cursor()] = acc;
        if dst.advance() >= dst.rndim() {
            return Ok(());
        }
    }
}

fn check_pair(
    src: &LoopInfo,
    src_len: usize,
    dst: &LoopInfo,
    dst_len: usize,
    expected: usize,
) -> Result<(), ShapeError> {
    if dst.element_count() != expected {
        return Err(ShapeError::CountMismatch {
            source_count: expected,
            result_count: dst.element_count(),
        });
    }
    src.check_buffer(src_len)?;
    dst.check_buffer(dst_len)
}
