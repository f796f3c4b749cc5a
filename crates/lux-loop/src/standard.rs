//! The standard loop: source loop, result allocation and result loop set
//! up in one validated step.

use std::borrow::Cow;

use lux_types::{combined_type, Dims, ElementType, MAX_DIMS};
use lux_value::{numerical_info, ArrayData, Value, ValueAllocator, ValueError};
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::shape::{allocate_result, resolve, Compress, ShapeDirectives};
use crate::{LoopError, LoopFlags, LoopInfo, LoopMode};

/// Parameters of [`standard_loop`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopRequest {
    axes: SmallVec<[i64; MAX_DIMS]>,
    flags: LoopFlags,
    mode: LoopMode,
    result_type: Option<ElementType>,
    reduce: Dims,
    add: Dims,
}

impl LoopRequest {
    /// Creates a request for a loop without a result.
    #[must_use]
    pub fn new(mode: LoopMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Sets the requested axes.
    #[must_use]
    pub fn axes(mut self, axes: &[i64]) -> Self {
        self.axes = SmallVec::from_slice(axes);
        self
    }

    /// Sets the flags.
    #[must_use]
    pub fn flags(mut self, flags: LoopFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Requests a result with output type `element_type`.
    #[must_use]
    pub fn with_result(mut self, element_type: ElementType) -> Self {
        self.result_type = Some(element_type);
        self
    }

    /// Divides the selected axes of the result by `factors`.
    #[must_use]
    pub fn reduce(mut self, factors: &[usize]) -> Self {
        self.reduce = Dims::from_slice(factors);
        self
    }

    /// Prepends `dims` to the result's dimensions.
    #[must_use]
    pub fn add(mut self, dims: &[usize]) -> Self {
        self.add = Dims::from_slice(dims);
        self
    }

    /// The shape directives implied by this request.
    #[must_use]
    pub fn directives(&self) -> ShapeDirectives {
        let compress = if self.flags.contains(LoopFlags::COMPRESS_ALL) {
            Compress::All
        } else if self.flags.contains(LoopFlags::COMPRESS) {
            Compress::First
        } else {
            Compress::None
        };
        ShapeDirectives {
            reduce: self.reduce.clone(),
            add: self.add.clone(),
            compress,
            keep_one_dims: self.flags.contains(LoopFlags::ONE_DIMS),
        }
    }

    fn result_type_for(&self, out: ElementType, source: ElementType) -> ElementType {
        if self.flags.contains(LoopFlags::KEEP_TYPE) {
            source
        } else if self.flags.contains(LoopFlags::UPGRADE) {
            combined_type(out, source)
        } else {
            out
        }
    }
}

/// A result value and the loop that walks it.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopResult {
    /// The allocated result.
    pub value: Value,
    /// Its loop, in lock-step with the source loop.
    pub info: LoopInfo,
}

/// A prepared source loop with an optional result.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardLoop<'v> {
    /// The source, converted if an upgrade was requested.
    pub source: Cow<'v, Value>,
    /// The source loop.
    pub src: LoopInfo,
    /// The result, if one was requested.
    pub result: Option<LoopResult>,
}

impl StandardLoop<'_> {
    /// Storage of the source.
    ///
    /// # Errors
    ///
    /// Never fails for a loop built by [`standard_loop`]; the source is
    /// always numerical.
    pub fn source_data(&self) -> Result<&ArrayData, ValueError> {
        self.source.data().ok_or(ValueError::NotNumerical {
            found: self.source.kind_name(),
        })
    }

    /// Moves both loops to the next selected axis. Returns `false` once
    /// all axes have been visited.
    pub fn next_axis(&mut self) -> bool {
        if !self.src.next_axis() {
            return false;
        }
        if let Some(result) = &mut self.result {
            result.info.select_axis(self.src.axis_index());
        }
        true
    }

    /// Consumes the loop, returning the result value.
    #[must_use]
    pub fn into_result(self) -> Option<Value> {
        self.result.map(|r| r.value)
    }
}

/// Prepares a source loop and, if requested, an appropriately shaped and
/// typed result with its own loop.
///
/// Every check (source kind, axes, result shape) happens before anything
/// is converted or allocated, so a failure leaves nothing behind.
///
/// # Errors
///
/// Returns [`ValueError::NotNumerical`] for undefined and string sources,
/// an [`AxisError`](crate::AxisError) for invalid axes, a
/// [`ShapeError`](crate::ShapeError) for invalid result-shape directives
/// and propagates conversion and allocation failures.
#[instrument(level = "debug", skip_all, fields(mode = ?request.mode))]
pub fn standard_loop<'v, A>(
    source: &'v Value,
    request: &LoopRequest,
    allocator: &A,
) -> Result<StandardLoop<'v>, LoopError>
where
    A: ValueAllocator + ?Sized,
{
    if source.is_string() {
        return Err(ValueError::NotNumerical { found: "string" }.into());
    }
    let info = numerical_info(source)?;
    let mut src = LoopInfo::new(
        info.element_type,
        &info.dims,
        &request.axes,
        request.flags,
        request.mode,
    )?;
    src.check_buffer(info.element_count())?;

    let resolved = match request.result_type {
        Some(_) => Some(resolve(src.dims(), src.axes(), &request.directives())?),
        None => None,
    };

    let mut source = Cow::Borrowed(source);
    if let (Some(out), true) = (
        request.result_type,
        request.flags.contains(LoopFlags::SOURCE_UPGRADE),
    ) {
        let target = combined_type(src.element_type, out);
        if target != src.element_type {
            debug!(from = %src.element_type, to = %target, "upgrading source");
            source = Cow::Owned(allocator.convert(&source, target)?);
            src.element_type = target;
        }
    }

    let result = match (request.result_type, resolved) {
        (Some(out), Some(resolved)) => {
            let element_type = request.result_type_for(out, src.element_type);
            let value = allocate_result(&resolved, element_type, allocator)?;
            let info = LoopInfo::with_axes(
                element_type,
                &resolved.loop_dims,
                &resolved.axes,
                request.mode,
            )?;
            debug!(%element_type, dims = ?resolved.dims, "allocated result");
            Some(LoopResult { value, info })
        }
        _ => None,
    };

    Ok(StandardLoop {
        source,
        src,
        result,
    })
}
