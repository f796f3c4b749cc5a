//! The allocation seam between the loop machinery and the interpreter's
//! value store.

use lux_types::ElementType;
use tracing::debug;

use crate::{validate_dims, Array, Scalar, Value, ValueError};

/// Creates values on behalf of the loop machinery.
///
/// The interpreter decides where values live and how they are shared;
/// loop code only asks for a value of a given type and shape.
pub trait ValueAllocator {
    /// Allocates a zero-filled array.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Allocation`] if storage cannot be provided,
    /// or [`ValueError::InvalidShape`] for invalid dimensions.
    fn allocate_array(&self, element_type: ElementType, dims: &[usize])
        -> Result<Value, ValueError>;

    /// Allocates a zero scalar.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Allocation`] if storage cannot be provided.
    fn allocate_scalar(&self, element_type: ElementType) -> Result<Value, ValueError>;

    /// Returns `value` converted to `element_type`. The conversion either
    /// completes or leaves no trace.
    ///
    /// # Errors
    ///
    /// Propagates conversion and allocation failures.
    fn convert(&self, value: &Value, element_type: ElementType) -> Result<Value, ValueError> {
        value.convert(element_type)
    }
}

/// Allocates values on the Rust heap, optionally refusing requests above
/// an element limit.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator {
    limit: Option<usize>,
}

impl HeapAllocator {
    /// Creates an allocator without a limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that refuses requests for more than `limit`
    /// elements.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }

    fn check(&self, element_type: ElementType, elements: usize) -> Result<(), ValueError> {
        match self.limit {
            Some(limit) if elements > limit => {
                debug!(%element_type, elements, limit, "allocation refused");
                Err(ValueError::Allocation {
                    element_type,
                    elements,
                    reason: format!("limit is {limit} elements"),
                })
            }
            _ => Ok(()),
        }
    }
}

impl ValueAllocator for HeapAllocator {
    fn allocate_array(
        &self,
        element_type: ElementType,
        dims: &[usize],
    ) -> Result<Value, ValueError> {
        self.check(element_type, validate_dims(dims)?)?;
        Array::zeros(element_type, dims).map(Value::Array)
    }

    fn allocate_scalar(&self, element_type: ElementType) -> Result<Value, ValueError> {
        self.check(element_type, 1)?;
        Ok(Value::Scalar(Scalar::zero(element_type)))
    }

    fn convert(&self, value: &Value, element_type: ElementType) -> Result<Value, ValueError> {
        let elements = value.data().map_or(0, crate::ArrayData::len);
        self.check(element_type, elements)?;
        value.convert(element_type)
    }
}
