//! Values consumed by the LUX loop machinery.
//!
//! The loop and signature crates only need a narrow view of the
//! interpreter's values: an element type, a dimension list, and the
//! element storage. This crate provides that view ([`numerical_info`]),
//! the value representation itself ([`Value`], [`Array`], [`Scalar`],
//! [`ArrayData`]), and the allocation seam ([`ValueAllocator`]) through
//! which freshly shaped results are created.
//!
//! # Layout
//!
//! Arrays store their elements contiguously with the *first* dimension
//! varying fastest. A scalar is reported as a one-element array of
//! dimensions `[1]`, so loops never need a rank-0 special case.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod alloc;
mod data;
pub mod element;

pub use alloc::{HeapAllocator, ValueAllocator};
pub use data::ArrayData;
pub use element::{Element, Numeric};

use lux_types::{check_rank, checked_element_count, Dims, ElementType};

/// Errors raised by value inspection, conversion and allocation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// The value has no element data.
    #[error("expected a numerical or string value, found {found}")]
    NotNumerical {
        /// What kind of value was found.
        found: &'static str,
    },

    /// The allocator could not provide storage.
    #[error("cannot allocate {elements} elements of type {element_type}: {reason}")]
    Allocation {
        /// Requested element type.
        element_type: ElementType,
        /// Requested element count.
        elements: usize,
        /// Why the allocation failed.
        reason: String,
    },

    /// Conversion between incompatible element types.
    #[error("cannot convert {from} to {to}")]
    Conversion {
        /// Source element type.
        from: ElementType,
        /// Requested element type.
        to: ElementType,
    },

    /// Data length does not match the dimensions.
    #[error("dimensions {dims:?} need {expected} elements but {found} were supplied")]
    ShapeMismatch {
        /// The dimensions given.
        dims: Vec<usize>,
        /// Element count implied by the dimensions.
        expected: usize,
        /// Element count supplied.
        found: usize,
    },

    /// Dimensions with a zero size or an unsupported rank.
    #[error("invalid dimensions {dims:?}")]
    InvalidShape {
        /// The dimensions given.
        dims: Vec<usize>,
    },
}

/// A single element of any type.
#[derive(Clone, Debug, PartialEq)]
pub struct Scalar {
    data: ArrayData,
}

impl Scalar {
    /// Creates a scalar holding `value`.
    #[must_use]
    pub fn new<T: Element>(value: T) -> Self {
        Self {
            data: T::into_data(vec![value]),
        }
    }

    /// Creates a zero scalar (empty string for strings).
    #[must_use]
    pub fn zero(element_type: ElementType) -> Self {
        Self {
            data: ArrayData::zeros(element_type, 1),
        }
    }

    /// Returns the element type.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Returns the value as `T` if that is the stored type.
    #[must_use]
    pub fn get<T: Element>(&self) -> Option<&T> {
        self.data.as_slice::<T>().and_then(<[T]>::first)
    }

    /// Returns the one-element storage.
    #[must_use]
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Returns the one-element storage mutably.
    pub fn data_mut(&mut self) -> &mut ArrayData {
        &mut self.data
    }
}

/// A dense N-dimensional array.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    dims: Dims,
    data: ArrayData,
}

impl Array {
    /// Creates an array from dimensions and matching storage.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidShape`] for an unsupported rank, a
    /// zero-sized dimension or an element count that overflows, and [`ValueError::ShapeMismatch`] if the
    /// storage length differs from the product of `dims`.
    pub fn new(dims: &[usize], data: ArrayData) -> Result<Self, ValueError> {
        let expected = validate_dims(dims)?;
        if expected != data.len() {
            return Err(ValueError::ShapeMismatch {
                dims: dims.to_vec(),
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            dims: Dims::from_slice(dims),
            data,
        })
    }

    /// Creates a zero-filled array.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidShape`] for invalid dimensions.
    pub fn zeros(element_type: ElementType, dims: &[usize]) -> Result<Self, ValueError> {
        let count = validate_dims(dims)?;
        Ok(Self {
            dims: Dims::from_slice(dims),
            data: ArrayData::zeros(element_type, count),
        })
    }

    /// Returns the dimensions.
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the element type.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Returns the storage.
    #[must_use]
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Returns the storage mutably. Callers must not change its length.
    pub fn data_mut(&mut self) -> &mut ArrayData {
        &mut self.data
    }
}

/// Checks `dims` and returns its element count.
pub(crate) fn validate_dims(dims: &[usize]) -> Result<usize, ValueError> {
    let count = checked_element_count(dims).filter(|&n| n > 0);
    match count {
        Some(n) if check_rank(dims.len()).is_ok() => Ok(n),
        _ => Err(ValueError::InvalidShape {
            dims: dims.to_vec(),
        }),
    }
}

/// A runtime value as seen by the loop machinery.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// A variable without a value.
    #[default]
    Undefined,
    /// A single element.
    Scalar(Scalar),
    /// An N-dimensional array.
    Array(Array),
}

impl Value {
    /// Creates a scalar value.
    #[must_use]
    pub fn scalar<T: Element>(value: T) -> Self {
        Self::Scalar(Scalar::new(value))
    }

    /// Creates an array value from dimensions and elements.
    ///
    /// # Errors
    ///
    /// See [`Array::new`].
    pub fn array<T: Element>(dims: &[usize], values: Vec<T>) -> Result<Self, ValueError> {
        Array::new(dims, T::into_data(values)).map(Self::Array)
    }

    /// A short name for the kind of value, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Undefined => "an undefined value",
            Self::Scalar(_) => "a scalar",
            Self::Array(_) => "an array",
        }
    }

    /// Returns the element type, if the value has elements.
    #[must_use]
    pub fn element_type(&self) -> Option<ElementType> {
        self.data().map(ArrayData::element_type)
    }

    /// Returns the dimensions; a scalar has dimensions `[1]` and an
    /// undefined value has none.
    #[must_use]
    pub fn dims(&self) -> Dims {
        match self {
            Self::Undefined => Dims::new(),
            Self::Scalar(_) => Dims::from_slice(&[1]),
            Self::Array(a) => Dims::from_slice(a.dims()),
        }
    }

    /// Returns the element storage, if any.
    #[must_use]
    pub fn data(&self) -> Option<&ArrayData> {
        match self {
            Self::Undefined => None,
            Self::Scalar(s) => Some(s.data()),
            Self::Array(a) => Some(a.data()),
        }
    }

    /// Returns the element storage mutably, if any.
    pub fn data_mut(&mut self) -> Option<&mut ArrayData> {
        match self {
            Self::Undefined => None,
            Self::Scalar(s) => Some(s.data_mut()),
            Self::Array(a) => Some(a.data_mut()),
        }
    }

    /// Returns true if the value holds numbers (including complex).
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        self.element_type().is_some_and(ElementType::is_numerical)
    }

    /// Returns true if the value holds complex numbers.
    #[must_use]
    pub fn is_complex(&self) -> bool {
        self.element_type().is_some_and(ElementType::is_complex)
    }

    /// Returns true if the value holds strings.
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.element_type().is_some_and(ElementType::is_string)
    }

    /// Returns a copy of the value converted to `to`. Dimensions are kept.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::NotNumerical`] for an undefined value and
    /// [`ValueError::Conversion`] between strings and numbers.
    pub fn convert(&self, to: ElementType) -> Result<Self, ValueError> {
        match self {
            Self::Undefined => Err(ValueError::NotNumerical {
                found: self.kind_name(),
            }),
            Self::Scalar(s) => Ok(Self::Scalar(Scalar {
                data: s.data().convert(to)?,
            })),
            Self::Array(a) => Ok(Self::Array(Array {
                dims: a.dims.clone(),
                data: a.data().convert(to)?,
            })),
        }
    }

    /// Reads the value as a list of axis numbers.
    ///
    /// Floating-point elements are truncated; complex elements contribute
    /// their real part.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::NotNumerical`] for undefined and string values.
    pub fn axis_list(&self) -> Result<Vec<i64>, ValueError> {
        self.data()
            .and_then(ArrayData::to_i64_vec)
            .ok_or(ValueError::NotNumerical {
                found: self.kind_name(),
            })
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Self::Array(array)
    }
}

/// The loop machinery's view of a value.
#[derive(Clone, Debug)]
pub struct NumericalInfo<'a> {
    /// Element type of the value.
    pub element_type: ElementType,
    /// Dimensions; `[1]` for a scalar.
    pub dims: Dims,
    /// Element storage.
    pub data: &'a ArrayData,
}

impl NumericalInfo<'_> {
    /// Number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.data.len()
    }
}

/// Returns the element type, dimensions and storage of `value`.
///
/// String values are accepted; only values without elements are rejected.
///
/// # Errors
///
/// Returns [`ValueError::NotNumerical`] for an undefined value.
pub fn numerical_info(value: &Value) -> Result<NumericalInfo<'_>, ValueError> {
    let data = value.data().ok_or(ValueError::NotNumerical {
        found: value.kind_name(),
    })?;
    Ok(NumericalInfo {
        element_type: data.element_type(),
        dims: value.dims(),
        data,
    })
}
