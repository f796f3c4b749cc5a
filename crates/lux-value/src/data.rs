//! Element storage.

use lux_types::ElementType;
use num_complex::{Complex32, Complex64};

use crate::element::{Element, Numeric};
use crate::ValueError;

/// Contiguous element storage of one element type.
///
/// Element `i` of an array with dimensions `[d0, d1, ...]` lives at
/// `i0 + d0 * (i1 + d1 * (...))`: the first dimension varies fastest.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    /// 8-bit unsigned integers.
    Byte(Vec<u8>),
    /// 16-bit signed integers.
    Word(Vec<i16>),
    /// 32-bit signed integers.
    Long(Vec<i32>),
    /// 64-bit signed integers.
    Quad(Vec<i64>),
    /// 32-bit floats.
    Float(Vec<f32>),
    /// 64-bit floats.
    Double(Vec<f64>),
    /// Single-precision complex numbers.
    CFloat(Vec<Complex32>),
    /// Double-precision complex numbers.
    CDouble(Vec<Complex64>),
    /// Strings.
    String(Vec<String>),
}

impl ArrayData {
    /// Creates storage of `len` zero elements (empty strings for
    /// [`ElementType::String`]).
    #[must_use]
    pub fn zeros(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::Byte => Self::Byte(vec![0; len]),
            ElementType::Word => Self::Word(vec![0; len]),
            ElementType::Long => Self::Long(vec![0; len]),
            ElementType::Quad => Self::Quad(vec![0; len]),
            ElementType::Float => Self::Float(vec![0.0; len]),
            ElementType::Double => Self::Double(vec![0.0; len]),
            ElementType::CFloat => Self::CFloat(vec![Complex32::default(); len]),
            ElementType::CDouble => Self::CDouble(vec![Complex64::default(); len]),
            ElementType::String => Self::String(vec![String::new(); len]),
        }
    }

    /// Returns the element type stored.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Byte(_) => ElementType::Byte,
            Self::Word(_) => ElementType::Word,
            Self::Long(_) => ElementType::Long,
            Self::Quad(_) => ElementType::Quad,
            Self::Float(_) => ElementType::Float,
            Self::Double(_) => ElementType::Double,
            Self::CFloat(_) => ElementType::CFloat,
            Self::CDouble(_) => ElementType::CDouble,
            Self::String(_) => ElementType::String,
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Word(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Quad(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::CFloat(v) => v.len(),
            Self::CDouble(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the elements as `&[T]`, or `None` if `T` is not the stored type.
    #[must_use]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    /// Mutably borrows the elements as `&mut [T]`, or `None` if `T` is not
    /// the stored type.
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Returns a copy converted to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Conversion`] when converting between strings
    /// and numbers.
    pub fn convert(&self, to: ElementType) -> Result<Self, ValueError> {
        let from = self.element_type();
        if from == to {
            return Ok(self.clone());
        }
        if from.is_string() || to.is_string() {
            return Err(ValueError::Conversion { from, to });
        }
        Ok(match self {
            Self::Byte(v) => cast_slice(v, to),
            Self::Word(v) => cast_slice(v, to),
            Self::Long(v) => cast_slice(v, to),
            Self::Quad(v) => cast_slice(v, to),
            Self::Float(v) => cast_slice(v, to),
            Self::Double(v) => cast_slice(v, to),
            Self::CFloat(v) => cast_slice(v, to),
            Self::CDouble(v) => cast_slice(v, to),
            Self::String(_) => return Err(ValueError::Conversion { from, to }),
        })
    }

    /// Returns the elements as integers, or `None` for strings.
    #[must_use]
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        fn ints<S: Numeric>(src: &[S]) -> Vec<i64> {
            src.iter().map(|&v| v.to_i64()).collect()
        }
        Some(match self {
            Self::Byte(v) => ints(v),
            Self::Word(v) => ints(v),
            Self::Long(v) => ints(v),
            Self::Quad(v) => ints(v),
            Self::Float(v) => ints(v),
            Self::Double(v) => ints(v),
            Self::CFloat(v) => ints(v),
            Self::CDouble(v) => ints(v),
            Self::String(_) => return None,
        })
    }
}

fn cast_slice<S: Numeric>(src: &[S], to: ElementType) -> ArrayData {
    fn cast<S: Numeric, T: Numeric>(src: &[S]) -> ArrayData {
        T::into_data(src.iter().map(|&v| T::cast_from(v)).collect())
    }

    match to {
        ElementType::Byte => cast::<S, u8>(src),
        ElementType::Word => cast::<S, i16>(src),
        ElementType::Long => cast::<S, i32>(src),
        ElementType::Quad => cast::<S, i64>(src),
        ElementType::Float => cast::<S, f32>(src),
        ElementType::Double => cast::<S, f64>(src),
        ElementType::CFloat => cast::<S, Complex32>(src),
        // Strings are rejected by the caller.
        ElementType::CDouble | ElementType::String => cast::<S, Complex64>(src),
    }
}
