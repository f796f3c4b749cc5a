//! Typed access to element storage.
//!
//! [`ArrayData`] is a sum over one `Vec` per element type. Operations that
//! must run over any element type are written once as generic functions
//! bounded by [`Element`] (or [`Numeric`]) and instantiated per type, so
//! the per-type dispatch happens once per call rather than per element.

use std::fmt;

use lux_types::ElementType;
use num_complex::{Complex32, Complex64};

use crate::ArrayData;

/// A Rust type that is the storage representation of one [`ElementType`].
pub trait Element: Clone + fmt::Debug + Send + Sync + 'static {
    /// The element type tag stored as `Self`.
    const TYPE: ElementType;

    /// Borrows `data` as a slice of `Self` if it holds this type.
    fn slice(data: &ArrayData) -> Option<&[Self]>;

    /// Mutably borrows `data` as a slice of `Self` if it holds this type.
    fn slice_mut(data: &mut ArrayData) -> Option<&mut [Self]>;

    /// Wraps a vector of `Self` as array storage.
    fn into_data(values: Vec<Self>) -> ArrayData;
}

/// Numerical elements, with the casts used by type conversion.
pub trait Numeric: Element + Copy + Default {
    /// Value as a 64-bit integer (truncating floats, real part of complex).
    fn to_i64(self) -> i64;
    /// Value as a double (real part of complex).
    fn to_f64(self) -> f64;
    /// Value as a double-precision complex number.
    fn to_c64(self) -> Complex64;
    /// Converts from a 64-bit integer, wrapping like a C cast for narrow
    /// integer types.
    fn from_i64(value: i64) -> Self;
    /// Converts from a double, saturating for integer types.
    fn from_f64(value: f64) -> Self;
    /// Converts from a complex number; real types keep the real part.
    fn from_c64(value: Complex64) -> Self;

    /// Converts a value of any numerical type into `Self`.
    ///
    /// Integer-to-integer conversions go through `i64` so that `Quad`
    /// values keep full precision.
    #[inline]
    fn cast_from<S: Numeric>(value: S) -> Self {
        if Self::TYPE.is_complex() {
            Self::from_c64(value.to_c64())
        } else if Self::TYPE.is_integer() && S::TYPE.is_integer() {
            Self::from_i64(value.to_i64())
        } else {
            Self::from_f64(value.to_f64())
        }
    }
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const TYPE: ElementType = ElementType::$variant;

            fn slice(data: &ArrayData) -> Option<&[Self]> {
                match data {
                    ArrayData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut ArrayData) -> Option<&mut [Self]> {
                match data {
                    ArrayData::$variant(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }

            fn into_data(values: Vec<Self>) -> ArrayData {
                ArrayData::$variant(values)
            }
        }
    };
}

impl_element!(u8, Byte);
impl_element!(i16, Word);
impl_element!(i32, Long);
impl_element!(i64, Quad);
impl_element!(f32, Float);
impl_element!(f64, Double);
impl_element!(Complex32, CFloat);
impl_element!(Complex64, CDouble);
impl_element!(String, String);

macro_rules! impl_real_numeric {
    ($ty:ty) => {
        impl Numeric for $ty {
            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn to_c64(self) -> Complex64 {
                Complex64::new(self as f64, 0.0)
            }
            #[inline]
            fn from_i64(value: i64) -> Self {
                value as $ty
            }
            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }
            #[inline]
            fn from_c64(value: Complex64) -> Self {
                value.re as $ty
            }
        }
    };
}

impl_real_numeric!(u8);
impl_real_numeric!(i16);
impl_real_numeric!(i32);
impl_real_numeric!(i64);
impl_real_numeric!(f32);
impl_real_numeric!(f64);

impl Numeric for Complex32 {
    fn to_i64(self) -> i64 {
        self.re as i64
    }
    fn to_f64(self) -> f64 {
        f64::from(self.re)
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(f64::from(self.re), f64::from(self.im))
    }
    fn from_i64(value: i64) -> Self {
        Complex32::new(value as f32, 0.0)
    }
    fn from_f64(value: f64) -> Self {
        Complex32::new(value as f32, 0.0)
    }
    fn from_c64(value: Complex64) -> Self {
        Complex32::new(value.re as f32, value.im as f32)
    }
}

impl Numeric for Complex64 {
    fn to_i64(self) -> i64 {
        self.re as i64
    }
    fn to_f64(self) -> f64 {
        self.re
    }
    fn to_c64(self) -> Complex64 {
        self
    }
    fn from_i64(value: i64) -> Self {
        Complex64::new(value as f64, 0.0)
    }
    fn from_f64(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }
    fn from_c64(value: Complex64) -> Self {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_matches_variant() {
        let data = ArrayData::Long(vec![1, 2, 3]);
        assert_eq!(i32::slice(&data), Some(&[1, 2, 3][..]));
        assert!(f64::slice(&data).is_none());
    }

    #[test]
    fn test_quad_keeps_precision() {
        let big = i64::MAX - 1;
        assert_eq!(i64::cast_from(big), big);
    }

    #[test]
    fn test_narrowing_wraps_like_c() {
        assert_eq!(u8::cast_from(300i32), 44);
        assert_eq!(i16::cast_from(70000i64), 4464);
    }

    #[test]
    fn test_float_to_int_truncates() {
        assert_eq!(i32::cast_from(2.9f64), 2);
        assert_eq!(i32::cast_from(-2.9f32), -2);
    }

    #[test]
    fn test_complex_round_trip() {
        let z = Complex32::new(1.5, -2.0);
        let wide = Complex64::cast_from(z);
        assert_eq!(wide, Complex64::new(1.5, -2.0));
        assert_eq!(f64::cast_from(wide), 1.5);
    }
}
