//! Property tests for lux-value conversions and allocation.

use lux_types::{combined_type, ElementType};
use lux_value::{numerical_info, HeapAllocator, Value, ValueAllocator};
use proptest::prelude::*;

fn numerical() -> impl Strategy<Value = ElementType> {
    prop::sample::select(ElementType::NUMERICAL.to_vec())
}

proptest! {
    #[test]
    fn convert_preserves_shape(
        dims in prop::collection::vec(1usize..4, 1..=3),
        to in numerical(),
    ) {
        let n: usize = dims.iter().product();
        let value = Value::array(&dims, (0..n as i32).collect::<Vec<_>>()).unwrap();
        let converted = HeapAllocator::new().convert(&value, to).unwrap();
        prop_assert_eq!(converted.dims(), value.dims());
        prop_assert_eq!(converted.element_type(), Some(to));
    }

    #[test]
    fn widening_keeps_small_integers(x in 0i32..100, to in numerical()) {
        let wide = combined_type(ElementType::Byte, to);
        let value = Value::scalar(x as u8).convert(wide).unwrap();
        prop_assert_eq!(value.axis_list().unwrap(), vec![i64::from(x)]);
    }

    #[test]
    fn allocated_arrays_match_request(
        dims in prop::collection::vec(1usize..5, 1..=4),
        ty in numerical(),
    ) {
        let value = HeapAllocator::new().allocate_array(ty, &dims).unwrap();
        let info = numerical_info(&value).unwrap();
        prop_assert_eq!(info.dims.to_vec(), dims.clone());
        prop_assert_eq!(info.element_type, ty);
        prop_assert_eq!(info.element_count(), dims.iter().product::<usize>());
    }
}
