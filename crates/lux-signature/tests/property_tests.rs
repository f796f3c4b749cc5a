//! Property tests for lux-signature

use lux_signature::{bind, parse, BindConfig};
use lux_value::{HeapAllocator, Value};
use proptest::prelude::*;

proptest! {
    #[test]
    fn parse_never_panics(format in "[iorBWLQFDS>?\\[\\]{}0-9+=:,;*&-]{0,24}") {
        let _ = parse(&format);
    }

    #[test]
    fn canonical_text_parses_back(format in "(i[BWLQFD]?[1-9]?\\*?;){1,3}r(>?[BWLQFD])?(=,=)?&") {
        let specs = parse(&format).unwrap();
        let text = specs.to_string();
        prop_assert_eq!(parse(&text).unwrap(), specs);
    }

    #[test]
    fn return_copies_reference_shape(dims in prop::collection::vec(2usize..5, 1..=4)) {
        let n: usize = dims.iter().product();
        let mut args = [Value::array(&dims, vec![0.0f32; n]).unwrap()];
        let specs = parse("i*;r&").unwrap();
        let binding = bind(&mut args, &specs, &BindConfig::default(), &HeapAllocator::new()).unwrap();
        let ret = binding.ret.unwrap();
        prop_assert_eq!(ret.dims().to_vec(), dims);
    }

    #[test]
    fn axis_deletion_removes_named_axes(
        dims in prop::collection::vec(2usize..5, 2..=4),
        pick in any::<prop::sample::Index>(),
    ) {
        let n: usize = dims.iter().product();
        let axis = pick.index(dims.len());
        let mut args = [
            Value::array(&dims, vec![0u8; n]).unwrap(),
            Value::scalar(axis as i32),
        ];
        let specs = parse("i*;iL;r[0]{1}&").unwrap();
        let binding = bind(&mut args, &specs, &BindConfig::default(), &HeapAllocator::new()).unwrap();
        let mut expected = dims.clone();
        expected.remove(axis);
        prop_assert_eq!(binding.ret.unwrap().dims().to_vec(), expected);
    }
}
