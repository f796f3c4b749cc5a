//! Integration tests for lux-session

use std::sync::Arc;
use std::thread;

use lux_session::{create_session, Options, Session, SessionError};
use lux_signature::ArgumentError;
use lux_types::ElementType;
use lux_value::{HeapAllocator, Value};

// ============================================================
// Binding Tests
// ============================================================

mod bind_tests {
    use super::*;

    #[test]
    fn test_bind_through_session() {
        let session = Session::default();
        let mut args = [Value::array(&[5], vec![1i32, 2, 3, 4, 5]).unwrap()];
        let binding = session
            .bind("i>D:;rD=", &mut args, &HeapAllocator::new())
            .unwrap();
        assert_eq!(binding.ret.unwrap().dims().as_slice(), &[5]);
        assert_eq!(args[0].element_type(), Some(ElementType::Double));
    }

    #[test]
    fn test_default_output_type_from_options() {
        let mut options = Options::default();
        options.bind.default_output_type = ElementType::Long;
        let session = Session::new(options);
        let mut args = [Value::Undefined];
        session.bind("o2,3", &mut args, &HeapAllocator::new()).unwrap();
        assert_eq!(args[0].element_type(), Some(ElementType::Long));
        assert_eq!(args[0].dims().as_slice(), &[2, 3]);
    }

    #[test]
    fn test_argument_error_is_wrapped() {
        let session = Session::default();
        let mut args = [Value::array(&[4], vec![0u8; 4]).unwrap()];
        let err = session
            .bind("i5", &mut args, &HeapAllocator::new())
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Argument(ArgumentError::DimensionMismatch { expected: 5, found: 4, .. })
        ));
    }
}

// ============================================================
// Concurrency Tests
// ============================================================

mod concurrency_tests {
    use super::*;

    #[test]
    fn test_concurrent_binds_share_signature() {
        let session = create_session(Options::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    let n = i + 2;
                    let mut args = [Value::array(&[n], vec![0.5f32; n]).unwrap()];
                    let binding = session
                        .bind("i*;r&", &mut args, &HeapAllocator::new())
                        .unwrap();
                    binding.ret.unwrap().dims().to_vec()
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), vec![i + 2]);
        }
        assert_eq!(session.cached_signatures(), 1);
    }
}
