//! Integration tests for lux-loop
//!
//! Covers:
//! - Axis rearrangement scenarios for each traversal order
//! - Result-shape resolution (reduce, add, compress)
//! - Standard loops driving typed reductions end to end
//! - Windowed and border traversal with `advance_by`

use lux_loop::{
    resolve, standard_loop, traverse, Compress, Granularity, LoopFlags, LoopInfo, LoopMode,
    LoopRequest, ShapeDirectives, ShapeError, TraversalOrder,
};
use lux_types::ElementType;
use lux_value::{HeapAllocator, Value};
use smallvec::smallvec;

fn mode(order: TraversalOrder) -> LoopMode {
    LoopMode::new(order)
}

// ============================================================
// Rearrangement Tests
// ============================================================

mod rearrangement_tests {
    use super::*;

    #[test]
    fn test_each_coord_scenario() {
        let info = LoopInfo::new(
            ElementType::Double,
            &[4, 5, 6],
            &[1],
            LoopFlags::empty(),
            mode(TraversalOrder::EachCoord),
        )
        .unwrap();
        assert_eq!(info.rdims(), &[5, 4, 6]);
        assert_eq!(info.rndim(), 3);
    }

    #[test]
    fn test_axis_coord_rndim_depends_on_position() {
        let rndim = |dims: &[usize], axis: usize| {
            LoopInfo::with_axes(ElementType::Byte, dims, &[axis], mode(TraversalOrder::AxisCoord))
                .unwrap()
                .rndim()
        };
        assert_eq!(rndim(&[7], 0), 1);
        assert_eq!(rndim(&[2, 3, 4, 5], 0), 2);
        assert_eq!(rndim(&[2, 3, 4, 5], 3), 2);
        assert_eq!(rndim(&[2, 3, 4, 5], 2), 3);
    }

    #[test]
    fn test_once_per_axis() {
        let mut info = LoopInfo::new(
            ElementType::Long,
            &[2, 3, 4],
            &[],
            LoopFlags::ALL_AXES,
            mode(TraversalOrder::EachCoord),
        )
        .unwrap();
        let mut leading = vec![info.rdims()[0]];
        while info.next_axis() {
            leading.push(info.rdims()[0]);
        }
        assert_eq!(leading, vec![2, 3, 4]);
    }

    #[test]
    fn test_original_coords_track_traversal() {
        let mut info = LoopInfo::with_axes(
            ElementType::Long,
            &[2, 3, 4],
            &[2],
            mode(TraversalOrder::EachCoord),
        )
        .unwrap();
        loop {
            let c = info.original_coords();
            assert_eq!(info.cursor(), c[0] + 2 * c[1] + 6 * c[2]);
            if info.advance() == info.rndim() {
                break;
            }
        }
    }
}

// ============================================================
// Result Shape Tests
// ============================================================

mod shape_tests {
    use super::*;

    #[test]
    fn test_compress_scenarios() {
        let first = ShapeDirectives {
            compress: Compress::First,
            ..ShapeDirectives::default()
        };
        assert_eq!(resolve(&[4, 5, 6], &[1], &first).unwrap().dims.as_slice(), &[4, 6]);

        let all = ShapeDirectives {
            compress: Compress::All,
            ..ShapeDirectives::default()
        };
        assert_eq!(resolve(&[4, 5, 6], &[0, 1], &all).unwrap().dims.as_slice(), &[6]);
    }

    #[test]
    fn test_reduce_scenarios() {
        let half = ShapeDirectives {
            reduce: smallvec![2],
            ..ShapeDirectives::default()
        };
        assert_eq!(resolve(&[6], &[0], &half).unwrap().dims.as_slice(), &[3]);

        let fifth = ShapeDirectives {
            reduce: smallvec![5],
            ..ShapeDirectives::default()
        };
        assert!(matches!(
            resolve(&[6], &[0], &fifth),
            Err(ShapeError::NotDivisible { .. })
        ));
    }

    #[test]
    fn test_reduce_ignores_compress() {
        let d = ShapeDirectives {
            reduce: smallvec![2],
            compress: Compress::First,
            ..ShapeDirectives::default()
        };
        assert_eq!(resolve(&[4, 6], &[1], &d).unwrap().dims.as_slice(), &[4, 3]);
    }
}

// ============================================================
// Standard Loop Tests
// ============================================================

mod standard_loop_tests {
    use super::*;

    #[test]
    fn test_total_along_axis() {
        let source = Value::array(&[3, 2], vec![1i32, 2, 3, 4, 5, 6]).unwrap();
        let request = LoopRequest::new(mode(TraversalOrder::EachCoord))
            .axes(&[0])
            .flags(LoopFlags::COMPRESS | LoopFlags::SOURCE_UPGRADE)
            .with_result(ElementType::Double);
        let mut sl = standard_loop(&source, &request, &HeapAllocator::new()).unwrap();

        let src_data = sl.source.data().unwrap().as_slice::<f64>().unwrap().to_vec();
        let result = sl.result.as_mut().unwrap();
        let out = result.value.data_mut().unwrap().as_mut_slice::<f64>().unwrap();
        traverse::fold_axes(&mut sl.src, &src_data, &mut result.info, out, 1, 0.0, |acc, &x| acc + x)
            .unwrap();

        let value = sl.into_result().unwrap();
        assert_eq!(value.dims().as_slice(), &[2]);
        assert_eq!(value.data().unwrap().as_slice::<f64>().unwrap(), &[6.0, 15.0]);
    }

    #[test]
    fn test_total_of_whole_array_is_scalar() {
        let source = Value::array(&[2, 2], vec![1.5f32, 2.5, 3.0, 1.0]).unwrap();
        let request = LoopRequest::new(mode(TraversalOrder::EachCoord))
            .flags(LoopFlags::COMPRESS | LoopFlags::KEEP_TYPE)
            .with_result(ElementType::Double);
        let mut sl = standard_loop(&source, &request, &HeapAllocator::new()).unwrap();
        let src_data = sl.source.data().unwrap().as_slice::<f32>().unwrap().to_vec();
        let result = sl.result.as_mut().unwrap();
        let out = result.value.data_mut().unwrap().as_mut_slice::<f32>().unwrap();
        traverse::fold_axes(&mut sl.src, &src_data, &mut result.info, out, 1, 0.0, |a, &x| a + x)
            .unwrap();
        assert!(matches!(sl.result.as_ref().unwrap().value, Value::Scalar(_)));
        assert_eq!(
            sl.into_result().unwrap().data().unwrap().as_slice::<f32>().unwrap(),
            &[8.0]
        );
    }

    #[test]
    fn test_block_reduction_over_two_axes() {
        let source = Value::array(&[2, 3, 4], (0..24).collect::<Vec<i64>>()).unwrap();
        let request = LoopRequest::new(mode(TraversalOrder::AxisBlock))
            .axes(&[0, 2])
            .flags(LoopFlags::COMPRESS_ALL)
            .with_result(ElementType::Quad);
        let mut sl = standard_loop(&source, &request, &HeapAllocator::new()).unwrap();
        let src_data = sl.source.data().unwrap().as_slice::<i64>().unwrap().to_vec();
        let result = sl.result.as_mut().unwrap();
        let out = result.value.data_mut().unwrap().as_mut_slice::<i64>().unwrap();
        traverse::fold_axes(&mut sl.src, &src_data, &mut result.info, out, 2, 0, |a, &x| a + x)
            .unwrap();
        assert_eq!(
            sl.into_result().unwrap().data().unwrap().as_slice::<i64>().unwrap(),
            &[76, 92, 108]
        );
    }

    #[test]
    fn test_row_granularity_walks_rows_itself() {
        let data: Vec<i32> = (0..12).collect();
        let mut info = LoopInfo::with_axes(
            ElementType::Long,
            &[4, 3],
            &[0],
            mode(TraversalOrder::EachCoord).with_granularity(Granularity::Row),
        )
        .unwrap();
        let mut sums = Vec::new();
        loop {
            let start = info.cursor();
            let stride = info.rstride()[0];
            sums.push((0..info.rdims()[0]).map(|i| data[start + i * stride]).sum::<i32>());
            if info.advance() == info.rndim() {
                break;
            }
        }
        assert_eq!(sums, vec![6, 22, 38]);
    }
}

// ============================================================
// Windowed Traversal Tests
// ============================================================

mod window_tests {
    use super::*;

    #[test]
    fn test_border_only() {
        // Visit only the first and last column of a 4x3 array.
        let mut info =
            LoopInfo::with_axes(ElementType::Long, &[4, 3], &[0], mode(TraversalOrder::EachCoord))
                .unwrap();
        let mut visited = Vec::new();
        loop {
            visited.push(info.cursor());
            let axis = if info.coords()[0] == 0 {
                info.advance_by(0, 3)
            } else {
                info.advance_by(0, 1)
            };
            if axis == info.rndim() {
                break;
            }
        }
        assert_eq!(visited, vec![0, 3, 4, 7, 8, 11]);
        assert!(info.is_at_start());
    }

    #[test]
    fn test_window_origin() {
        let data: Vec<i32> = (0..10).collect();
        let mut info =
            LoopInfo::with_axes(ElementType::Long, &[2, 2], &[1], mode(TraversalOrder::EachCoord))
                .unwrap()
                .with_origin(5, data.len())
                .unwrap();
        assert_eq!(info.offsets().collect::<Vec<_>>(), vec![5, 7, 6, 8]);
        assert_eq!(info.cursor(), 5);
    }
}
