use approx::assert_relative_eq;
use ndstride::{
    assign, broadcast_shapes, broadcast_to, copy, next_cartesian_index_assign, numel,
    reverse_dim, shape_to_strides, squeeze, strides_to_offset, sum, transpose, Buffer, DType,
    NdArray, Order, ReduceOptions, Scalar,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn f64_view(values: Vec<f64>, shape: &[usize], strides: &[isize], offset: isize) -> NdArray {
    NdArray::new(
        DType::Float64,
        Buffer::Float64(values),
        shape.to_vec(),
        strides.to_vec(),
        offset,
        Order::RowMajor,
    )
    .unwrap()
}

fn iota(shape: &[usize], order: Order) -> NdArray {
    let n = numel(shape);
    NdArray::new(
        DType::Float64,
        Buffer::Float64((0..n).map(|v| v as f64).collect()),
        shape.to_vec(),
        shape_to_strides(shape, order),
        0,
        order,
    )
    .unwrap()
}

fn read_f64(x: &NdArray) -> Vec<f64> {
    let shape = x.shape().to_vec();
    let mut idx = vec![0usize; x.ndims()];
    let mut out = Vec::with_capacity(x.len());
    for _ in 0..x.len() {
        let signed: Vec<isize> = idx.iter().map(|&i| i as isize).collect();
        match x.get(&signed).unwrap() {
            Scalar::Float64(v) => out.push(v),
            other => panic!("expected float64, got {other:?}"),
        }
        if x.ndims() > 0 {
            next_cartesian_index_assign(&shape, Order::RowMajor, -1, &mut idx).unwrap();
        }
    }
    out
}

#[test]
fn test_shape_to_strides_orders() {
    assert_eq!(shape_to_strides(&[2, 3], Order::RowMajor), vec![3, 1]);
    assert_eq!(shape_to_strides(&[2, 3], Order::ColMajor), vec![1, 2]);
}

#[test]
fn test_stride_offset_round_trip() {
    // The offset computed for negative strides is the buffer index of the
    // logical first element, and a full Cartesian pass touches exactly
    // numel distinct buffer positions before cycling.
    for order in [Order::RowMajor, Order::ColMajor] {
        // Row-major stepping starts at the last axis, column-major at the
        // first.
        let step_dim = match order {
            Order::RowMajor => -1,
            Order::ColMajor => 0,
        };
        for shape in [vec![4usize], vec![2, 3], vec![2, 3, 2]] {
            let mut strides = shape_to_strides(&shape, order);
            // Flip the middle axis when there is one.
            if strides.len() > 1 {
                strides[1] = -strides[1];
            }
            let offset = strides_to_offset(&shape, &strides) as isize;

            let mut idx = vec![0usize; shape.len()];
            let mut positions = std::collections::HashSet::new();
            for _ in 0..numel(&shape) {
                let pos: isize = offset
                    + idx
                        .iter()
                        .zip(&strides)
                        .map(|(&i, &s)| i as isize * s)
                        .sum::<isize>();
                assert!(pos >= 0);
                positions.insert(pos);
                next_cartesian_index_assign(&shape, order, step_dim, &mut idx).unwrap();
            }
            assert_eq!(positions.len(), numel(&shape));
            assert_eq!(idx, vec![0usize; shape.len()], "stepper must cycle");
        }
    }
}

#[test]
fn test_next_cartesian_documented_sequence() {
    let mut idx = vec![0usize, 0];
    let mut seen = Vec::new();
    for _ in 0..4 {
        next_cartesian_index_assign(&[2, 2], Order::RowMajor, -1, &mut idx).unwrap();
        seen.push(idx.clone());
    }
    assert_eq!(seen, vec![vec![0, 1], vec![1, 0], vec![1, 1], vec![0, 0]]);
}

#[test]
fn test_assign_reversed_vector() {
    let x = f64_view(vec![1.0, 2.0, 3.0], &[3], &[-1], 2);
    let y = NdArray::zeros(DType::Float64, &[3], Order::RowMajor);
    assign(&x, &y).unwrap();
    assert_eq!(read_f64(&y), vec![3.0, 2.0, 1.0]);
}

#[test]
fn test_assign_property_random_views() {
    // For any same-shape pair of views, assign makes y.get(idx) equal
    // cast(x.get(idx)) at every multi-index.
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let rank = rng.gen_range(1..=4);
        let shape: Vec<usize> = (0..rank).map(|_| rng.gen_range(1..=5)).collect();

        // Source: a contiguous buffer seen through a permuted, partially
        // reversed view.
        let base_order = if rng.gen_bool(0.5) {
            Order::RowMajor
        } else {
            Order::ColMajor
        };
        let x = iota(&shape, base_order);
        let mut view = x.clone();
        for axis in 0..rank {
            if rng.gen_bool(0.4) {
                view = reverse_dim(&view, axis).unwrap();
            }
        }

        let y = NdArray::zeros(DType::Float64, &shape, Order::RowMajor);
        assign(&view, &y).unwrap();
        assert_eq!(read_f64(&y), read_f64(&view), "shape {shape:?}");
    }
}

#[test]
fn test_assign_path_equivalence() {
    // The same logical content reaches the output bit-identically through
    // the contiguous fast path, the interchange/blocked path, and the
    // column-major packing of the same region.
    let shape = [8usize, 16, 4];
    let n = numel(&shape);
    let values: Vec<f64> = (0..n).map(|v| (v as f64) * 0.5 - 100.0).collect();

    let row = f64_view(values.clone(), &shape, &shape_to_strides(&shape, Order::RowMajor), 0);

    // Column-major packing holding the same logical elements.
    let col = NdArray::new(
        DType::Float64,
        Buffer::Float64(vec![0.0; n]),
        shape.to_vec(),
        shape_to_strides(&shape, Order::ColMajor),
        0,
        Order::ColMajor,
    )
    .unwrap();
    assign(&row, &col).unwrap();

    // Gapped packing: the same logical elements stored every other slot,
    // which defeats the contiguous fast path entirely.
    let row_strides = shape_to_strides(&shape, Order::RowMajor);
    let gapped_strides: Vec<isize> = row_strides.iter().map(|&s| s * 2).collect();
    let gapped = NdArray::new(
        DType::Float64,
        Buffer::Float64(vec![0.0; 2 * n]),
        shape.to_vec(),
        gapped_strides,
        0,
        Order::RowMajor,
    )
    .unwrap();
    assign(&row, &gapped).unwrap();

    let out_a = NdArray::zeros(DType::Float64, &shape, Order::RowMajor);
    let out_b = NdArray::zeros(DType::Float64, &shape, Order::RowMajor);
    let out_c = NdArray::zeros(DType::Float64, &shape, Order::RowMajor);
    assign(&row, &out_a).unwrap();
    assign(&col, &out_b).unwrap();
    assign(&gapped, &out_c).unwrap();

    let a = read_f64(&out_a);
    assert_eq!(a, read_f64(&out_b));
    assert_eq!(a, read_f64(&out_c));
    assert_eq!(a, values);
}

#[test]
fn test_assign_casts_at_every_index() {
    let x = NdArray::new(
        DType::Int32,
        Buffer::Int32((0..12).map(|v| v * 3 - 5).collect()),
        vec![3, 4],
        vec![4, 1],
        0,
        Order::RowMajor,
    )
    .unwrap();
    let y = NdArray::zeros(DType::Float64, &[3, 4], Order::RowMajor);
    assign(&x, &y).unwrap();
    for i in 0..3 {
        for j in 0..4 {
            let xv = match x.get(&[i, j]).unwrap() {
                Scalar::Int32(v) => v as f64,
                other => panic!("unexpected {other:?}"),
            };
            let yv = match y.get(&[i, j]).unwrap() {
                Scalar::Float64(v) => v,
                other => panic!("unexpected {other:?}"),
            };
            assert_relative_eq!(xv, yv);
        }
    }
}

#[test]
fn test_broadcast_shape_law() {
    // Pairwise broadcasting composes to the same result as broadcasting
    // all shapes at once.
    let triples: [(&[usize], &[usize], &[usize]); 3] = [
        (&[2, 1, 2], &[1, 2, 1], &[2, 2]),
        (&[3], &[4, 1], &[1, 3]),
        (&[1], &[5, 1, 1], &[1, 4]),
    ];
    for (a, b, c) in triples {
        let ab = broadcast_shapes(&[a, b]).unwrap();
        let ab_c = broadcast_shapes(&[&ab, c]).unwrap();
        let abc = broadcast_shapes(&[a, b, c]).unwrap();
        assert_eq!(ab_c, abc, "{a:?} {b:?} {c:?}");

        let bc = broadcast_shapes(&[b, c]).unwrap();
        let a_bc = broadcast_shapes(&[a, &bc]).unwrap();
        assert_eq!(a_bc, abc);
    }
}

#[test]
fn test_broadcast_documented_scenario() {
    let x = f64_view(vec![1.0, 2.0, 3.0, 4.0], &[2, 1, 2], &[2, 2, 1], 0);
    let y = NdArray::zeros(DType::Float64, &[1, 2, 1], Order::RowMajor);
    let shape = broadcast_shapes(&[x.shape(), y.shape()]).unwrap();
    assert_eq!(shape, vec![2, 2, 2]);

    let bx = broadcast_to(&x, &shape).unwrap();
    assert_eq!(bx.get(&[1, 1, 1]).unwrap(), x.get(&[1, 0, 1]).unwrap());
}

#[test]
fn test_broadcast_then_assign_materializes() {
    let row = f64_view(vec![1.0, 2.0, 3.0], &[3], &[1], 0);
    let b = broadcast_to(&row, &[4, 3]).unwrap();
    let out = NdArray::zeros(DType::Float64, &[4, 3], Order::RowMajor);
    assign(&b, &out).unwrap();
    assert_eq!(
        read_f64(&out),
        vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0]
    );
}

#[test]
fn test_reduce_keepdims_idempotence() {
    let x = iota(&[3, 4, 2], Order::RowMajor);
    let kept = sum(
        &x,
        &ReduceOptions {
            dims: Some(vec![1]),
            keepdims: true,
            ..Default::default()
        },
    )
    .unwrap();
    let flat = sum(
        &x,
        &ReduceOptions {
            dims: Some(vec![1]),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(kept.shape(), &[3, 1, 2]);
    let squeezed = squeeze(&kept, Some(&[1])).unwrap();
    assert_eq!(squeezed.shape(), flat.shape());
    assert_eq!(read_f64(&squeezed), read_f64(&flat));
}

#[test]
fn test_accumulation_no_overflow() {
    // 200 int8 elements of value 100: int8 arithmetic would wrap, the
    // accumulation policy widens to int32 first.
    let x = NdArray::new(
        DType::Int8,
        Buffer::Int8(vec![100i8; 200]),
        vec![200],
        vec![1],
        0,
        Order::RowMajor,
    )
    .unwrap();
    let out = sum(&x, &ReduceOptions::default()).unwrap();
    assert_eq!(out.dtype(), DType::Int32);
    assert_eq!(out.get(&[]).unwrap(), Scalar::Int32(20000));
}

#[test]
fn test_slice_alias_mutation_visible() {
    let x = iota(&[4, 3], Order::RowMajor);
    let tail = ndstride::slice_from(&x, &[2, 0]).unwrap();
    tail.set(&[0, 0], Scalar::Float64(-1.0)).unwrap();
    assert_eq!(x.get(&[2, 0]).unwrap(), Scalar::Float64(-1.0));

    let copied = copy(&x).unwrap();
    tail.set(&[0, 1], Scalar::Float64(-2.0)).unwrap();
    assert_eq!(copied.get(&[2, 1]).unwrap(), Scalar::Float64(7.0));
}

#[test]
fn test_zero_extent_operations_are_noops() {
    let x = NdArray::zeros(DType::Float64, &[0, 4], Order::RowMajor);
    let y = NdArray::zeros(DType::Float64, &[0, 4], Order::RowMajor);
    assign(&x, &y).unwrap();
    assert_eq!(x.len(), 0);

    let total = sum(
        &x,
        &ReduceOptions {
            dims: Some(vec![0]),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(total.shape(), &[4]);
    assert_eq!(read_f64(&total), vec![0.0; 4]);
}

#[test]
fn test_assign_large_blocked_matches_reference() {
    // Big enough that the tiled path engages; compare against the
    // element-by-element reference.
    let shape = [64usize, 96];
    let x = iota(&shape, Order::RowMajor);
    let t = transpose(&x).unwrap();
    let y = NdArray::zeros(DType::Float64, t.shape(), Order::RowMajor);
    assign(&t, &y).unwrap();
    for i in 0..96 {
        for j in 0..64 {
            assert_eq!(
                y.get(&[i as isize, j as isize]).unwrap(),
                t.get(&[i as isize, j as isize]).unwrap()
            );
        }
    }
}
