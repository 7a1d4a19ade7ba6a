//! Operations built on the assign, broadcast, dispatch, and reduction
//! engines.
//!
//! These are deliberately thin: each one exists because it exercises an
//! engine composition (`fill` is a 0-D broadcast plus assign, `sum` is a
//! kernel table under the accumulation policy) and doubles as reference
//! usage for callers supplying their own kernel tables.

use crate::array::NdArray;
use crate::assign::assign;
use crate::broadcast::broadcast_to;
use crate::buffer::Buffer;
use crate::dispatch::Dispatcher;
use crate::dtype::{DType, OutputPolicy};
use crate::reduce::{fold_trailing, ReduceOptions, Reduction};
use crate::scalar::Scalar;
use crate::shape::{next_cartesian_index_assign, numel, Order};
use crate::Result;
use num_complex::Complex64;

/// Copy an array into a freshly allocated one of the same dtype and shape.
pub fn copy(x: &NdArray) -> Result<NdArray> {
    let out = NdArray::zeros(x.dtype(), x.shape(), x.order());
    assign(x, &out)?;
    Ok(out)
}

/// Fill an array with one value, cast to the array's dtype.
///
/// The value becomes a 0-D array broadcast across the full shape, so the
/// write path is the same zero-stride traversal any broadcast input takes.
pub fn fill(x: &NdArray, value: Scalar) -> Result<()> {
    let dtype = value.dtype();
    let scalar = NdArray::new(dtype, Buffer::zeros(dtype, 1), vec![], vec![], 0, x.order())?;
    scalar.set(&[], value)?;
    let expanded = broadcast_to(&scalar, x.shape())?;
    assign(&expanded, x)
}

// ============================================================================
// sum
// ============================================================================

macro_rules! sum_kernel {
    ($name:ident, $t:ty) => {
        fn $name(args: &[&NdArray]) -> Result<()> {
            fold_trailing::<$t, $t, _>(args[0], args[1], <$t as num_traits::Zero>::zero(), |acc, v| {
                acc + v
            })
        }
    };
}

sum_kernel!(sum_f64, f64);
sum_kernel!(sum_f32, f32);
sum_kernel!(sum_c128, Complex64);
sum_kernel!(sum_i32, i32);
sum_kernel!(sum_i64, i64);
sum_kernel!(sum_u32, u32);
sum_kernel!(sum_u64, u64);

/// Generic fallback: dynamic accessors, complex accumulator.
fn sum_any(args: &[&NdArray]) -> Result<()> {
    let x = args[0];
    let out = args[1];
    let m = out.ndims();
    let out_shape = out.shape().to_vec();
    let trailing = x.shape()[m..].to_vec();
    let subspace = numel(&trailing);

    let mut oidx = vec![0usize; m];
    for _ in 0..out.len() {
        let mut acc = Complex64::new(0.0, 0.0);
        let mut tidx = vec![0usize; trailing.len()];
        let mut full: Vec<isize> = Vec::with_capacity(x.ndims());
        for _ in 0..subspace {
            full.clear();
            full.extend(oidx.iter().map(|&i| i as isize));
            full.extend(tidx.iter().map(|&i| i as isize));
            match x.get(&full)?.cast(DType::Complex128)? {
                Scalar::Complex128(c) => acc += c,
                _ => unreachable!(),
            }
            if !trailing.is_empty() {
                next_cartesian_index_assign(&trailing, Order::RowMajor, -1, &mut tidx)?;
            }
        }
        let at: Vec<isize> = oidx.iter().map(|&i| i as isize).collect();
        out.set(&at, Scalar::Complex128(acc))?;
        if m > 0 {
            next_cartesian_index_assign(&out_shape, Order::RowMajor, -1, &mut oidx)?;
        }
    }
    Ok(())
}

fn sum_reduction() -> Reduction {
    use DType::*;
    let table = Dispatcher::new(1, 1, sum_any)
        .accept(
            0,
            &[
                Float64, Float32, Complex128, Complex64, Int8, Int16, Int32, Int64, Uint8,
                Uint8Clamped, Uint16, Uint32, Uint64, Bool, Generic,
            ],
        )
        .register(&[Float64, Float64], sum_f64)
        .register(&[Float32, Float32], sum_f32)
        .register(&[Complex128, Complex128], sum_c128)
        .register(&[Int32, Int32], sum_i32)
        .register(&[Int64, Int64], sum_i64)
        .register(&[Uint32, Uint32], sum_u32)
        .register(&[Uint64, Uint64], sum_u64);
    Reduction::new(table, OutputPolicy::Accumulation)
}

/// Sum along dimensions under the accumulation policy.
///
/// Narrow integer and bool inputs widen before reducing, so summing many
/// `int8` values cannot wrap.
pub fn sum(x: &NdArray, opts: &ReduceOptions) -> Result<NdArray> {
    sum_reduction().apply(x, opts)
}

// ============================================================================
// max
// ============================================================================

macro_rules! max_kernel {
    ($name:ident, $t:ty, $init:expr, $pick:expr) => {
        fn $name(args: &[&NdArray]) -> Result<()> {
            fold_trailing::<$t, $t, _>(args[0], args[1], $init, $pick)
        }
    };
}

max_kernel!(max_f64, f64, f64::NEG_INFINITY, |a, v| f64::max(a, v));
max_kernel!(max_f32, f32, f32::NEG_INFINITY, |a, v| f32::max(a, v));
max_kernel!(max_i32, i32, i32::MIN, |a: i32, v| a.max(v));
max_kernel!(max_i64, i64, i64::MIN, |a: i64, v| a.max(v));
max_kernel!(max_u32, u32, u32::MIN, |a: u32, v| a.max(v));
max_kernel!(max_u64, u64, u64::MIN, |a: u64, v| a.max(v));
max_kernel!(max_u8, u8, u8::MIN, |a: u8, v| a.max(v));

/// Generic fallback: compare through `f64`.
fn max_any(args: &[&NdArray]) -> Result<()> {
    let x = args[0];
    let out = args[1];
    let m = out.ndims();
    let out_shape = out.shape().to_vec();
    let trailing = x.shape()[m..].to_vec();
    let subspace = numel(&trailing);

    let mut oidx = vec![0usize; m];
    for _ in 0..out.len() {
        let mut acc = f64::NEG_INFINITY;
        let mut tidx = vec![0usize; trailing.len()];
        let mut full: Vec<isize> = Vec::with_capacity(x.ndims());
        for _ in 0..subspace {
            full.clear();
            full.extend(oidx.iter().map(|&i| i as isize));
            full.extend(tidx.iter().map(|&i| i as isize));
            match x.get(&full)?.cast(DType::Float64)? {
                Scalar::Float64(v) => acc = acc.max(v),
                _ => unreachable!(),
            }
            if !trailing.is_empty() {
                next_cartesian_index_assign(&trailing, Order::RowMajor, -1, &mut tidx)?;
            }
        }
        let at: Vec<isize> = oidx.iter().map(|&i| i as isize).collect();
        out.set(&at, Scalar::Float64(acc))?;
        if m > 0 {
            next_cartesian_index_assign(&out_shape, Order::RowMajor, -1, &mut oidx)?;
        }
    }
    Ok(())
}

fn max_reduction() -> Reduction {
    use DType::*;
    let table = Dispatcher::new(1, 1, max_any)
        .accept(
            0,
            &[
                Float64, Float32, Int8, Int16, Int32, Int64, Uint8, Uint8Clamped, Uint16, Uint32,
                Uint64, Bool,
            ],
        )
        .register(&[Float64, Float64], max_f64)
        .register(&[Float32, Float32], max_f32)
        .register(&[Int32, Int32], max_i32)
        .register(&[Int64, Int64], max_i64)
        .register(&[Uint32, Uint32], max_u32)
        .register(&[Uint64, Uint64], max_u64)
        .register(&[Uint8, Uint8], max_u8);
    Reduction::new(table, OutputPolicy::Promoted)
}

/// Maximum along dimensions. Complex inputs are rejected (no ordering).
pub fn max(x: &NdArray, opts: &ReduceOptions) -> Result<NdArray> {
    max_reduction().apply(x, opts)
}
