//! The assign/traversal engine.
//!
//! [`assign`] copies every element of a source view into a same-shape
//! destination view, casting between dtypes on the way. The strategy ladder,
//! cheapest first:
//!
//! 1. 0-D: single element, no loop
//! 2. 1-D (or collapsible to 1-D): direct strided scan
//! 3. contiguous fast path: both views dense with a uniform direction and
//!    the same stride-implied layout — a flat ±1 scan
//! 4. blocked traversal: loop interchange, axis fusion, and cache tiling,
//!    with hand-nested kernels for ranks 1–3 and an index-vector kernel
//!    beyond
//!
//! Dtype pairs resolve to a monomorphized kernel by exact enum match; pairs
//! involving `generic` storage fall back to a Cartesian walk through the
//! dynamic accessor pair.

use crate::array::NdArray;
use crate::block::block_sizes;
use crate::buffer::Element;
use crate::dtype::DType;
use crate::order::{compress_dims, fuse_dims, loop_order};
use crate::shape::{next_cartesian_index_assign, strided_layout, Order};
use crate::{NdError, Result};
use num_complex::{Complex32, Complex64};
use smallvec::SmallVec;
use std::rc::Rc;

/// Copy/cast every element of `src` into `dst`.
///
/// Both views must have identical shapes (ranks and per-dimension extents);
/// empty arrays are a silent no-op. Overlapping, non-identical views over
/// one buffer produce implementation-defined contents — the engine performs
/// no aliasing detection beyond a debug-build assertion.
pub fn assign(src: &NdArray, dst: &NdArray) -> Result<()> {
    if dst.is_readonly() {
        return Err(NdError::ReadOnly);
    }
    if src.ndims() != dst.ndims() {
        return Err(NdError::RankMismatch(src.ndims(), dst.ndims()));
    }
    if src.shape() != dst.shape() {
        return Err(NdError::ShapeMismatch(
            src.shape().to_vec(),
            dst.shape().to_vec(),
        ));
    }
    if dst.is_empty() {
        return Ok(());
    }

    #[cfg(debug_assertions)]
    debug_check_overlap(src, dst);

    dispatch_src(src, dst)
}

#[cfg(debug_assertions)]
fn debug_check_overlap(src: &NdArray, dst: &NdArray) {
    use crate::shape::minmax_view_buffer_index;
    if !Rc::ptr_eq(&src.data(), &dst.data()) {
        return;
    }
    let identical = src.shape() == dst.shape()
        && src.strides() == dst.strides()
        && src.offset() == dst.offset();
    if identical {
        return;
    }
    let (smin, smax) = minmax_view_buffer_index(src.shape(), src.strides(), src.offset());
    let (dmin, dmax) = minmax_view_buffer_index(dst.shape(), dst.strides(), dst.offset());
    debug_assert!(
        smax < dmin || dmax < smin,
        "assign between overlapping, non-identical views of one buffer"
    );
}

// ============================================================================
// Dtype-pair resolution
// ============================================================================

fn dispatch_src(src: &NdArray, dst: &NdArray) -> Result<()> {
    use DType::*;
    match src.dtype() {
        Float64 => dispatch_dst::<f64>(src, dst),
        Float32 => dispatch_dst::<f32>(src, dst),
        Complex128 => dispatch_dst::<num_complex::Complex64>(src, dst),
        Complex64 => dispatch_dst::<Complex32>(src, dst),
        Int8 => dispatch_dst::<i8>(src, dst),
        Int16 => dispatch_dst::<i16>(src, dst),
        Int32 => dispatch_dst::<i32>(src, dst),
        Int64 => dispatch_dst::<i64>(src, dst),
        Uint8 | Uint8Clamped | Binary => dispatch_dst::<u8>(src, dst),
        Uint16 => dispatch_dst::<u16>(src, dst),
        Uint32 => dispatch_dst::<u32>(src, dst),
        Uint64 => dispatch_dst::<u64>(src, dst),
        Bool => dispatch_dst::<bool>(src, dst),
        Generic => assign_fallback(src, dst),
    }
}

fn dispatch_dst<S: Castable>(src: &NdArray, dst: &NdArray) -> Result<()> {
    use DType::*;
    match dst.dtype() {
        Float64 => assign_typed::<S, f64>(src, dst, S::to_f64),
        Float32 => assign_typed::<S, f32>(src, dst, S::to_f32),
        Complex128 => assign_typed::<S, num_complex::Complex64>(src, dst, S::to_c128),
        Complex64 => assign_typed::<S, Complex32>(src, dst, S::to_c64),
        Int8 => assign_typed::<S, i8>(src, dst, S::to_i8),
        Int16 => assign_typed::<S, i16>(src, dst, S::to_i16),
        Int32 => assign_typed::<S, i32>(src, dst, S::to_i32),
        Int64 => assign_typed::<S, i64>(src, dst, S::to_i64),
        Uint8 | Binary => assign_typed::<S, u8>(src, dst, S::to_u8),
        Uint8Clamped => assign_typed::<S, u8>(src, dst, S::to_u8_clamped),
        Uint16 => assign_typed::<S, u16>(src, dst, S::to_u16),
        Uint32 => assign_typed::<S, u32>(src, dst, S::to_u32),
        Uint64 => assign_typed::<S, u64>(src, dst, S::to_u64),
        Bool => assign_typed::<S, bool>(src, dst, S::to_bool),
        Generic => assign_fallback(src, dst),
    }
}

/// Element types usable as the source of a typed assign kernel.
///
/// One method per concrete target; real sources fill a zero imaginary part
/// going to complex, complex sources keep only their real component going
/// to real targets, and the clamped target rounds floats then saturates.
pub(crate) trait Castable: Element {
    fn to_f64(self) -> f64;
    fn to_f32(self) -> f32;
    fn to_c128(self) -> Complex64;
    fn to_c64(self) -> Complex32;
    fn to_i8(self) -> i8;
    fn to_i16(self) -> i16;
    fn to_i32(self) -> i32;
    fn to_i64(self) -> i64;
    fn to_u8(self) -> u8;
    fn to_u8_clamped(self) -> u8;
    fn to_u16(self) -> u16;
    fn to_u32(self) -> u32;
    fn to_u64(self) -> u64;
    fn to_bool(self) -> bool;
}

macro_rules! castable_common {
    () => {
        fn to_f64(self) -> f64 {
            self as f64
        }
        fn to_f32(self) -> f32 {
            self as f32
        }
        fn to_c128(self) -> Complex64 {
            Complex64::new(self as f64, 0.0)
        }
        fn to_c64(self) -> Complex32 {
            Complex32::new(self as f32, 0.0)
        }
        fn to_i8(self) -> i8 {
            self as i8
        }
        fn to_i16(self) -> i16 {
            self as i16
        }
        fn to_i32(self) -> i32 {
            self as i32
        }
        fn to_i64(self) -> i64 {
            self as i64
        }
        fn to_u8(self) -> u8 {
            self as u8
        }
        fn to_u16(self) -> u16 {
            self as u16
        }
        fn to_u32(self) -> u32 {
            self as u32
        }
        fn to_u64(self) -> u64 {
            self as u64
        }
    };
}

macro_rules! impl_castable_float {
    ($($t:ty),*) => {$(
        impl Castable for $t {
            castable_common!();
            fn to_u8_clamped(self) -> u8 {
                (self as f64).round().clamp(0.0, 255.0) as u8
            }
            fn to_bool(self) -> bool {
                self != 0.0
            }
        }
    )*};
}

macro_rules! impl_castable_signed {
    ($($t:ty),*) => {$(
        impl Castable for $t {
            castable_common!();
            fn to_u8_clamped(self) -> u8 {
                (self as i64).clamp(0, 255) as u8
            }
            fn to_bool(self) -> bool {
                self != 0
            }
        }
    )*};
}

macro_rules! impl_castable_unsigned {
    ($($t:ty),*) => {$(
        impl Castable for $t {
            castable_common!();
            fn to_u8_clamped(self) -> u8 {
                (self as u64).min(255) as u8
            }
            fn to_bool(self) -> bool {
                self != 0
            }
        }
    )*};
}

impl_castable_float!(f64, f32);
impl_castable_signed!(i8, i16, i32, i64);
impl_castable_unsigned!(u8, u16, u32, u64);

macro_rules! impl_castable_complex {
    ($($t:ty),*) => {$(
        impl Castable for $t {
            fn to_f64(self) -> f64 {
                self.re as f64
            }
            fn to_f32(self) -> f32 {
                self.re as f32
            }
            fn to_c128(self) -> Complex64 {
                Complex64::new(self.re as f64, self.im as f64)
            }
            fn to_c64(self) -> Complex32 {
                Complex32::new(self.re as f32, self.im as f32)
            }
            fn to_i8(self) -> i8 {
                self.re as i8
            }
            fn to_i16(self) -> i16 {
                self.re as i16
            }
            fn to_i32(self) -> i32 {
                self.re as i32
            }
            fn to_i64(self) -> i64 {
                self.re as i64
            }
            fn to_u8(self) -> u8 {
                self.re as u8
            }
            fn to_u8_clamped(self) -> u8 {
                (self.re as f64).round().clamp(0.0, 255.0) as u8
            }
            fn to_u16(self) -> u16 {
                self.re as u16
            }
            fn to_u32(self) -> u32 {
                self.re as u32
            }
            fn to_u64(self) -> u64 {
                self.re as u64
            }
            fn to_bool(self) -> bool {
                self.re != 0.0 || self.im != 0.0
            }
        }
    )*};
}

impl_castable_complex!(Complex64, Complex32);

impl Castable for bool {
    fn to_f64(self) -> f64 {
        self as u8 as f64
    }
    fn to_f32(self) -> f32 {
        self as u8 as f32
    }
    fn to_c128(self) -> Complex64 {
        Complex64::new(self as u8 as f64, 0.0)
    }
    fn to_c64(self) -> Complex32 {
        Complex32::new(self as u8 as f32, 0.0)
    }
    fn to_i8(self) -> i8 {
        self as i8
    }
    fn to_i16(self) -> i16 {
        self as i16
    }
    fn to_i32(self) -> i32 {
        self as i32
    }
    fn to_i64(self) -> i64 {
        self as i64
    }
    fn to_u8(self) -> u8 {
        self as u8
    }
    fn to_u8_clamped(self) -> u8 {
        self as u8
    }
    fn to_u16(self) -> u16 {
        self as u16
    }
    fn to_u32(self) -> u32 {
        self as u32
    }
    fn to_u64(self) -> u64 {
        self as u64
    }
    fn to_bool(self) -> bool {
        self
    }
}

// ============================================================================
// Typed kernel
// ============================================================================

fn assign_typed<S: Element, D: Element>(src: &NdArray, dst: &NdArray, cast: fn(S) -> D) -> Result<()> {
    let src_data = src.data();
    let dst_data = dst.data();

    if Rc::ptr_eq(&src_data, &dst_data) {
        // One buffer, one borrow; the dtype (and therefore the element
        // type) of both views matches the buffer's.
        debug_assert_eq!(std::mem::size_of::<S>(), std::mem::size_of::<D>());
        let mut guard = dst_data.borrow_mut();
        let d_slice = D::from_buffer_mut(&mut guard).ok_or(NdError::BufferDType {
            expected: D::DTYPE,
            actual: dst.dtype(),
        })?;
        let d_ptr = d_slice.as_mut_ptr();
        let s_ptr = d_ptr as *const S;
        unsafe { run_typed(s_ptr, d_ptr, src, dst, cast) }
    } else {
        let s_guard = src_data.borrow();
        let mut d_guard = dst_data.borrow_mut();
        let s_slice = S::from_buffer(&s_guard).ok_or(NdError::BufferDType {
            expected: S::DTYPE,
            actual: src.dtype(),
        })?;
        let d_slice = D::from_buffer_mut(&mut d_guard).ok_or(NdError::BufferDType {
            expected: D::DTYPE,
            actual: dst.dtype(),
        })?;
        unsafe { run_typed(s_slice.as_ptr(), d_slice.as_mut_ptr(), src, dst, cast) }
    }
}

/// Strategy ladder over raw base pointers.
///
/// # Safety
/// `s` and `d` must point at buffers that contain every index reachable
/// through the respective view metadata (guaranteed by view construction).
unsafe fn run_typed<S: Copy, D: Copy>(
    s: *const S,
    d: *mut D,
    src: &NdArray,
    dst: &NdArray,
    cast: fn(S) -> D,
) -> Result<()> {
    let shape = dst.shape();
    let rank = shape.len();

    if rank == 0 {
        *d.offset(dst.offset()) = cast(*s.offset(src.offset()));
        return Ok(());
    }

    // 1-D, or effectively 1-D because at most one axis is non-singleton.
    let wide_axes: SmallVec<[usize; 8]> = (0..rank).filter(|&i| shape[i] > 1).collect();
    if rank == 1 || wide_axes.len() <= 1 {
        let (n, ss, ds) = match wide_axes.first() {
            Some(&ax) => (shape[ax], src.strides()[ax], dst.strides()[ax]),
            None if rank == 1 => (shape[0], src.strides()[0], dst.strides()[0]),
            None => (1, 0, 0),
        };
        scan_1d(s, src.offset(), ss, d, dst.offset(), ds, n, cast);
        return Ok(());
    }

    // Contiguous fast path: both views dense, uniform direction, same
    // stride-implied layout. Each then enumerates its elements as a ±1
    // walk starting at its own logical first element.
    let io_s = src.iteration_order();
    let io_d = dst.iteration_order();
    if io_s != 0 && io_d != 0 && src.is_contiguous() && dst.is_contiguous() {
        let layout_s = strided_layout(shape, src.strides());
        let layout_d = strided_layout(shape, dst.strides());
        if layout_s.is_some() && layout_s == layout_d {
            scan_1d(
                s,
                src.offset(),
                io_s as isize,
                d,
                dst.offset(),
                io_d as isize,
                dst.len(),
                cast,
            );
            return Ok(());
        }
    }

    // Blocked traversal: destination first so it gets the double vote.
    let strides_list = [dst.strides(), src.strides()];
    let order = loop_order(shape, &strides_list, Some(0));
    let ordered_dims: Vec<usize> = order.iter().map(|&i| shape[i]).collect();
    let ordered_strides: Vec<Vec<isize>> = strides_list
        .iter()
        .map(|strides| order.iter().map(|&i| strides[i]).collect())
        .collect();
    let ordered_refs: Vec<&[isize]> = ordered_strides.iter().map(|v| v.as_slice()).collect();

    let fused = fuse_dims(&ordered_dims, &ordered_refs);
    let (dims, strides) = compress_dims(&fused, &ordered_strides);
    let elem = std::mem::size_of::<S>().max(std::mem::size_of::<D>());
    let blocks = block_sizes(&dims, &strides, elem);

    block_iter(
        &dims,
        &blocks,
        &strides,
        &[dst.offset(), src.offset()],
        |offsets, len, inner| unsafe {
            let mut dp = d.offset(offsets[0]);
            let mut sp = s.offset(offsets[1]);
            for _ in 0..len {
                *dp = cast(*sp);
                dp = dp.offset(inner[0]);
                sp = sp.offset(inner[1]);
            }
        },
    );
    Ok(())
}

#[inline]
unsafe fn scan_1d<S: Copy, D: Copy>(
    s: *const S,
    s_off: isize,
    s_stride: isize,
    d: *mut D,
    d_off: isize,
    d_stride: isize,
    n: usize,
    cast: fn(S) -> D,
) {
    let mut sp = s.offset(s_off);
    let mut dp = d.offset(d_off);
    for _ in 0..n {
        *dp = cast(*sp);
        sp = sp.offset(s_stride);
        dp = dp.offset(d_stride);
    }
}

// ============================================================================
// Blocked iteration
// ============================================================================

/// Walk a traversal space block by block.
///
/// `dims`, `blocks`, and every stride vector must already be in iteration
/// order (innermost axis first). The callback receives the current buffer
/// offsets for each view, the innermost fragment length, and the innermost
/// strides; ranks 1–3 run hand-nested loops, higher ranks an index-vector
/// carry loop that blocks the innermost axis only.
pub(crate) fn block_iter<F>(
    dims: &[usize],
    blocks: &[usize],
    strides: &[Vec<isize>],
    init_offsets: &[isize],
    mut f: F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    let rank = dims.len();
    let m = strides.len();
    let mut offsets: SmallVec<[isize; 4]> = SmallVec::from_slice(init_offsets);

    if rank == 0 {
        let inner: SmallVec<[isize; 4]> = smallvec::smallvec![0; m];
        f(&offsets, 1, &inner);
        return;
    }
    if dims.contains(&0) {
        return;
    }

    let inner: SmallVec<[isize; 4]> = strides.iter().map(|s| s[0]).collect();
    let d0 = dims[0];
    let b0 = blocks[0].clamp(1, d0);

    match rank {
        1 => {
            let mut j0 = 0;
            while j0 < d0 {
                let l0 = b0.min(d0 - j0);
                f(&offsets, l0, &inner);
                for (o, s) in offsets.iter_mut().zip(strides) {
                    *o += l0 as isize * s[0];
                }
                j0 += l0;
            }
        }
        2 => {
            let d1 = dims[1];
            let b1 = blocks[1].clamp(1, d1);
            let mut j1 = 0;
            while j1 < d1 {
                let l1 = b1.min(d1 - j1);
                let mut j0 = 0;
                while j0 < d0 {
                    let l0 = b0.min(d0 - j0);
                    for _ in 0..l1 {
                        f(&offsets, l0, &inner);
                        for (o, s) in offsets.iter_mut().zip(strides) {
                            *o += s[1];
                        }
                    }
                    for (o, s) in offsets.iter_mut().zip(strides) {
                        *o -= l1 as isize * s[1];
                        *o += l0 as isize * s[0];
                    }
                    j0 += l0;
                }
                for (o, s) in offsets.iter_mut().zip(strides) {
                    *o -= d0 as isize * s[0];
                    *o += l1 as isize * s[1];
                }
                j1 += l1;
            }
        }
        3 => {
            let d1 = dims[1];
            let d2 = dims[2];
            let b1 = blocks[1].clamp(1, d1);
            let b2 = blocks[2].clamp(1, d2);
            let mut j2 = 0;
            while j2 < d2 {
                let l2 = b2.min(d2 - j2);
                let mut j1 = 0;
                while j1 < d1 {
                    let l1 = b1.min(d1 - j1);
                    let mut j0 = 0;
                    while j0 < d0 {
                        let l0 = b0.min(d0 - j0);
                        for _ in 0..l2 {
                            for _ in 0..l1 {
                                f(&offsets, l0, &inner);
                                for (o, s) in offsets.iter_mut().zip(strides) {
                                    *o += s[1];
                                }
                            }
                            for (o, s) in offsets.iter_mut().zip(strides) {
                                *o -= l1 as isize * s[1];
                                *o += s[2];
                            }
                        }
                        for (o, s) in offsets.iter_mut().zip(strides) {
                            *o -= l2 as isize * s[2];
                            *o += l0 as isize * s[0];
                        }
                        j0 += l0;
                    }
                    for (o, s) in offsets.iter_mut().zip(strides) {
                        *o -= d0 as isize * s[0];
                        *o += l1 as isize * s[1];
                    }
                    j1 += l1;
                }
                for (o, s) in offsets.iter_mut().zip(strides) {
                    *o -= d1 as isize * s[1];
                    *o += l2 as isize * s[2];
                }
                j2 += l2;
            }
        }
        _ => {
            let mut idx: SmallVec<[usize; 8]> = smallvec::smallvec![0; rank];
            loop {
                let mut j0 = 0;
                while j0 < d0 {
                    let l0 = b0.min(d0 - j0);
                    f(&offsets, l0, &inner);
                    for (o, s) in offsets.iter_mut().zip(strides) {
                        *o += l0 as isize * s[0];
                    }
                    j0 += l0;
                }
                for (o, s) in offsets.iter_mut().zip(strides) {
                    *o -= d0 as isize * s[0];
                }

                let mut level = 1;
                loop {
                    for (o, s) in offsets.iter_mut().zip(strides) {
                        *o += s[level];
                    }
                    idx[level] += 1;
                    if idx[level] < dims[level] {
                        break;
                    }
                    idx[level] = 0;
                    for (o, s) in offsets.iter_mut().zip(strides) {
                        *o -= dims[level] as isize * s[level];
                    }
                    level += 1;
                    if level == rank {
                        return;
                    }
                }
            }
        }
    }
}

// ============================================================================
// Dynamic fallback
// ============================================================================

/// Cartesian walk through the dynamic accessor pair, for pairs with no
/// typed kernel (`generic` storage on either side).
fn assign_fallback(src: &NdArray, dst: &NdArray) -> Result<()> {
    let shape = dst.shape().to_vec();
    let rank = shape.len();
    let n = dst.len();
    let order = dst.order();
    let step_dim: isize = match order {
        Order::RowMajor => -1,
        Order::ColMajor => 0,
    };

    let src_data = src.data();
    let dst_data = dst.data();
    let mut idx: SmallVec<[usize; 8]> = smallvec::smallvec![0; rank];

    for _ in 0..n {
        let mut s_pos = src.offset();
        let mut d_pos = dst.offset();
        for k in 0..rank {
            s_pos += idx[k] as isize * src.strides()[k];
            d_pos += idx[k] as isize * dst.strides()[k];
        }
        let value = src_data.borrow().get(s_pos as usize);
        dst_data.borrow_mut().set(d_pos as usize, value)?;
        if rank > 0 {
            next_cartesian_index_assign(&shape, order, step_dim, &mut idx)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::scalar::Scalar;

    fn f64_array(values: Vec<f64>, shape: Vec<usize>, strides: Vec<isize>, offset: isize) -> NdArray {
        NdArray::new(
            DType::Float64,
            Buffer::Float64(values),
            shape,
            strides,
            offset,
            Order::RowMajor,
        )
        .unwrap()
    }

    fn read_all(x: &NdArray) -> Vec<Scalar> {
        let shape = x.shape().to_vec();
        let mut idx = vec![0usize; x.ndims()];
        let mut out = Vec::with_capacity(x.len());
        for _ in 0..x.len() {
            let signed: Vec<isize> = idx.iter().map(|&i| i as isize).collect();
            out.push(x.get(&signed).unwrap());
            if x.ndims() > 0 {
                next_cartesian_index_assign(&shape, Order::RowMajor, -1, &mut idx).unwrap();
            }
        }
        out
    }

    #[test]
    fn test_assign_0d() {
        let x = f64_array(vec![5.0], vec![], vec![], 0);
        let y = NdArray::zeros(DType::Float64, &[], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(y.get(&[]).unwrap(), Scalar::Float64(5.0));
    }

    #[test]
    fn test_assign_1d_reversed() {
        let x = f64_array(vec![1.0, 2.0, 3.0], vec![3], vec![-1], 2);
        let y = NdArray::zeros(DType::Float64, &[3], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(
            read_all(&y),
            vec![
                Scalar::Float64(3.0),
                Scalar::Float64(2.0),
                Scalar::Float64(1.0)
            ]
        );
    }

    #[test]
    fn test_assign_collapse_to_1d() {
        // 3x1x2-ish singleton collapse: only axis 2 is wide.
        let x = f64_array(vec![1.0, 2.0, 3.0], vec![1, 3, 1], vec![0, 1, 0], 0);
        let y = NdArray::zeros(DType::Float64, &[1, 3, 1], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(y.get(&[0, 2, 0]).unwrap(), Scalar::Float64(3.0));
    }

    #[test]
    fn test_assign_contiguous_fast_path() {
        let x = f64_array((0..24).map(|v| v as f64).collect(), vec![2, 3, 4], vec![12, 4, 1], 0);
        let y = NdArray::zeros(DType::Float64, &[2, 3, 4], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(read_all(&x), read_all(&y));
    }

    #[test]
    fn test_assign_reverse_contiguous() {
        // Fully reversed view: iteration order -1, still contiguous.
        let x = f64_array(
            (0..6).map(|v| v as f64).collect(),
            vec![2, 3],
            vec![-3, -1],
            5,
        );
        let y = NdArray::zeros(DType::Float64, &[2, 3], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(y.get(&[0, 0]).unwrap(), Scalar::Float64(5.0));
        assert_eq!(y.get(&[1, 2]).unwrap(), Scalar::Float64(0.0));
    }

    #[test]
    fn test_assign_transposed_blocked() {
        // Transposed source forces the interchange/blocked path.
        let x = f64_array((0..12).map(|v| v as f64).collect(), vec![4, 3], vec![1, 4], 0);
        let y = NdArray::zeros(DType::Float64, &[4, 3], Order::RowMajor);
        assign(&x, &y).unwrap();
        for i in 0..4 {
            for j in 0..3 {
                assert_eq!(
                    y.get(&[i, j]).unwrap(),
                    x.get(&[i, j]).unwrap(),
                    "mismatch at ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn test_assign_high_rank() {
        let shape = vec![2usize, 2, 2, 2, 2];
        let x = NdArray::zeros(DType::Float64, &shape, Order::RowMajor);
        for i in 0..x.len() {
            // Scatter distinct values through the flat buffer.
            x.data().borrow_mut().set(i, Scalar::Float64(i as f64)).unwrap();
        }
        // Reverse the outermost axis to defeat every fast path.
        let rev = crate::slice::reverse_dim(&x, 0).unwrap();
        let y = NdArray::zeros(DType::Float64, &shape, Order::RowMajor);
        assign(&rev, &y).unwrap();
        assert_eq!(read_all(&y), read_all(&rev));
    }

    #[test]
    fn test_assign_casts_dtype() {
        let x = NdArray::new(
            DType::Int8,
            Buffer::Int8(vec![-1, 0, 7]),
            vec![3],
            vec![1],
            0,
            Order::RowMajor,
        )
        .unwrap();
        let y = NdArray::zeros(DType::Float32, &[3], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(y.get(&[0]).unwrap(), Scalar::Float32(-1.0));

        let z = NdArray::zeros(DType::Complex128, &[3], Order::RowMajor);
        assign(&x, &z).unwrap();
        assert_eq!(
            z.get(&[2]).unwrap(),
            Scalar::Complex128(Complex64::new(7.0, 0.0))
        );
    }

    #[test]
    fn test_assign_clamped_destination() {
        let x = NdArray::new(
            DType::Int16,
            Buffer::Int16(vec![-5, 100, 999]),
            vec![3],
            vec![1],
            0,
            Order::RowMajor,
        )
        .unwrap();
        let y = NdArray::zeros(DType::Uint8Clamped, &[3], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(y.get(&[0]).unwrap(), Scalar::Uint8(0));
        assert_eq!(y.get(&[1]).unwrap(), Scalar::Uint8(100));
        assert_eq!(y.get(&[2]).unwrap(), Scalar::Uint8(255));
    }

    #[test]
    fn test_assign_complex_to_real_truncates() {
        let x = NdArray::new(
            DType::Complex128,
            Buffer::Complex128(vec![Complex64::new(1.5, 9.0)]),
            vec![1],
            vec![1],
            0,
            Order::RowMajor,
        )
        .unwrap();
        let y = NdArray::zeros(DType::Float64, &[1], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(y.get(&[0]).unwrap(), Scalar::Float64(1.5));
    }

    #[test]
    fn test_assign_generic_fallback() {
        let x = NdArray::new(
            DType::Generic,
            Buffer::Generic(vec![
                Scalar::Int32(1),
                Scalar::Float64(2.5),
                Scalar::Bool(true),
            ]),
            vec![3],
            vec![1],
            0,
            Order::RowMajor,
        )
        .unwrap();
        let y = NdArray::zeros(DType::Float64, &[3], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(
            read_all(&y),
            vec![
                Scalar::Float64(1.0),
                Scalar::Float64(2.5),
                Scalar::Float64(1.0)
            ]
        );
    }

    #[test]
    fn test_assign_into_generic() {
        let x = f64_array(vec![1.0, 2.0], vec![2], vec![1], 0);
        let y = NdArray::zeros(DType::Generic, &[2], Order::RowMajor);
        assign(&x, &y).unwrap();
        assert_eq!(y.get(&[1]).unwrap(), Scalar::Float64(2.0));
    }

    #[test]
    fn test_assign_rejects_shape_mismatch() {
        let x = NdArray::zeros(DType::Float64, &[2, 3], Order::RowMajor);
        let y = NdArray::zeros(DType::Float64, &[3, 2], Order::RowMajor);
        assert!(matches!(
            assign(&x, &y).unwrap_err(),
            NdError::ShapeMismatch(_, _)
        ));

        let z = NdArray::zeros(DType::Float64, &[6], Order::RowMajor);
        assert!(matches!(
            assign(&x, &z).unwrap_err(),
            NdError::RankMismatch(2, 1)
        ));
    }

    #[test]
    fn test_assign_readonly_rejected() {
        let x = NdArray::zeros(DType::Float64, &[2], Order::RowMajor);
        let y = NdArray::zeros(DType::Float64, &[2], Order::RowMajor).into_readonly();
        assert!(matches!(assign(&x, &y).unwrap_err(), NdError::ReadOnly));
    }

    #[test]
    fn test_assign_empty_is_noop() {
        let x = NdArray::zeros(DType::Float64, &[0, 3], Order::RowMajor);
        let y = NdArray::zeros(DType::Float64, &[0, 3], Order::RowMajor);
        assign(&x, &y).unwrap();
    }

    #[test]
    fn test_assign_identical_views_same_buffer() {
        let x = NdArray::zeros(DType::Float64, &[4], Order::RowMajor);
        x.set(&[1], Scalar::Float64(3.0)).unwrap();
        let alias = x.clone();
        assign(&x, &alias).unwrap();
        assert_eq!(alias.get(&[1]).unwrap(), Scalar::Float64(3.0));
    }

    #[test]
    fn test_block_iter_covers_all_elements() {
        let dims = [3usize, 4, 2, 2, 3];
        let strides = vec![
            crate::shape::shape_to_strides(&dims, Order::RowMajor),
            crate::shape::shape_to_strides(&dims, Order::ColMajor),
        ];
        let blocks = vec![2usize, 2, 1, 2, 2];
        let mut count = 0usize;
        block_iter(&dims, &blocks, &strides, &[0, 0], |_, len, _| {
            count += len;
        });
        assert_eq!(count, dims.iter().product::<usize>());
    }

    #[test]
    fn test_block_iter_rank0() {
        let mut calls = 0;
        block_iter(&[], &[], &[vec![], vec![]], &[5, 7], |offsets, len, _| {
            calls += 1;
            assert_eq!(len, 1);
            assert_eq!(offsets, &[5, 7]);
        });
        assert_eq!(calls, 1);
    }
}
