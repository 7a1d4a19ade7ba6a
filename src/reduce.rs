//! The reduction dispatch engine.
//!
//! A [`Reduction`] pairs a kernel [`Dispatcher`] with an output-dtype
//! policy and implements reduce-along-dims semantics on top of them:
//! resolving and validating the `dims` option, computing the reduced output
//! shape, widening the input through a temporary under the `accumulation`
//! policy, invoking the dtype-resolved kernel, and re-inserting singleton
//! axes for `keepdims`.
//!
//! Kernels see `[input, output]` where the input view has been permuted so
//! the reduced axes trail; their contract is to fold the trailing
//! `input.ndims() - output.ndims()` axes into each output element.
//! [`fold_trailing`] is the building block for writing such kernels.

use crate::array::NdArray;
use crate::assign::{assign, block_iter};
use crate::block::block_sizes;
use crate::buffer::Element;
use crate::dispatch::Dispatcher;
use crate::dtype::{is_mostly_safe_cast, resolve_output_dtype, DType, OutputPolicy};
use crate::order::loop_order;
use crate::shape::numel;
use crate::slice::permute_dims;
use crate::{NdError, Result};
use smallvec::SmallVec;
use std::rc::Rc;

/// Options accepted by every reduction call.
#[derive(Debug, Clone, Default)]
pub struct ReduceOptions {
    /// Axes to reduce; `None` reduces all of them.
    pub dims: Option<Vec<isize>>,
    /// Keep reduced axes in the output as size-1 axes.
    pub keepdims: bool,
    /// Pin the output dtype, bypassing the policy (and the accumulation
    /// widening step).
    pub dtype: Option<DType>,
}

/// A reduce-along-dims operation: kernel table plus output-dtype policy.
pub struct Reduction {
    table: Dispatcher,
    policy: OutputPolicy,
}

/// Normalize and validate a `dims` option against a rank.
fn resolve_dims(rank: usize, dims: Option<&[isize]>) -> Result<Vec<usize>> {
    let Some(dims) = dims else {
        return Ok((0..rank).collect());
    };

    let mut out = Vec::with_capacity(dims.len());
    for &d in dims {
        let axis = if d < 0 { d + rank as isize } else { d };
        if axis < 0 || axis >= rank as isize {
            return Err(NdError::InvalidAxis { axis: d, rank });
        }
        out.push(axis as usize);
    }
    out.sort_unstable();
    for pair in out.windows(2) {
        if pair[0] == pair[1] {
            return Err(NdError::DuplicateAxis { axis: pair[0] });
        }
    }
    Ok(out)
}

fn reduced_shape(shape: &[usize], dims: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .enumerate()
        .filter(|(i, _)| !dims.contains(i))
        .map(|(_, &d)| d)
        .collect()
}

impl Reduction {
    /// Create a reduction from a unary-input, unary-output kernel table.
    ///
    /// # Panics
    /// Panics unless the table takes exactly one input and one output.
    pub fn new(table: Dispatcher, policy: OutputPolicy) -> Reduction {
        assert_eq!(table.nin(), 1, "reduction kernels take one input");
        assert_eq!(table.nout(), 1, "reduction kernels take one output");
        Reduction { table, policy }
    }

    /// Reduce into a freshly allocated output array.
    pub fn apply(&self, x: &NdArray, opts: &ReduceOptions) -> Result<NdArray> {
        self.table.check_arg(0, x.dtype())?;
        let dims = resolve_dims(x.ndims(), opts.dims.as_deref())?;
        let out_shape = reduced_shape(x.shape(), &dims);

        let (input, out_dtype) = self.resolve_input(x, opts)?;
        let out = NdArray::zeros(out_dtype, &out_shape, x.order());
        self.invoke_kernel(&input, &out, &dims)?;

        if opts.keepdims {
            return Ok(reinsert_singletons(&out, x.ndims(), &dims));
        }
        Ok(out)
    }

    /// Reduce into a caller-supplied output array.
    ///
    /// The output's shape must equal the input shape with the reduced axes
    /// removed, and its dtype is taken as pinned (no accumulation
    /// widening).
    pub fn assign_into(&self, x: &NdArray, out: &NdArray, opts: &ReduceOptions) -> Result<()> {
        if out.is_readonly() {
            return Err(NdError::ReadOnly);
        }
        self.table.check_arg(0, x.dtype())?;
        let dims = resolve_dims(x.ndims(), opts.dims.as_deref())?;
        let expected = reduced_shape(x.shape(), &dims);
        if out.shape() != expected {
            return Err(NdError::ShapeMismatch(out.shape().to_vec(), expected));
        }
        self.invoke_kernel(x, out, &dims)
    }

    /// Pick the output dtype and, under the accumulation policy, widen the
    /// input through a temporary when the accumulator dtype is a
    /// (mostly-)safe widening of the input dtype. A pinned dtype is used
    /// as-is and never second-guessed, even when the input would not
    /// promote to it.
    fn resolve_input(&self, x: &NdArray, opts: &ReduceOptions) -> Result<(NdArray, DType)> {
        if let Some(pinned) = opts.dtype {
            return Ok((x.clone(), pinned));
        }
        let dtype = resolve_output_dtype(&[x.dtype()], &self.policy)?;
        if self.policy == OutputPolicy::Accumulation
            && dtype != x.dtype()
            && is_mostly_safe_cast(x.dtype(), dtype)
        {
            let widened = NdArray::zeros(dtype, x.shape(), x.order());
            assign(x, &widened)?;
            return Ok((widened, dtype));
        }
        Ok((x.clone(), dtype))
    }

    /// Permute the reduced axes to the back and hand `[input, output]` to
    /// the dtype-resolved kernel.
    fn invoke_kernel(&self, input: &NdArray, out: &NdArray, dims: &[usize]) -> Result<()> {
        let mut perm: Vec<usize> = (0..input.ndims()).filter(|i| !dims.contains(i)).collect();
        perm.extend_from_slice(dims);
        let permuted = permute_dims(input, &perm)?;
        self.table.invoke(&[&permuted, out])
    }
}

/// Re-insert size-1 axes at the reduced positions (metadata only).
fn reinsert_singletons(out: &NdArray, rank: usize, dims: &[usize]) -> NdArray {
    let mut shape = Vec::with_capacity(rank);
    let mut strides = Vec::with_capacity(rank);
    let mut kept = 0usize;
    for axis in 0..rank {
        if dims.contains(&axis) {
            shape.push(1);
            strides.push(0);
        } else {
            shape.push(out.shape()[kept]);
            strides.push(out.strides()[kept]);
            kept += 1;
        }
    }
    out.derived(shape, strides, out.offset())
}

/// Fold the trailing axes of `x` into each element of `out`.
///
/// `x`'s leading `out.ndims()` axes must match `out`'s shape; the
/// remaining axes form the reduced subspace, visited row-major. An empty
/// subspace (a reduced axis of extent 0) leaves `init` in every output
/// element. Output positions are visited in interchange order, so callers
/// must not depend on visitation order.
pub fn fold_trailing<T, A, F>(x: &NdArray, out: &NdArray, init: A, fold: F) -> Result<()>
where
    T: Element,
    A: Element,
    F: Fn(A, T) -> A,
{
    if out.is_readonly() {
        return Err(NdError::ReadOnly);
    }
    let m = out.ndims();
    let n = x.ndims();
    if m > n {
        return Err(NdError::RankMismatch(n, m));
    }
    if &x.shape()[..m] != out.shape() {
        return Err(NdError::ShapeMismatch(
            x.shape()[..m].to_vec(),
            out.shape().to_vec(),
        ));
    }

    let x_data = x.data();
    let out_data = out.data();

    if Rc::ptr_eq(&x_data, &out_data) {
        debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<A>());
        let mut guard = out_data.borrow_mut();
        let a_slice = A::from_buffer_mut(&mut guard).ok_or(NdError::BufferDType {
            expected: A::DTYPE,
            actual: out.dtype(),
        })?;
        let a_ptr = a_slice.as_mut_ptr();
        let t_ptr = a_ptr as *const T;
        unsafe { run_fold(t_ptr, a_ptr, x, out, init, &fold) }
    } else {
        let t_guard = x_data.borrow();
        let mut a_guard = out_data.borrow_mut();
        let t_slice = T::from_buffer(&t_guard).ok_or(NdError::BufferDType {
            expected: T::DTYPE,
            actual: x.dtype(),
        })?;
        let a_slice = A::from_buffer_mut(&mut a_guard).ok_or(NdError::BufferDType {
            expected: A::DTYPE,
            actual: out.dtype(),
        })?;
        unsafe { run_fold(t_slice.as_ptr(), a_slice.as_mut_ptr(), x, out, init, &fold) }
    }
}

/// # Safety
/// `t` and `a` must point at buffers covering every index reachable
/// through the respective view metadata.
unsafe fn run_fold<T: Copy, A: Copy, F>(
    t: *const T,
    a: *mut A,
    x: &NdArray,
    out: &NdArray,
    init: A,
    fold: &F,
) -> Result<()>
where
    F: Fn(A, T) -> A,
{
    let m = out.ndims();
    let outer_dims = out.shape();
    let trailing_dims: Vec<usize> = x.shape()[m..].to_vec();
    let trailing_strides: Vec<isize> = x.strides()[m..].to_vec();
    let subspace = numel(&trailing_dims);
    let depth = trailing_dims.len();

    let strides_list = [out.strides(), &x.strides()[..m]];
    let order = loop_order(outer_dims, &strides_list, Some(0));
    let ordered_dims: Vec<usize> = order.iter().map(|&i| outer_dims[i]).collect();
    let ordered_strides: Vec<Vec<isize>> = strides_list
        .iter()
        .map(|strides| order.iter().map(|&i| strides[i]).collect())
        .collect();
    let elem = std::mem::size_of::<T>().max(std::mem::size_of::<A>());
    let blocks = block_sizes(&ordered_dims, &ordered_strides, elem);

    // Reused carry state for the reduced subspace; a full cycle always
    // leaves it back at all-zeros.
    let mut idx: SmallVec<[usize; 8]> = smallvec::smallvec![0; depth];

    block_iter(
        &ordered_dims,
        &blocks,
        &ordered_strides,
        &[out.offset(), x.offset()],
        |offsets, len, inner| unsafe {
            let mut a_pos = offsets[0];
            let mut t_pos = offsets[1];
            for _ in 0..len {
                let mut acc = init;
                if subspace > 0 {
                    let mut p = t_pos;
                    for _ in 0..subspace {
                        acc = fold(acc, *t.offset(p));
                        // Row-major carry: last trailing axis first.
                        let mut lvl = depth;
                        while lvl > 0 {
                            lvl -= 1;
                            idx[lvl] += 1;
                            p += trailing_strides[lvl];
                            if idx[lvl] < trailing_dims[lvl] {
                                break;
                            }
                            idx[lvl] = 0;
                            p -= trailing_dims[lvl] as isize * trailing_strides[lvl];
                        }
                    }
                }
                *a.offset(a_pos) = acc;
                a_pos += inner[0];
                t_pos += inner[1];
            }
        },
    );
    Ok(())
}
