//! The ndarray view type.
//!
//! An [`NdArray`] binds a shared buffer to a dtype tag, shape, strides,
//! offset, and memory-order flag. It is a lightweight view: construction
//! validates that every reachable multi-index stays inside the buffer, and
//! after that the metadata is immutable. Many views may alias one buffer;
//! slicing and broadcasting rely on exactly that.

use crate::buffer::Buffer;
use crate::dtype::DType;
use crate::scalar::Scalar;
use crate::shape::{
    is_contiguous, iteration_order, minmax_view_buffer_index, numel, shape_to_strides, Order,
};
use crate::{NdError, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// Out-of-bounds index handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Out-of-bounds indices are an error.
    Throw,
    /// Negative indices count from the end, then out-of-bounds is an error.
    Normalize,
    /// Indices wrap modulo the dimension size.
    Wrap,
    /// Indices saturate to `[0, size - 1]`.
    Clamp,
}

/// A strided view over a shared, dtype-tagged buffer.
#[derive(Debug, Clone)]
pub struct NdArray {
    dtype: DType,
    data: Rc<RefCell<Buffer>>,
    shape: Vec<usize>,
    strides: Vec<isize>,
    offset: isize,
    order: Order,
    mode: Mode,
    submode: Vec<Mode>,
    readonly: bool,
}

impl NdArray {
    /// Create a view over `buffer`, validating the metadata.
    ///
    /// The buffer must store elements of `dtype`, `strides` must have one
    /// entry per shape axis, and unless the array is empty the reachable
    /// buffer index range must fit inside the buffer.
    pub fn new(
        dtype: DType,
        buffer: Buffer,
        shape: Vec<usize>,
        strides: Vec<isize>,
        offset: isize,
        order: Order,
    ) -> Result<NdArray> {
        if buffer.dtype() != dtype {
            return Err(NdError::BufferDType {
                expected: dtype,
                actual: buffer.dtype(),
            });
        }
        if strides.len() != shape.len() {
            return Err(NdError::StrideLengthMismatch {
                strides: strides.len(),
                dims: shape.len(),
            });
        }
        if numel(&shape) > 0 {
            let (min, max) = minmax_view_buffer_index(&shape, &strides, offset);
            if min < 0 || max as usize >= buffer.len() {
                return Err(NdError::ViewOutOfBounds {
                    min,
                    max,
                    len: buffer.len(),
                });
            }
        }
        Ok(NdArray {
            dtype,
            data: Rc::new(RefCell::new(buffer)),
            shape,
            strides,
            offset,
            order,
            mode: Mode::Throw,
            submode: Vec::new(),
            readonly: false,
        })
    }

    /// Create a view without bounds validation.
    ///
    /// Internal performance paths construct many short-lived views whose
    /// metadata is correct by construction; out-of-range metadata here makes
    /// later element access panic or corrupt neighboring elements.
    pub fn new_unchecked(
        dtype: DType,
        data: Rc<RefCell<Buffer>>,
        shape: Vec<usize>,
        strides: Vec<isize>,
        offset: isize,
        order: Order,
    ) -> NdArray {
        NdArray {
            dtype,
            data,
            shape,
            strides,
            offset,
            order,
            mode: Mode::Throw,
            submode: Vec::new(),
            readonly: false,
        }
    }

    /// Allocate a zero-filled array with default strides.
    pub fn zeros(dtype: DType, shape: &[usize], order: Order) -> NdArray {
        let buffer = Buffer::zeros(dtype, numel(shape));
        let strides = shape_to_strides(shape, order);
        NdArray {
            dtype,
            data: Rc::new(RefCell::new(buffer)),
            shape: shape.to_vec(),
            strides,
            offset: 0,
            order,
            mode: Mode::Throw,
            submode: Vec::new(),
            readonly: false,
        }
    }

    /// Derive a view over the same buffer with new metadata.
    ///
    /// Policy flags (order, mode, submode, readonly) carry over.
    pub(crate) fn derived(&self, shape: Vec<usize>, strides: Vec<isize>, offset: isize) -> NdArray {
        NdArray {
            dtype: self.dtype,
            data: Rc::clone(&self.data),
            shape,
            strides,
            offset,
            order: self.order,
            mode: self.mode,
            submode: self.submode.clone(),
            readonly: self.readonly,
        }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Shared handle to the underlying buffer.
    pub fn data(&self) -> Rc<RefCell<Buffer>> {
        Rc::clone(&self.data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn offset(&self) -> isize {
        self.offset
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Per-dimension out-of-bounds policies; empty means the array's mode
    /// applies everywhere.
    pub fn submode(&self) -> &[Mode] {
        &self.submode
    }

    pub fn ndims(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        numel(&self.shape)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Sign of the traversal direction implied by this view's strides.
    pub fn iteration_order(&self) -> i8 {
        iteration_order(&self.strides)
    }

    /// Whether the reachable index range exactly spans the element count.
    pub fn is_contiguous(&self) -> bool {
        is_contiguous(&self.shape, &self.strides, self.offset)
    }

    /// Replace the default out-of-bounds policy.
    pub fn with_mode(mut self, mode: Mode) -> NdArray {
        self.mode = mode;
        self
    }

    /// Set per-dimension out-of-bounds policies, applied cyclically across
    /// dimensions. An empty submode falls back to the array's mode.
    pub fn with_submode(mut self, submode: Vec<Mode>) -> NdArray {
        self.submode = submode;
        self
    }

    /// Mark the view read-only; `set` fails from then on.
    pub fn into_readonly(mut self) -> NdArray {
        self.readonly = true;
        self
    }

    fn dim_mode(&self, dim: usize) -> Mode {
        if self.submode.is_empty() {
            self.mode
        } else {
            self.submode[dim % self.submode.len()]
        }
    }

    /// Resolve one subscript under a policy.
    fn resolve_index(index: isize, size: usize, dim: usize, mode: Mode) -> Result<usize> {
        let n = size as isize;
        let oob = || NdError::IndexOutOfBounds {
            index,
            dim,
            size,
        };
        match mode {
            Mode::Throw => {
                if index < 0 || index >= n {
                    return Err(oob());
                }
                Ok(index as usize)
            }
            Mode::Normalize => {
                let i = if index < 0 { index + n } else { index };
                if i < 0 || i >= n {
                    return Err(oob());
                }
                Ok(i as usize)
            }
            Mode::Wrap => {
                if n == 0 {
                    return Err(oob());
                }
                Ok((((index % n) + n) % n) as usize)
            }
            Mode::Clamp => {
                if n == 0 {
                    return Err(oob());
                }
                Ok(index.clamp(0, n - 1) as usize)
            }
        }
    }

    /// Buffer index for a subscript tuple, after per-dimension mode
    /// resolution.
    fn buffer_index(&self, idx: &[isize]) -> Result<usize> {
        if idx.len() != self.ndims() {
            return Err(NdError::RankMismatch(idx.len(), self.ndims()));
        }
        let mut pos = self.offset;
        for (dim, (&i, (&d, &s))) in idx
            .iter()
            .zip(self.shape.iter().zip(self.strides.iter()))
            .enumerate()
        {
            let resolved = Self::resolve_index(i, d, dim, self.dim_mode(dim))?;
            pos += resolved as isize * s;
        }
        usize::try_from(pos).map_err(|_| NdError::OffsetOverflow)
    }

    /// Read the element at a subscript tuple.
    pub fn get(&self, idx: &[isize]) -> Result<Scalar> {
        let pos = self.buffer_index(idx)?;
        Ok(self.data.borrow().get(pos))
    }

    /// Write the element at a subscript tuple, casting to this array's
    /// dtype.
    pub fn set(&self, idx: &[isize], value: Scalar) -> Result<()> {
        if self.readonly {
            return Err(NdError::ReadOnly);
        }
        let pos = self.buffer_index(idx)?;
        self.data.borrow_mut().set(pos, value)
    }
}
